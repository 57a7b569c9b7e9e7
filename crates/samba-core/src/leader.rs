//! Function -> leader assignment

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::Error;
use crate::types::{FunctionId, InstanceId};

/// Chooses the leader for a function on first reference
///
/// Called at most once per function. Returning `None` means no instance is
/// available; the lookup fails and a later call may try again.
pub trait LeaderSelectionPolicy: Send + Sync {
    fn select_leader(&self, function: FunctionId) -> Option<InstanceId>;
}

/// Every function is led by the same instance
#[derive(Debug, Clone)]
pub struct FixedLeader(pub InstanceId);

impl LeaderSelectionPolicy for FixedLeader {
    fn select_leader(&self, _function: FunctionId) -> Option<InstanceId> {
        Some(self.0.clone())
    }
}

/// Permanent leader assignment per function
///
/// First write wins: the policy runs under the write lock, so concurrent
/// first lookups of the same function observe a single leader.
pub struct LeaderDirectory {
    leaders: RwLock<HashMap<FunctionId, InstanceId>>,
    policy: Box<dyn LeaderSelectionPolicy>,
}

impl LeaderDirectory {
    pub fn new(policy: impl LeaderSelectionPolicy + 'static) -> Self {
        Self {
            leaders: RwLock::new(HashMap::new()),
            policy: Box::new(policy),
        }
    }

    /// Leader for `function`, assigning one on first reference
    pub fn get_or_assign_leader(&self, function: FunctionId) -> crate::Result<InstanceId> {
        let function = function.validate()?;

        if let Some(leader) = self.leader(function) {
            return Ok(leader);
        }

        let mut leaders = self.leaders.write().unwrap_or_else(PoisonError::into_inner);
        match leaders.entry(function) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let leader = self
                    .policy
                    .select_leader(function)
                    .ok_or(Error::NoLeader(function))?;
                tracing::info!(function = %function, leader = %leader, "Assigned function leader");
                Ok(entry.insert(leader).clone())
            }
        }
    }

    /// Current leader, without assigning one
    pub fn leader(&self, function: FunctionId) -> Option<InstanceId> {
        let leaders = self.leaders.read().unwrap_or_else(PoisonError::into_inner);
        leaders.get(&function).cloned()
    }

    /// Number of functions with an assigned leader
    pub fn len(&self) -> usize {
        self.leaders.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Hands out a different instance on every call
    struct Rotating(AtomicUsize);

    impl LeaderSelectionPolicy for Rotating {
        fn select_leader(&self, _function: FunctionId) -> Option<InstanceId> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Some(InstanceId::new(format!("http://node-{}", n)))
        }
    }

    struct NoInstances;

    impl LeaderSelectionPolicy for NoInstances {
        fn select_leader(&self, _function: FunctionId) -> Option<InstanceId> {
            None
        }
    }

    #[test]
    fn test_leader_is_idempotent() {
        let directory = LeaderDirectory::new(Rotating(AtomicUsize::new(0)));
        let first = directory.get_or_assign_leader(FunctionId::new(5)).unwrap();
        let second = directory.get_or_assign_leader(FunctionId::new(5)).unwrap();
        assert_eq!(first, second);

        let other = directory.get_or_assign_leader(FunctionId::new(6)).unwrap();
        assert_ne!(first, other);
        assert_eq!(directory.len(), 2);
    }

    #[test]
    fn test_zero_function_rejected() {
        let directory = LeaderDirectory::new(FixedLeader(InstanceId::new("http://alice")));
        assert!(matches!(
            directory.get_or_assign_leader(FunctionId::new(0)),
            Err(Error::InvalidFunction(_))
        ));
        assert!(directory.is_empty());
    }

    #[test]
    fn test_no_leader_available() {
        let directory = LeaderDirectory::new(NoInstances);
        assert!(matches!(
            directory.get_or_assign_leader(FunctionId::new(1)),
            Err(Error::NoLeader(_))
        ));
        assert!(directory.leader(FunctionId::new(1)).is_none());
    }

    #[test]
    fn test_concurrent_first_lookup_assigns_once() {
        let directory = Arc::new(LeaderDirectory::new(Rotating(AtomicUsize::new(0))));
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let directory = directory.clone();
                std::thread::spawn(move || directory.get_or_assign_leader(FunctionId::new(9)).unwrap())
            })
            .collect();
        let leaders: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(leaders.iter().all(|l| l == &leaders[0]));
        assert_eq!(directory.leader(FunctionId::new(9)), Some(leaders[0].clone()));
    }
}
