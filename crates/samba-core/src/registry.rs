//! Per-instance key records

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::pre::{PublicKey, ReEncryptionKey};
use crate::types::InstanceId;

/// A re-encryption key together with the leader that issued it
///
/// An instance holds one issued key at a time. If the leader policy hands
/// different functions to different leaders, routing to the same instance
/// through each of them replaces this key and fetches it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedKey {
    pub leader: InstanceId,
    pub key: ReEncryptionKey,
}

/// Everything the proxy knows about one instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceKeys {
    pub public_key: Option<PublicKey>,
    pub re_encryption_key: Option<IssuedKey>,
}

/// Public keys and cached re-encryption keys, per instance
///
/// Every update is a read-modify-write of a single record under the map's
/// write lock, so a public key update and a re-encryption key write for the
/// same instance can never drop each other's field.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    records: RwLock<HashMap<InstanceId, InstanceKeys>>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an instance's public key
    ///
    /// A re-encryption key already cached for the instance is kept.
    pub fn set_public_key(&self, instance: &InstanceId, public_key: PublicKey) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records.entry(instance.clone()).or_default();
        let replaced = record.public_key.replace(public_key).is_some();
        tracing::debug!(
            instance = %instance,
            replaced,
            has_re_encryption_key = record.re_encryption_key.is_some(),
            "Public key stored"
        );
    }

    pub fn public_key(&self, instance: &InstanceId) -> Option<PublicKey> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(instance).and_then(|r| r.public_key.clone())
    }

    /// Cache a re-encryption key for an instance, keeping its public key
    pub fn set_re_encryption_key(&self, instance: &InstanceId, issued: IssuedKey) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records.entry(instance.clone()).or_default();
        tracing::debug!(instance = %instance, leader = %issued.leader, "Re-encryption key cached");
        record.re_encryption_key = Some(issued);
    }

    pub fn re_encryption_key(&self, instance: &InstanceId) -> Option<IssuedKey> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(instance).and_then(|r| r.re_encryption_key.clone())
    }

    /// Cached re-encryption key for `instance`, only if `leader` issued it
    pub fn re_encryption_key_from(&self, instance: &InstanceId, leader: &InstanceId) -> Option<ReEncryptionKey> {
        self.re_encryption_key(instance)
            .filter(|issued| &issued.leader == leader)
            .map(|issued| issued.key)
    }

    /// Snapshot of an instance's record
    pub fn get(&self, instance: &InstanceId) -> Option<InstanceKeys> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(instance).cloned()
    }

    /// Number of instances with a record
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn issued(leader: &str, byte: u8) -> IssuedKey {
        IssuedKey {
            leader: InstanceId::new(leader),
            key: ReEncryptionKey::new(vec![byte; 64]),
        }
    }

    #[test]
    fn test_public_key_round_trip() {
        let registry = KeyRegistry::new();
        let bob = InstanceId::new("http://bob");
        assert!(registry.public_key(&bob).is_none());

        registry.set_public_key(&bob, PublicKey::new(vec![1; 32]));
        assert_eq!(registry.public_key(&bob), Some(PublicKey::new(vec![1; 32])));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_re_registering_public_key_keeps_re_encryption_key() {
        let registry = KeyRegistry::new();
        let bob = InstanceId::new("http://bob");

        registry.set_public_key(&bob, PublicKey::new(vec![1; 32]));
        registry.set_re_encryption_key(&bob, issued("http://alice", 7));
        registry.set_public_key(&bob, PublicKey::new(vec![2; 32]));

        let record = registry.get(&bob).unwrap();
        assert_eq!(record.public_key, Some(PublicKey::new(vec![2; 32])));
        assert_eq!(record.re_encryption_key, Some(issued("http://alice", 7)));
    }

    #[test]
    fn test_re_encryption_key_before_public_key() {
        let registry = KeyRegistry::new();
        let bob = InstanceId::new("http://bob");

        registry.set_re_encryption_key(&bob, issued("http://alice", 3));
        assert!(registry.public_key(&bob).is_none());

        registry.set_public_key(&bob, PublicKey::new(vec![5; 32]));
        assert_eq!(registry.re_encryption_key(&bob), Some(issued("http://alice", 3)));
    }

    #[test]
    fn test_re_encryption_key_scoped_to_leader() {
        let registry = KeyRegistry::new();
        let bob = InstanceId::new("http://bob");
        registry.set_re_encryption_key(&bob, issued("http://alice", 3));

        assert!(registry
            .re_encryption_key_from(&bob, &InstanceId::new("http://alice"))
            .is_some());
        assert!(registry
            .re_encryption_key_from(&bob, &InstanceId::new("http://carol"))
            .is_none());
    }

    #[test]
    fn test_concurrent_updates_keep_both_fields() {
        let registry = Arc::new(KeyRegistry::new());
        let handles: Vec<_> = (0..16u8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let id = InstanceId::new(format!("http://node-{}", i % 4));
                    if (i / 4) % 2 == 0 {
                        registry.set_public_key(&id, PublicKey::new(vec![i; 32]));
                    } else {
                        registry.set_re_encryption_key(&id, issued("http://alice", i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for n in 0..4 {
            let record = registry.get(&InstanceId::new(format!("http://node-{}", n))).unwrap();
            assert!(record.public_key.is_some());
            assert!(record.re_encryption_key.is_some());
        }
    }
}
