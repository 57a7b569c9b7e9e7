//! Destination selection

use crate::types::{FunctionId, InstanceId};

/// Decides which instance processes a message for a function
///
/// A pure decision: implementations must not touch proxy state.
pub trait DestinationSelectionPolicy: Send + Sync {
    fn select_destination(&self, function: FunctionId) -> InstanceId;
}

/// Every message goes to the same instance, irrespective of load
#[derive(Debug, Clone)]
pub struct FixedDestination(pub InstanceId);

impl DestinationSelectionPolicy for FixedDestination {
    fn select_destination(&self, _function: FunctionId) -> InstanceId {
        self.0.clone()
    }
}
