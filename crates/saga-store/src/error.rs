use thiserror::Error;

use crate::{InstanceId, Revision};

/// Errors that can occur when interacting with a saga store.
#[derive(Debug, Error)]
pub enum SagaStoreError {
    /// The instance was modified since it was read.
    #[error(
        "Concurrency conflict for saga instance {instance_id}: expected revision {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        instance_id: InstanceId,
        expected: Revision,
        actual: Revision,
    },

    /// No instance with this ID exists.
    #[error("Saga instance not found: {0}")]
    InstanceNotFound(InstanceId),

    /// An instance with this ID has already been inserted.
    #[error("Saga instance already exists: {0}")]
    DuplicateInstance(InstanceId),

    /// Another instance with the same correlation key was stored first.
    #[error(
        "Saga instance {instance_id} conflicts with stored instance {existing} on its correlation key"
    )]
    CorrelationConflict {
        instance_id: InstanceId,
        existing: InstanceId,
    },

    /// The instance was inserted without an assigned ID.
    #[error("Saga instance has no assigned ID")]
    UnassignedId,
}

impl SagaStoreError {
    /// Returns true if the write lost a race against another writer and may
    /// succeed when retried from a fresh read.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SagaStoreError::ConcurrencyConflict { .. } | SagaStoreError::CorrelationConflict { .. }
        )
    }
}

/// Result type for saga store operations.
pub type Result<T> = std::result::Result<T, SagaStoreError>;
