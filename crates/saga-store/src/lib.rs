//! Storage for persisted saga instances.
//!
//! The [`SagaStore`] trait is the contract the dispatcher runs against;
//! [`InMemorySagaStore`] is the in-process implementation used by tests and
//! by callers that seed instances up front.

pub mod data;
pub mod error;
pub mod lock;
pub mod memory;
pub mod revision;
pub mod store;

pub use common::{CorrelationKey, InstanceId};
pub use data::SagaData;
pub use error::{Result, SagaStoreError};
pub use lock::{KeyGuard, KeyLocks};
pub use memory::InMemorySagaStore;
pub use revision::Revision;
pub use store::{SagaStore, SagaStoreExt};
