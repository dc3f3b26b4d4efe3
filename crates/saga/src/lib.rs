//! Saga correlation and dispatch.
//!
//! A [`Saga`] declares which message types it reacts to
//! ([`Handles`] / [`InitiatedBy`]) and how each message type finds its
//! persisted [`SagaData`](saga_store::SagaData). The [`SagaDispatcher`]
//! takes one message at a time and:
//! 1. resolves the correlation rule for the message's exact runtime type,
//! 2. finds the matching instance in the store, or creates one if the
//!    message type initiates the saga,
//! 3. invokes the most specific handler along the message's type chain,
//! 4. commits the instance and notifies observers.
//!
//! Messages that match nothing and may not start an instance are reported
//! as uncorrelated and dropped.

pub mod config;
pub mod context;
pub mod correlation;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod message;
pub mod observer;
pub mod saga;

pub use async_trait::async_trait;
pub use common::{CorrelationKey, InstanceId};
pub use config::{DispatcherConfig, DuplicatePolicy};
pub use context::SagaContext;
pub use correlation::{CorrelationRegistry, CorrelationRule};
pub use dispatcher::{DispatchOutcome, SagaDispatcher};
pub use error::{DispatchError, HandlerError, Result};
pub use handler::{HandlerResolver, ResolvedHandler};
pub use message::{Message, MessageType};
pub use observer::{NoOpObserver, SagaObserver, TracingObserver};
pub use saga::{Handles, InitiatedBy, Saga, SagaConfig};
pub use saga_store::{InMemorySagaStore, Revision, SagaData, SagaStore, SagaStoreError};
