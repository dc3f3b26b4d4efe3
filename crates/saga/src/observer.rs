//! Saga lifecycle observers

use saga_store::SagaData;

use crate::error::DispatchError;
use crate::message::Message;

/// Receives lifecycle notifications from a [`SagaDispatcher`](crate::SagaDispatcher).
///
/// Observers are called synchronously, in registration order, while the
/// dispatch is in progress. Every method defaults to doing nothing.
pub trait SagaObserver<D: SagaData>: Send + Sync {
    /// A new instance was allocated for `message`. Called before the handler
    /// runs; the instance is stored only if the handler succeeds.
    ///
    /// If another dispatch stores an instance with the same correlation key
    /// first, the message is re-run against that instance and
    /// [`on_correlated`](Self::on_correlated) follows.
    fn on_created(&self, _message: &dyn Message, _data: &D) {}

    /// `message` matched an existing instance.
    fn on_correlated(&self, _message: &dyn Message, _data: &D) {}

    /// `message` matched no instance and may not create one. It is dropped.
    fn on_could_not_correlate(&self, _message: &dyn Message) {}

    /// The handler for `message` failed. The error is returned to the caller
    /// right after this call.
    fn on_handler_failed(&self, _message: &dyn Message, _error: &DispatchError) {}
}

/// No-op observer
pub struct NoOpObserver;

impl<D: SagaData> SagaObserver<D> for NoOpObserver {}

/// Tracing-based observer
pub struct TracingObserver;

impl<D: SagaData> SagaObserver<D> for TracingObserver {
    fn on_created(&self, message: &dyn Message, data: &D) {
        tracing::info!(
            instance_id = %data.id(),
            message_type = message.type_name(),
            "Saga instance created"
        );
    }

    fn on_correlated(&self, message: &dyn Message, data: &D) {
        tracing::info!(
            instance_id = %data.id(),
            revision = %data.revision(),
            message_type = message.type_name(),
            "Message correlated"
        );
    }

    fn on_could_not_correlate(&self, message: &dyn Message) {
        tracing::warn!(message_type = message.type_name(), "Message could not be correlated");
    }

    fn on_handler_failed(&self, message: &dyn Message, error: &DispatchError) {
        tracing::error!(
            message_type = message.type_name(),
            error = %error,
            "Saga handler failed"
        );
    }
}
