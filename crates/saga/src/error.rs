//! Dispatch error types.

use saga_store::SagaStoreError;
use thiserror::Error;

/// Failure raised by a saga's own handler logic.
///
/// Any error type converts into it with `?` or `.into()`, including plain
/// strings.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while dispatching a message to a saga.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The saga handles the message type but has no correlation rule for it.
    #[error("No correlation rule registered for message type {message_type}")]
    MissingCorrelation { message_type: &'static str },

    /// The message type has a correlation rule but no handler for it or any
    /// of its ancestors.
    #[error("No handler for message type {message_type} or any of its ancestors")]
    NoHandler { message_type: &'static str },

    /// The saga neither correlates nor handles this message type.
    #[error("Saga {saga} does not handle message type {message_type}")]
    NotApplicable {
        saga: &'static str,
        message_type: &'static str,
    },

    /// More than one correlation rule was configured for the same message
    /// type and duplicates are configured to be rejected.
    #[error("Correlation configured more than once for: {}", .message_types.join(", "))]
    DuplicateCorrelation { message_types: Vec<&'static str> },

    /// A handler or rule received a message of a type it was not built for.
    #[error("Expected message of type {expected}, got {actual}")]
    MessageTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// The saga store failed.
    #[error("Saga store error: {0}")]
    Store(#[from] SagaStoreError),

    /// The saga's handler failed. Displays exactly as the handler's error.
    #[error(transparent)]
    Handler(HandlerError),
}

impl DispatchError {
    /// Returns true for errors caused by how the saga was configured.
    ///
    /// These are never worth retrying.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            DispatchError::MissingCorrelation { .. }
                | DispatchError::NoHandler { .. }
                | DispatchError::NotApplicable { .. }
                | DispatchError::DuplicateCorrelation { .. }
                | DispatchError::MessageTypeMismatch { .. }
        )
    }

    /// Returns the handler's own error if this is a handler failure.
    pub fn handler_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            DispatchError::Handler(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    /// Unwraps the handler's own error if this is a handler failure.
    pub fn into_handler_error(self) -> Option<HandlerError> {
        match self {
            DispatchError::Handler(e) => Some(e),
            _ => None,
        }
    }
}

/// Convenience type alias for dispatch results.
pub type Result<T> = std::result::Result<T, DispatchError>;
