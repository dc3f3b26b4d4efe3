//! Shared identity and correlation key types.

mod key;
mod types;

pub use key::CorrelationKey;
pub use types::InstanceId;
