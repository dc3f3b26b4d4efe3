use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a persisted saga instance.
///
/// Assigned once, when the dispatcher allocates the instance, and stable
/// for the whole lifetime of the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Creates a new random instance ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The all-zero ID carried by default-initialized saga data that has not
    /// been assigned an identity yet.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Creates an instance ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if this is the unassigned (nil) ID.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::nil()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for InstanceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<InstanceId> for Uuid {
    fn from(id: InstanceId) -> Self {
        id.0
    }
}
