//! Persisted saga state.

use crate::{InstanceId, Revision};

/// State of one saga instance.
///
/// Besides its own process-specific fields, every saga data type carries an
/// [`InstanceId`] and a [`Revision`]. The dispatcher assigns the ID when it
/// allocates a new instance; the store owns the revision.
///
/// `Default` produces the blank state a newly created instance starts from.
pub trait SagaData: Clone + Default + Send + Sync + 'static {
    /// Returns the instance ID. Nil until the instance has been created.
    fn id(&self) -> InstanceId;

    /// Assigns the instance ID.
    fn set_id(&mut self, id: InstanceId);

    /// Returns the revision this copy of the state was read at.
    fn revision(&self) -> Revision;

    /// Sets the revision. Called by stores when committing.
    fn set_revision(&mut self, revision: Revision);
}
