//! Per-dispatch handler context.

use common::InstanceId;
use saga_store::SagaData;

/// What a handler sees while it runs: the saga data it may mutate and
/// whether that data was created for this very message.
///
/// A context lives for exactly one dispatch. Mutations become visible in the
/// store only after the handler returns successfully.
#[derive(Debug)]
pub struct SagaContext<D> {
    data: D,
    is_new: bool,
}

impl<D: SagaData> SagaContext<D> {
    pub(crate) fn created(data: D) -> Self {
        Self { data, is_new: true }
    }

    pub(crate) fn existing(data: D) -> Self {
        Self {
            data,
            is_new: false,
        }
    }

    /// Returns true if the instance was created by the current message.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    pub fn instance_id(&self) -> InstanceId {
        self.data.id()
    }

    pub(crate) fn into_data(self) -> D {
        self.data
    }
}
