use async_trait::async_trait;

use crate::{CorrelationKey, InstanceId, KeyGuard, Result, Revision, SagaData};

/// Core trait for saga instance stores.
///
/// A store owns every persisted saga instance. The dispatcher borrows a copy
/// of one instance for the duration of a handler call and hands it back
/// through [`insert`](SagaStore::insert) or [`update`](SagaStore::update).
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait SagaStore<D: SagaData>: Send + Sync {
    /// Returns a copy of the first instance matching `predicate`, if any.
    async fn find_one(
        &self,
        predicate: &(dyn for<'p> Fn(&'p D) -> bool + Send + Sync),
    ) -> Result<Option<D>>;

    /// Persists a newly created instance at [`Revision::first`].
    ///
    /// Fails with `DuplicateInstance` if an instance with the same ID is
    /// already stored.
    async fn insert(&self, data: D) -> Result<Revision>;

    /// Persists a newly created instance unless a stored instance already
    /// matches `correlates`.
    ///
    /// The check and the insert happen under one write, so of several
    /// callers creating an instance for the same correlation key only one
    /// succeeds. The others fail with `CorrelationConflict` naming the
    /// instance that won.
    async fn insert_unique(
        &self,
        data: D,
        correlates: &(dyn for<'p> Fn(&'p D) -> bool + Send + Sync),
    ) -> Result<Revision>;

    /// Replaces a stored instance if it is still at `expected`.
    ///
    /// Returns the new revision. Fails with `ConcurrencyConflict` if the
    /// stored revision differs from `expected`.
    async fn update(&self, data: D, expected: Revision) -> Result<Revision>;

    /// Returns a consistent snapshot of all stored instances.
    async fn all(&self) -> Result<Vec<D>>;

    /// Enters the exclusive write region for a correlation key.
    ///
    /// Between acquiring the guard and dropping it, no other caller of
    /// `lock_key` with an equal key proceeds. The dispatcher holds it from
    /// lookup until the instance has been committed.
    async fn lock_key(&self, key: &CorrelationKey) -> KeyGuard;
}

/// Extension trait providing convenience methods for saga stores.
#[async_trait]
pub trait SagaStoreExt<D: SagaData>: SagaStore<D> {
    /// Looks up an instance by ID.
    async fn get(&self, instance_id: InstanceId) -> Result<Option<D>> {
        self.find_one(&move |d: &D| d.id() == instance_id).await
    }

    /// Returns the number of stored instances.
    async fn count(&self) -> Result<usize> {
        Ok(self.all().await?.len())
    }
}

// Blanket implementation for all SagaStore implementations
impl<D: SagaData, T: SagaStore<D> + ?Sized> SagaStoreExt<D> for T {}
