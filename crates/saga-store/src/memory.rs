use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    CorrelationKey, KeyGuard, KeyLocks, Result, Revision, SagaData, SagaStoreError,
    store::SagaStore,
};

/// In-memory saga store.
///
/// Instances are kept in insertion order. Cloning the store shares the same
/// backing collection, so a caller can keep a handle for inspection while
/// the dispatcher owns another.
#[derive(Clone)]
pub struct InMemorySagaStore<D> {
    instances: Arc<RwLock<Vec<D>>>,
    locks: KeyLocks,
}

impl<D: SagaData> Default for InMemorySagaStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: SagaData> InMemorySagaStore<D> {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::with_instances(Vec::new())
    }

    /// Creates a store seeded with existing instances.
    ///
    /// Seeded instances are taken as-is: their IDs and revisions are not
    /// checked or rewritten.
    pub fn with_instances(instances: Vec<D>) -> Self {
        Self {
            instances: Arc::new(RwLock::new(instances)),
            locks: KeyLocks::new(),
        }
    }

    /// Returns the number of stored instances.
    pub async fn len(&self) -> usize {
        self.instances.read().await.len()
    }

    /// Returns true if no instances are stored.
    pub async fn is_empty(&self) -> bool {
        self.instances.read().await.is_empty()
    }

    /// Removes every instance.
    pub async fn clear(&self) {
        self.instances.write().await.clear();
    }
}

#[async_trait]
impl<D: SagaData> SagaStore<D> for InMemorySagaStore<D> {
    async fn find_one(
        &self,
        predicate: &(dyn for<'p> Fn(&'p D) -> bool + Send + Sync),
    ) -> Result<Option<D>> {
        let instances = self.instances.read().await;
        Ok(instances.iter().find(|d| predicate(d)).cloned())
    }

    async fn insert(&self, data: D) -> Result<Revision> {
        self.insert_unique(data, &|_: &D| false).await
    }

    async fn insert_unique(
        &self,
        mut data: D,
        correlates: &(dyn for<'p> Fn(&'p D) -> bool + Send + Sync),
    ) -> Result<Revision> {
        let instance_id = data.id();
        if instance_id.is_nil() {
            return Err(SagaStoreError::UnassignedId);
        }

        let mut instances = self.instances.write().await;
        if instances.iter().any(|d| d.id() == instance_id) {
            return Err(SagaStoreError::DuplicateInstance(instance_id));
        }
        if let Some(existing) = instances.iter().find(|d| correlates(d)) {
            metrics::counter!("saga_store_conflicts_total").increment(1);
            return Err(SagaStoreError::CorrelationConflict {
                instance_id,
                existing: existing.id(),
            });
        }

        let revision = Revision::first();
        data.set_revision(revision);
        instances.push(data);

        metrics::counter!("saga_store_inserts_total").increment(1);
        tracing::trace!(%instance_id, "saga instance inserted");

        Ok(revision)
    }

    async fn update(&self, mut data: D, expected: Revision) -> Result<Revision> {
        let instance_id = data.id();

        let mut instances = self.instances.write().await;
        let slot = instances
            .iter_mut()
            .find(|d| d.id() == instance_id)
            .ok_or(SagaStoreError::InstanceNotFound(instance_id))?;

        let actual = slot.revision();
        if actual != expected {
            metrics::counter!("saga_store_conflicts_total").increment(1);
            return Err(SagaStoreError::ConcurrencyConflict {
                instance_id,
                expected,
                actual,
            });
        }

        let revision = expected.next();
        data.set_revision(revision);
        *slot = data;

        tracing::trace!(%instance_id, %revision, "saga instance updated");

        Ok(revision)
    }

    async fn all(&self) -> Result<Vec<D>> {
        Ok(self.instances.read().await.clone())
    }

    async fn lock_key(&self, key: &CorrelationKey) -> KeyGuard {
        self.locks.acquire(key).await
    }
}
