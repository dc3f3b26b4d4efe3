//! Exclusive write regions keyed by correlation value.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::CorrelationKey;

/// Holds the exclusive write region for one correlation key.
///
/// The region is released when the guard is dropped.
pub struct KeyGuard {
    key: CorrelationKey,
    lock: Option<OwnedMutexGuard<()>>,
}

impl KeyGuard {
    /// A guard that holds no lock, for stores that serialize creation some
    /// other way (for example a unique index checked on insert).
    pub fn unlocked(key: CorrelationKey) -> Self {
        Self { key, lock: None }
    }

    /// Returns the correlation key this guard was acquired for.
    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    /// Returns true if the guard holds an actual lock.
    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }
}

impl std::fmt::Debug for KeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGuard")
            .field("key", &self.key)
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// A table of per-key async mutexes.
///
/// Entries are created on demand and pruned once nobody holds or waits on
/// them. `Clone` shares the same table.
#[derive(Clone, Default)]
pub struct KeyLocks {
    locks: Arc<Mutex<HashMap<CorrelationKey, Arc<Mutex<()>>>>>,
}

impl KeyLocks {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and acquires the region for `key`.
    pub async fn acquire(&self, key: &CorrelationKey) -> KeyGuard {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let guard = lock.lock_owned().await;
        KeyGuard {
            key: key.clone(),
            lock: Some(guard),
        }
    }

    /// Returns the number of keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.locks.lock().await.len()
    }
}
