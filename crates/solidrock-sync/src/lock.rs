//! Per-collection run locks.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use solidrock_connector::types::Collection;

use crate::error::{SyncError, SyncResult};

/// Guard held for the duration of one sync run.
#[derive(Debug)]
pub struct RunGuard {
    collection: Collection,
    _guard: OwnedMutexGuard<()>,
}

impl RunGuard {
    /// Collection the guard locks.
    #[must_use]
    pub fn collection(&self) -> Collection {
        self.collection
    }
}

/// One non-blocking lock per collection.
///
/// Runs of different collections never contend.
#[derive(Debug, Clone)]
pub struct RunLocks {
    locks: Arc<HashMap<Collection, Arc<Mutex<()>>>>,
}

impl Default for RunLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLocks {
    /// Create an unlocked set.
    #[must_use]
    pub fn new() -> Self {
        let locks = Collection::ALL
            .into_iter()
            .map(|c| (c, Arc::new(Mutex::new(()))))
            .collect();
        Self {
            locks: Arc::new(locks),
        }
    }

    /// Take the lock of a collection, failing if a run already holds it.
    pub fn try_acquire(&self, collection: Collection) -> SyncResult<RunGuard> {
        let lock = self
            .locks
            .get(&collection)
            .ok_or_else(|| SyncError::internal(format!("no run lock for {collection}")))?;
        let guard = lock
            .clone()
            .try_lock_owned()
            .map_err(|_| SyncError::AlreadyRunning { collection })?;
        Ok(RunGuard {
            collection,
            _guard: guard,
        })
    }

    /// Whether a run of the collection is in progress.
    #[must_use]
    pub fn is_running(&self, collection: Collection) -> bool {
        self.locks
            .get(&collection)
            .is_some_and(|lock| lock.try_lock().is_err())
    }
}
