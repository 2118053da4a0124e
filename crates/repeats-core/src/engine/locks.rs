//! Per-node async locks.
//!
//! A lock set is always taken in sorted id order, so two operations locking
//! overlapping sets cannot deadlock.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Drop unused entries once the table grows past this many ids.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Default)]
pub(crate) struct NodeLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Holds every lock of a set until dropped.
pub(crate) struct NodeLockGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl NodeLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Lock every id in `ids`. `BTreeSet` iteration gives the global order.
    pub(crate) async fn acquire(&self, ids: &BTreeSet<String>) -> NodeLockGuard {
        let mutexes: Vec<Arc<Mutex<()>>> = {
            let mut table = self.table.lock().await;
            if table.len() > PRUNE_THRESHOLD {
                table.retain(|_, m| Arc::strong_count(m) > 1);
            }
            ids.iter()
                .map(|id| table.entry(id.clone()).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }
        NodeLockGuard { _guards: guards }
    }
}
