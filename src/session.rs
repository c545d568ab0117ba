//! Per-node import serialization.
//!
//! An import suspends while it fetches catalogs. A second import of the same
//! node started in that window waits here until the first one finishes, so
//! neither reads fields the other is halfway through writing. Imports of
//! different nodes do not wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::model::NodeId;

/// Held for the duration of one import.
pub type SessionGuard = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub struct ImportSessions {
    locks: Mutex<HashMap<NodeId, Arc<AsyncMutex<()>>>>,
}

impl ImportSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `node`.
    pub async fn begin(&self, node: NodeId) -> SessionGuard {
        let lock = {
            let mut locks = self.locks.lock();
            // drop locks nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(node).or_default())
        };
        lock.lock_owned().await
    }

    /// Whether an import of `node` is running or queued.
    pub fn is_busy(&self, node: NodeId) -> bool {
        self.locks
            .lock()
            .get(&node)
            .is_some_and(|lock| Arc::strong_count(lock) > 1)
    }
}
