//! Per-cluster serialization of mesh-mutating operations

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::cluster::ClusterId;

type LockMap = HashMap<ClusterId, Arc<AsyncMutex<()>>>;

/// One async mutex per cluster.
///
/// Recovery runs interleaving forget and meet sequences on the same cluster
/// would leave a partial mesh, so runs on one cluster are queued while
/// runs on different clusters proceed independently. An entry lives only
/// while some caller holds or waits for it.
#[derive(Default)]
pub struct ClusterLocks {
    locks: Arc<Mutex<LockMap>>,
}

impl ClusterLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a cluster; released when the guard drops
    pub async fn acquire(&self, id: &ClusterId) -> ClusterGuard {
        let lock = {
            let mut locks = self.locks.lock();
            locks.entry(id.clone()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        ClusterGuard {
            guard: Some(guard),
            id: id.clone(),
            locks: self.locks.clone(),
        }
    }

    /// Number of clusters currently held or waited on
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one cluster
pub struct ClusterGuard {
    guard: Option<OwnedMutexGuard<()>>,
    id: ClusterId,
    locks: Arc<Mutex<LockMap>>,
}

impl Drop for ClusterGuard {
    fn drop(&mut self) {
        // the owned guard keeps its own reference to the mutex
        drop(self.guard.take());
        let mut locks = self.locks.lock();
        let idle = locks
            .get(&self.id)
            .map_or(false, |lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&self.id);
        }
    }
}
