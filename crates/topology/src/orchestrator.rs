//! Entry point for externally triggered cluster operations

use std::sync::Arc;

use tracing::{error, info};

use crate::client::DataPlane;
use crate::cluster::ClusterId;
use crate::config::ClientConfig;
use crate::context::ClusterContext;
use crate::error::Result;
use crate::executor::Executor;
use crate::failover::Failover;
use crate::formation::{Formation, FormationReport};
use crate::locator::NodeLocator;
use crate::locks::ClusterLocks;
use crate::reader::{ClusterStatus, TopologyReader};
use crate::runtime::{ClusterSource, Runtime};

/// Fetches the cluster spec and runs one operation under the cluster's lock.
///
/// Unknown clusters fail before the lock is taken.
pub struct Orchestrator {
    clusters: Arc<dyn ClusterSource>,
    reader: TopologyReader,
    formation: Formation,
    failover: Failover,
    locks: ClusterLocks,
}

impl Orchestrator {
    pub fn new(config: ClientConfig, runtime: Runtime, data_plane: Arc<dyn DataPlane>) -> Self {
        let locator = NodeLocator::new(runtime.pods.clone());
        let executor = Executor::new(
            config,
            locator,
            runtime.secrets.clone(),
            runtime.exec.clone(),
            data_plane,
        );
        let reader = TopologyReader::new(executor.clone());
        Self {
            clusters: runtime.clusters.clone(),
            formation: Formation::new(executor.clone(), reader.clone()),
            failover: Failover::new(executor, reader.clone()),
            reader,
            locks: ClusterLocks::new(),
        }
    }

    pub fn reader(&self) -> &TopologyReader {
        &self.reader
    }

    pub fn formation(&self) -> &Formation {
        &self.formation
    }

    pub fn failover(&self) -> &Failover {
        &self.failover
    }

    pub fn locks(&self) -> &ClusterLocks {
        &self.locks
    }

    async fn context(&self, id: &ClusterId) -> Result<ClusterContext> {
        let spec = self.clusters.cluster_spec(id).await.map_err(|e| {
            error!(cluster = %id, error = %e, "Cluster spec fetch error");
            e
        })?;
        Ok(ClusterContext::new(id.clone(), spec))
    }

    /// Graceful recovery: forget, re-mesh, reset followers
    pub async fn recover(&self, id: &ClusterId) -> Result<()> {
        let ctx = self.context(id).await?;
        let _guard = self.locks.acquire(id).await;
        let result = self.failover.graceful_failover(&ctx).await;
        log_outcome(&ctx, "graceful failover", &result);
        result
    }

    /// Forced recovery: reset (or flush) every node
    pub async fn force_recover(&self, id: &ClusterId) -> Result<()> {
        let ctx = self.context(id).await?;
        let _guard = self.locks.acquire(id).await;
        let result = self.failover.force_failover(&ctx).await;
        log_outcome(&ctx, "forced failover", &result);
        result
    }

    /// Create the mesh if needed and attach missing followers
    pub async fn form(&self, id: &ClusterId) -> Result<FormationReport> {
        let ctx = self.context(id).await?;
        let _guard = self.locks.acquire(id).await;
        let result = self.formation.ensure_formed(&ctx).await;
        log_outcome(&ctx, "formation", &result);
        result
    }

    /// Read-only node counts; not serialized against mutating runs
    pub async fn status(&self, id: &ClusterId) -> Result<ClusterStatus> {
        let ctx = self.context(id).await?;
        self.reader.status(&ctx).await
    }
}

fn log_outcome<T>(ctx: &ClusterContext, operation: &str, result: &Result<T>) {
    let _entered = ctx.span().enter();
    match result {
        Ok(_) => info!(operation, "Operation completed"),
        Err(e) => error!(operation, error = %e, "Operation failed"),
    }
}
