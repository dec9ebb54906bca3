//! Failover and recovery
//!
//! Both operations are triggered on demand, never by polling. Every remote
//! call completes before the next one is issued: meet and forget are not
//! commutative, so ordering is part of correctness here.

use tracing::{debug, error, info, warn, Instrument};

use crate::cluster::{NodeRef, Role};
use crate::command::Command;
use crate::context::ClusterContext;
use crate::error::Result;
use crate::executor::Executor;
use crate::reader::TopologyReader;

/// Drives forced and graceful recovery of a cluster mesh
#[derive(Clone)]
pub struct Failover {
    executor: Executor,
    reader: TopologyReader,
}

impl Failover {
    pub fn new(executor: Executor, reader: TopologyReader) -> Self {
        Self { executor, reader }
    }

    /// Reset every node, leaders first.
    ///
    /// A node whose `CLUSTER RESET` fails is flushed instead; if the flush
    /// fails too the whole operation stops with that error. Followers are not
    /// touched when any leader fails.
    pub async fn force_failover(&self, ctx: &ClusterContext) -> Result<()> {
        async {
            if let Err(e) = self.reset_role(ctx, Role::Leader).await {
                error!(error = %e, "Redis command failed for leader nodes");
                return Err(e);
            }
            if let Err(e) = self.reset_role(ctx, Role::Follower).await {
                error!(error = %e, "Redis command failed for follower nodes");
                return Err(e);
            }
            Ok(())
        }
        .instrument(ctx.span().clone())
        .await
    }

    /// Rebuild the mesh among the surviving nodes.
    ///
    /// Order: forget on every leader, forget on every follower, full pairwise
    /// meet among leaders, then reset followers so they can be re-attached.
    /// Table reads and takeovers abort the run; individual forgets and meets
    /// are best effort.
    pub async fn graceful_failover(&self, ctx: &ClusterContext) -> Result<()> {
        async {
            self.forget_role(ctx, Role::Leader).await?;
            info!("Leaders forgotten");
            self.forget_role(ctx, Role::Follower).await?;
            info!("Followers forgotten");
            self.rebuild_mesh(ctx).await?;
            info!("Leader mesh rebuilt");
            self.reset_role(ctx, Role::Follower).await?;
            info!("Followers reset");
            Ok(())
        }
        .instrument(ctx.span().clone())
        .await
    }

    async fn reset_role(&self, ctx: &ClusterContext, role: Role) -> Result<()> {
        for node in ctx.nodes(role) {
            self.reset_node(ctx, &node).await?;
        }
        Ok(())
    }

    async fn reset_node(&self, ctx: &ClusterContext, node: &NodeRef) -> Result<()> {
        info!(node = %node, "Executing redis failover operations");
        let reset_err = match self.executor.run(ctx, node, &Command::cluster_reset()).await {
            Ok(output) => {
                info!(node = %node, output = %output, "Redis cluster failover executed");
                return Ok(());
            }
            Err(e) => e,
        };

        warn!(node = %node, error = %reset_err, "Cluster reset failed, flushing node");
        match self.executor.run(ctx, node, &Command::flushall()).await {
            // The reset is deliberately not re-issued after a successful flush.
            Ok(_) => {
                info!(node = %node, "Node flushed");
                Ok(())
            }
            Err(e) => {
                error!(node = %node, error = %e, "Redis flush command failed with this error");
                Err(e)
            }
        }
    }

    async fn forget_role(&self, ctx: &ClusterContext, role: Role) -> Result<()> {
        for node in ctx.nodes(role) {
            self.forget_all(ctx, &node).await?;
        }
        Ok(())
    }

    /// Make `node` forget every member of its own table, itself included
    async fn forget_all(&self, ctx: &ClusterContext, node: &NodeRef) -> Result<()> {
        let table = self.reader.list_nodes(ctx, node).await?;

        if table.myself().map_or(false, |row| row.is_replica()) {
            info!(node = %node, "Replica, taking over before forgetting peers");
            self.executor
                .run(ctx, node, &Command::cluster_failover_takeover())
                .await?;
        }

        for id in table.node_ids() {
            debug!(node = %node, node_id = id, "Forgetting node");
            if let Err(e) = self.executor.run(ctx, node, &Command::cluster_forget(id)).await {
                debug!(node = %node, node_id = id, error = %e, "Forget failed, ignoring");
            }
        }
        info!(node = %node, forgotten = table.node_ids().len(), "Forgot all nodes");
        Ok(())
    }

    /// Introduce every pair of leaders, lower ordinal first
    async fn rebuild_mesh(&self, ctx: &ClusterContext) -> Result<()> {
        let count = ctx.spec().replicas(Role::Leader);
        let port = self.executor.config().redis_port;

        for root in 0..count.saturating_sub(1) {
            let root_node = ctx.node(Role::Leader, root);
            for peer in (root + 1)..count {
                let peer_node = ctx.node(Role::Leader, peer);
                let address = self.executor.resolve(&peer_node).await?;
                let meet = Command::cluster_meet(&address.ip_text(), port);
                match self.executor.run(ctx, &root_node, &meet).await {
                    Ok(_) => info!(root = %root_node, peer = %peer_node, ip = %address, "Meet executed"),
                    Err(e) => warn!(root = %root_node, peer = %peer_node, ip = %address, error = %e, "Meet failed"),
                }
            }
        }
        Ok(())
    }
}
