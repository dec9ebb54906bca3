//! Topology reads

use serde::Serialize;
use tracing::{error, info, Instrument};

use crate::cluster::NodeRef;
use crate::command::Command;
use crate::context::ClusterContext;
use crate::error::Result;
use crate::executor::Executor;
use crate::table::{count_nodes, count_unhealthy, NodeTable};

/// Node counts as seen from the bootstrap leader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterStatus {
    pub total: usize,
    pub leaders: usize,
    pub followers: usize,
    pub unhealthy: usize,
}

/// Reads node tables from live nodes
#[derive(Clone)]
pub struct TopologyReader {
    executor: Executor,
}

impl TopologyReader {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    /// Fetch and parse `CLUSTER NODES` from one node
    pub async fn list_nodes(&self, ctx: &ClusterContext, node: &NodeRef) -> Result<NodeTable> {
        let output = self
            .executor
            .run(ctx, node, &Command::cluster_nodes())
            .await
            .map_err(|e| {
                error!(node = %node, error = %e, "Redis command failed with this error");
                e
            })?;
        let table = NodeTable::parse(&output).map_err(|e| {
            error!(node = %node, error = %e, output = %output, "Error parsing node table");
            e
        })?;
        info!(node = %node, rows = table.len(), "Redis cluster nodes are listed");
        Ok(table)
    }

    /// Number of nodes matching a role filter, as seen from leader 0
    pub async fn node_count(&self, ctx: &ClusterContext, filter: &str) -> Result<usize> {
        async {
            let table = self.list_nodes(ctx, &ctx.bootstrap_node()).await?;
            let count = count_nodes(&table, filter);
            if filter.is_empty() {
                info!(nodes = count, "Total number of redis nodes");
            } else {
                info!(nodes = count, kind = filter, "Number of redis nodes");
            }
            Ok(count)
        }
        .instrument(ctx.span().clone())
        .await
    }

    /// Number of failed or disconnected nodes, as seen from leader 0
    pub async fn unhealthy_count(&self, ctx: &ClusterContext) -> Result<usize> {
        async {
            let table = self.list_nodes(ctx, &ctx.bootstrap_node()).await?;
            let count = count_unhealthy(&table);
            info!(failed = count, "Number of failed nodes in cluster");
            Ok(count)
        }
        .instrument(ctx.span().clone())
        .await
    }

    /// All counts from a single table read
    pub async fn status(&self, ctx: &ClusterContext) -> Result<ClusterStatus> {
        async {
            let table = self.list_nodes(ctx, &ctx.bootstrap_node()).await?;
            Ok(ClusterStatus {
                total: count_nodes(&table, ""),
                leaders: count_nodes(&table, "leader"),
                followers: count_nodes(&table, "follower"),
                unhealthy: count_unhealthy(&table),
            })
        }
        .instrument(ctx.span().clone())
        .await
    }
}
