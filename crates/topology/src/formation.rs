//! Cluster formation: initial mesh creation and replica attachment

use serde::Serialize;
use tracing::{info, warn, Instrument};

use crate::cluster::{NodeRef, Role};
use crate::command::redact;
use crate::context::ClusterContext;
use crate::error::{MeshError, Result};
use crate::executor::Executor;
use crate::locator::NodeAddress;
use crate::reader::TopologyReader;
use crate::table::is_present;

/// What [`Formation::ensure_formed`] did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormationReport {
    /// The bootstrap `create` ran
    pub created: bool,
    /// Pod names of followers attached in this run
    pub attached: Vec<String>,
}

/// Builds the mesh and attaches replicas through the cluster tool
#[derive(Clone)]
pub struct Formation {
    executor: Executor,
    reader: TopologyReader,
}

impl Formation {
    pub fn new(executor: Executor, reader: TopologyReader) -> Self {
        Self { executor, reader }
    }

    /// Run the one-time `--cluster create` bootstrap on leader 0.
    ///
    /// Irreversible; callers only invoke it when no cluster exists yet.
    pub async fn create_cluster(&self, ctx: &ClusterContext) -> Result<()> {
        async {
            let leaders = ctx.spec().replicas(Role::Leader);
            if leaders == 0 {
                return Err(MeshError::InvalidSpec(
                    "cluster has no leader replicas".to_string(),
                ));
            }

            let port = self.executor.config().redis_port;
            let mut argv = self.cli_prefix("create");
            for node in ctx.nodes(Role::Leader) {
                let address = self.executor.resolve(&node).await?;
                argv.push(address.host_port(port));
            }
            argv.push("--cluster-yes".to_string());

            let bootstrap = ctx.bootstrap_node();
            argv.extend(self.executor.cli_auth_args(ctx, &bootstrap.pod_name()).await?);
            info!(command = %redact(&argv), "Redis cluster creation command is");

            self.executor.host_exec(ctx, &bootstrap, &argv).await?;
            Ok(())
        }
        .instrument(ctx.span().clone())
        .await
    }

    /// Attach every follower to the leader with the same ordinal.
    ///
    /// Followers already present in leader 0's table are skipped, so the call
    /// is safe to repeat. A failed attachment does not stop the loop; the
    /// first such error is returned once every follower has been tried.
    /// Resolution and topology read failures abort immediately.
    pub async fn attach_followers(&self, ctx: &ClusterContext) -> Result<Vec<NodeRef>> {
        async {
            let bootstrap = ctx.bootstrap_node();
            let mut attached = Vec::new();
            let mut first_error = None;

            for follower in ctx.nodes(Role::Follower) {
                let leader = ctx.node(Role::Leader, follower.ordinal);
                let follower_addr = self.executor.resolve(&follower).await?;

                let table = self.reader.list_nodes(ctx, &bootstrap).await?;
                if is_present(&table, &follower_addr.ip_text()) {
                    info!(follower = %follower, "Skipping adding node to cluster, already present");
                    continue;
                }

                info!(follower = %follower, ip = %follower_addr, leader = %leader, "Adding node to cluster");
                let leader_addr = self.executor.resolve(&leader).await?;
                let argv = self
                    .replication_command(ctx, &leader, &leader_addr, &follower_addr)
                    .await?;
                match self.executor.host_exec(ctx, &bootstrap, &argv).await {
                    Ok(_) => attached.push(follower),
                    Err(e) => {
                        warn!(follower = %follower, error = %e, "Failed to attach follower, continuing");
                        first_error.get_or_insert(e);
                    }
                }
            }

            match first_error {
                Some(e) => Err(e),
                None => Ok(attached),
            }
        }
        .instrument(ctx.span().clone())
        .await
    }

    /// Create the mesh if leader 0 is alone and owns no slots, then attach followers
    pub async fn ensure_formed(&self, ctx: &ClusterContext) -> Result<FormationReport> {
        async {
            let mut report = FormationReport::default();

            let table = self.reader.list_nodes(ctx, &ctx.bootstrap_node()).await?;
            let owns_slots = table.myself().map_or(false, |row| !row.slots.is_empty());
            if table.len() <= 1 && !owns_slots {
                self.create_cluster(ctx).await?;
                report.created = true;
            } else {
                info!(nodes = table.len(), "Cluster mesh already exists");
            }

            if ctx.spec().replicas(Role::Follower) > 0 {
                report.attached = self
                    .attach_followers(ctx)
                    .await?
                    .iter()
                    .map(NodeRef::pod_name)
                    .collect();
            }
            Ok(report)
        }
        .instrument(ctx.span().clone())
        .await
    }

    async fn replication_command(
        &self,
        ctx: &ClusterContext,
        leader: &NodeRef,
        leader_addr: &NodeAddress,
        follower_addr: &NodeAddress,
    ) -> Result<Vec<String>> {
        let port = self.executor.config().redis_port;
        let mut argv = self.cli_prefix("add-node");
        argv.push(follower_addr.host_port(port));
        argv.push(leader_addr.host_port(port));
        argv.push("--cluster-slave".to_string());
        argv.extend(self.executor.cli_auth_args(ctx, &leader.pod_name()).await?);
        info!(command = %redact(&argv), "Redis replication creation command is");
        Ok(argv)
    }

    fn cli_prefix(&self, action: &str) -> Vec<String> {
        vec![
            self.executor.config().cli_path.clone(),
            "--cluster".to_string(),
            action.to_string(),
        ]
    }
}
