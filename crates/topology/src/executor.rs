//! Remote command execution
//!
//! Two surfaces: data-plane commands sent to a node's Redis port, and host
//! commands run inside the leader container (only used for the cluster tool
//! invocations that need the whole address list at once). Neither retries.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::client::{ClientOptions, DataPlane, TlsOptions};
use crate::cluster::NodeRef;
use crate::command::{redact, Command};
use crate::config::ClientConfig;
use crate::context::ClusterContext;
use crate::error::{MeshError, Result};
use crate::locator::{NodeAddress, NodeLocator};
use crate::runtime::{ExecOutput, PodExecutor, SecretSource};

/// Runs commands against cluster nodes
#[derive(Clone)]
pub struct Executor {
    config: ClientConfig,
    locator: NodeLocator,
    secrets: Arc<dyn SecretSource>,
    pods: Arc<dyn PodExecutor>,
    data_plane: Arc<dyn DataPlane>,
}

impl Executor {
    pub fn new(
        config: ClientConfig,
        locator: NodeLocator,
        secrets: Arc<dyn SecretSource>,
        pods: Arc<dyn PodExecutor>,
        data_plane: Arc<dyn DataPlane>,
    ) -> Self {
        Self {
            config,
            locator,
            secrets,
            pods,
            data_plane,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve a node's current address
    pub async fn resolve(&self, node: &NodeRef) -> Result<NodeAddress> {
        self.locator.resolve(node).await
    }

    /// Send one data-plane command to a node and return its textual reply
    pub async fn run(&self, ctx: &ClusterContext, node: &NodeRef, command: &Command) -> Result<String> {
        let address = self.resolve(node).await?;
        let options = self.client_options(ctx, node, &address).await?;
        debug!(node = %node, addr = %options.addr, command = %command, "Running command");
        self.data_plane.send(&options, command).await
    }

    async fn client_options(
        &self,
        ctx: &ClusterContext,
        node: &NodeRef,
        address: &NodeAddress,
    ) -> Result<ClientOptions> {
        let password = self.password(ctx).await?;
        let tls = ctx.spec().tls_enabled().then(|| TlsOptions {
            ca_path: self.config.tls_ca_path.clone(),
            server_name: node.pod_name(),
        });
        Ok(ClientOptions {
            addr: address.host_port(self.config.redis_port),
            password,
            tls,
            timeout: self.config.command_timeout,
        })
    }

    /// Fetch the cluster password, if the cluster references one
    pub async fn password(&self, ctx: &ClusterContext) -> Result<Option<String>> {
        let Some(secret) = &ctx.spec().password else {
            return Ok(None);
        };
        match self
            .secrets
            .secret_value(&ctx.id().namespace, &secret.name, &secret.key)
            .await
        {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                error!(secret = %secret.name, key = %secret.key, error = %e, "Error in getting redis password");
                Err(match e {
                    MeshError::NotFound(msg) => MeshError::NotFound(msg),
                    other => MeshError::NotFound(other.to_string()),
                })
            }
        }
    }

    /// Credential and TLS arguments for the cluster tool.
    ///
    /// `tls_host` is the name passed with `-h`, which must match the
    /// certificate of the node the tool connects to first.
    pub async fn cli_auth_args(&self, ctx: &ClusterContext, tls_host: &str) -> Result<Vec<String>> {
        let mut args = Vec::new();
        if let Some(password) = self.password(ctx).await? {
            args.push("-a".to_string());
            args.push(password);
        }
        if ctx.spec().tls_enabled() {
            args.push("--tls".to_string());
            args.push("--cacert".to_string());
            args.push(self.config.tls_ca_path.display().to_string());
            args.push("-h".to_string());
            args.push(tls_host.to_string());
        }
        Ok(args)
    }

    /// Run a command line inside the node's control container.
    ///
    /// The container is found by the `<cluster>-leader` naming convention.
    pub async fn host_exec(
        &self,
        ctx: &ClusterContext,
        node: &NodeRef,
        argv: &[String],
    ) -> Result<ExecOutput> {
        let pod = node.pod_name();
        let namespace = node.namespace();
        let wanted = ctx.control_container();

        let containers = self.pods.containers(namespace, &pod).await.map_err(|e| {
            error!(pod = %pod, error = %e, "Could not get pod info");
            MeshError::Execution(format!("inspect pod {}: {}", pod, e))
        })?;
        let container = containers
            .into_iter()
            .find(|name| *name == wanted)
            .ok_or_else(|| {
                error!(pod = %pod, container = %wanted, "Could not find pod to execute");
                MeshError::Execution(format!("pod {} has no container named {}", pod, wanted))
            })?;

        let command = redact(argv);
        let session = self.pods.exec(namespace, &pod, &container, argv);
        let outcome = match tokio::time::timeout(self.config.exec_timeout, session).await {
            Ok(outcome) => outcome,
            Err(_) => Err(MeshError::Execution(format!(
                "exec in {} timed out after {:?}",
                pod, self.config.exec_timeout
            ))),
        };

        match outcome {
            Ok(output) => {
                info!(pod = %pod, command = %command, output = %output.stdout.trim_end(), "Successfully executed the command");
                Ok(output)
            }
            Err(e) => {
                error!(pod = %pod, command = %command, error = %e, "Could not execute command");
                Err(match e {
                    MeshError::Execution(msg) => MeshError::Execution(msg),
                    other => MeshError::Execution(other.to_string()),
                })
            }
        }
    }
}
