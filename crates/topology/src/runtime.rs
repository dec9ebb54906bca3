//! Collaborator interfaces
//!
//! Everything the engine needs from the surrounding platform: the cluster's
//! declarative spec, pod addresses, secrets and in-container execution.
//! Implementations report missing objects as
//! [`MeshError::NotFound`](crate::MeshError::NotFound) and failed exec
//! sessions as [`MeshError::Execution`](crate::MeshError::Execution).

use std::sync::Arc;

use async_trait::async_trait;

use crate::cluster::{ClusterId, ClusterSpec};
use crate::error::Result;

/// Source of cluster specifications
#[async_trait]
pub trait ClusterSource: Send + Sync {
    async fn cluster_spec(&self, id: &ClusterId) -> Result<ClusterSpec>;
}

/// Resolves a pod to its current IP address
#[async_trait]
pub trait PodResolver: Send + Sync {
    /// Returns the pod IP as text; an empty string means no address assigned yet
    async fn pod_address(&self, namespace: &str, pod: &str) -> Result<String>;
}

/// Reads secret values
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn secret_value(&self, namespace: &str, name: &str, key: &str) -> Result<String>;
}

/// Captured output of a command run inside a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs commands inside pod containers
#[async_trait]
pub trait PodExecutor: Send + Sync {
    /// Names of the pod's containers, in spec order
    async fn containers(&self, namespace: &str, pod: &str) -> Result<Vec<String>>;

    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        argv: &[String],
    ) -> Result<ExecOutput>;
}

/// Bundle of platform collaborators handed to the engine
#[derive(Clone)]
pub struct Runtime {
    pub clusters: Arc<dyn ClusterSource>,
    pub pods: Arc<dyn PodResolver>,
    pub secrets: Arc<dyn SecretSource>,
    pub exec: Arc<dyn PodExecutor>,
}
