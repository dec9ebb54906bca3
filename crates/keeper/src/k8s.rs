//! Kubernetes collaborators
//!
//! Reads `RedisCluster` resources, pod IPs and secrets through the API server
//! and runs host commands with the pod exec subresource.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Secret};
use kube::api::{Api, AttachParams};
use kube::{Client, CustomResource};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use topology::{
    ClusterId, ClusterSource, ClusterSpec, ExecOutput, MeshError, PodExecutor, PodResolver,
    Result, Runtime, SecretSource, TlsSpec,
};

/// Declarative Redis cluster owned by the reconciliation side
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "redis.redis.opstreelabs.in",
    version = "v1beta1",
    kind = "RedisCluster",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct RedisClusterSpec {
    /// Number of shards; per-role replica counts default to it
    pub cluster_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_leader: Option<RoleReplicas>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_follower: Option<RoleReplicas>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_config: Option<KubernetesConfig>,
    #[serde(rename = "TLS", default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoleReplicas {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_secret: Option<SecretKeySelector>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SecretKeySelector {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TlsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<TlsSecret>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsSecret {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

impl RedisClusterSpec {
    /// Engine view of the resource
    pub fn to_cluster_spec(&self) -> ClusterSpec {
        let replicas = |role: &Option<RoleReplicas>| {
            role.as_ref()
                .and_then(|r| r.replicas)
                .unwrap_or(self.cluster_size)
        };
        let mut spec = ClusterSpec::new(replicas(&self.redis_leader), replicas(&self.redis_follower));

        if let Some(secret) = self
            .kubernetes_config
            .as_ref()
            .and_then(|k| k.redis_secret.as_ref())
        {
            spec = spec.with_password(&secret.name, &secret.key);
        }
        if let Some(tls) = &self.tls {
            spec = spec.with_tls(TlsSpec {
                secret_name: tls.secret.as_ref().and_then(|s| s.secret_name.clone()),
            });
        }
        spec
    }
}

/// All four collaborators backed by one API client
#[derive(Clone)]
pub struct KubeRuntime {
    client: Client,
}

impl KubeRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn runtime(self) -> Runtime {
        let this = Arc::new(self);
        Runtime {
            clusters: this.clone(),
            pods: this.clone(),
            secrets: this.clone(),
            exec: this,
        }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get_pod(&self, namespace: &str, pod: &str) -> Result<Pod> {
        self.pods(namespace)
            .get(pod)
            .await
            .map_err(|e| lookup_error("pod", namespace, pod, e))
    }
}

/// A 404 becomes `NotFound`; any other API failure keeps its message
fn lookup_error(kind: &str, namespace: &str, name: &str, e: kube::Error) -> MeshError {
    match e {
        kube::Error::Api(resp) if resp.code == 404 => {
            MeshError::NotFound(format!("{} {}/{}", kind, namespace, name))
        }
        other => MeshError::NotFound(format!("{} {}/{}: {}", kind, namespace, name, other)),
    }
}

#[async_trait]
impl ClusterSource for KubeRuntime {
    async fn cluster_spec(&self, id: &ClusterId) -> Result<ClusterSpec> {
        let api: Api<RedisCluster> = Api::namespaced(self.client.clone(), &id.namespace);
        let cluster = api
            .get(&id.name)
            .await
            .map_err(|e| lookup_error("rediscluster", &id.namespace, &id.name, e))?;
        Ok(cluster.spec.to_cluster_spec())
    }
}

#[async_trait]
impl PodResolver for KubeRuntime {
    async fn pod_address(&self, namespace: &str, pod: &str) -> Result<String> {
        let pod = self.get_pod(namespace, pod).await?;
        Ok(pod.status.and_then(|s| s.pod_ip).unwrap_or_default())
    }
}

#[async_trait]
impl SecretSource for KubeRuntime {
    async fn secret_value(&self, namespace: &str, name: &str, key: &str) -> Result<String> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get(name)
            .await
            .map_err(|e| lookup_error("secret", namespace, name, e))?;
        let bytes = secret
            .data
            .and_then(|mut data| data.remove(key))
            .ok_or_else(|| MeshError::NotFound(format!("key {} in secret {}/{}", key, namespace, name)))?;
        String::from_utf8(bytes.0).map_err(|e| {
            MeshError::NotFound(format!("key {} in secret {}/{} is not utf-8: {}", key, namespace, name, e))
        })
    }
}

#[async_trait]
impl PodExecutor for KubeRuntime {
    async fn containers(&self, namespace: &str, pod: &str) -> Result<Vec<String>> {
        let pod = self.get_pod(namespace, pod).await?;
        Ok(pod
            .spec
            .map(|spec| spec.containers.into_iter().map(|c| c.name).collect())
            .unwrap_or_default())
    }

    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        argv: &[String],
    ) -> Result<ExecOutput> {
        let params = AttachParams::default()
            .container(container)
            .stdin(false)
            .stdout(true)
            .stderr(true);
        let mut process = self
            .pods(namespace)
            .exec(pod, argv.to_vec(), &params)
            .await
            .map_err(|e| MeshError::Execution(format!("exec in {}/{}: {}", namespace, pod, e)))?;

        let status = process.take_status();
        let (stdout, stderr) = tokio::join!(read_stream(process.stdout()), read_stream(process.stderr()));
        let output = ExecOutput {
            stdout: stdout.map_err(|e| MeshError::Execution(format!("read stdout of {}: {}", pod, e)))?,
            stderr: stderr.map_err(|e| MeshError::Execution(format!("read stderr of {}: {}", pod, e)))?,
        };

        let status = match status {
            Some(status) => status.await,
            None => None,
        };
        process
            .join()
            .await
            .map_err(|e| MeshError::Execution(format!("exec session in {}: {}", pod, e)))?;

        if let Some(status) = status {
            debug!(pod = %pod, status = ?status.status, "Exec finished");
            if status.status.as_deref() == Some("Failure") {
                let reason = status.message.unwrap_or_default();
                return Err(MeshError::Execution(format!(
                    "{}: {}",
                    reason,
                    output.stderr.trim_end()
                )));
            }
        }
        Ok(output)
    }
}

async fn read_stream(stream: Option<impl AsyncRead + Unpin>) -> std::io::Result<String> {
    let mut buf = String::new();
    if let Some(mut stream) = stream {
        stream.read_to_string(&mut buf).await?;
    }
    Ok(buf)
}
