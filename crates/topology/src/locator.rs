//! Node address resolution

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use tracing::debug;

use crate::cluster::NodeRef;
use crate::error::{MeshError, Result};
use crate::runtime::PodResolver;

/// Resolved network address of a node.
///
/// Pod IPs change across restarts, so an address is only valid for the
/// operation that resolved it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAddress(IpAddr);

impl NodeAddress {
    pub fn new(ip: IpAddr) -> Self {
        Self(ip)
    }

    pub fn ip(&self) -> IpAddr {
        self.0
    }

    /// Bare IP text, as it appears in `CLUSTER NODES` and `CLUSTER MEET`
    pub fn ip_text(&self) -> String {
        self.0.to_string()
    }

    /// `host:port`, with IPv6 hosts bracketed
    pub fn host_port(&self, port: u16) -> String {
        format!("{}:{}", self, port)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            IpAddr::V4(ip) => write!(f, "{}", ip),
            IpAddr::V6(ip) => write!(f, "[{}]", ip),
        }
    }
}

/// Looks up a node's live address through the pod resolver
#[derive(Clone)]
pub struct NodeLocator {
    pods: Arc<dyn PodResolver>,
}

impl NodeLocator {
    pub fn new(pods: Arc<dyn PodResolver>) -> Self {
        Self { pods }
    }

    /// Resolve a node to its current address.
    ///
    /// Fails with [`MeshError::Resolution`] when the pod is missing, has no IP
    /// yet, or reports something that is not an IP. Never retried here.
    pub async fn resolve(&self, node: &NodeRef) -> Result<NodeAddress> {
        let pod = node.pod_name();
        let raw = self
            .pods
            .pod_address(node.namespace(), &pod)
            .await
            .map_err(|e| match e {
                MeshError::NotFound(msg) => MeshError::Resolution(msg),
                other => MeshError::Resolution(other.to_string()),
            })?;

        if raw.is_empty() {
            return Err(MeshError::Resolution(format!(
                "pod {} has no address yet",
                pod
            )));
        }

        let ip: IpAddr = raw.parse().map_err(|_| {
            MeshError::Resolution(format!("pod {} reported invalid address {:?}", pod, raw))
        })?;
        let address = NodeAddress(ip);
        debug!(node = %pod, ip = %address, ipv6 = ip.is_ipv6(), "Resolved node address");
        Ok(address)
    }
}
