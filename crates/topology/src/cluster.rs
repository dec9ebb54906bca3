//! Cluster identity and node naming

use std::fmt;

/// Replica role of a node within the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Leader,
    Follower,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Leader => "leader",
            Role::Follower => "follower",
        }
    }

    /// Flag the Redis protocol uses for this role in `CLUSTER NODES`
    pub fn protocol_flag(&self) -> &'static str {
        match self {
            Role::Leader => "master",
            Role::Follower => "slave",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a role filter to the flag substring used by the protocol.
///
/// `leader` and `follower` map to `master` and `slave`; anything else passes
/// through unchanged so callers can filter on raw flags like `fail`.
pub fn protocol_role(filter: &str) -> &str {
    match filter {
        "leader" => Role::Leader.protocol_flag(),
        "follower" => Role::Follower.protocol_flag(),
        other => other,
    }
}

/// Namespace-scoped cluster name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterId {
    pub namespace: String,
    pub name: String,
}

impl ClusterId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Reference to the node with the given role and ordinal
    pub fn node(&self, role: Role, ordinal: u32) -> NodeRef {
        NodeRef {
            cluster: self.clone(),
            role,
            ordinal,
        }
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A node of the cluster, identified by role and ordinal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub cluster: ClusterId,
    pub role: Role,
    pub ordinal: u32,
}

impl NodeRef {
    /// Canonical identity `<cluster>-<role>-<ordinal>`, which is also the pod name
    pub fn pod_name(&self) -> String {
        format!("{}-{}-{}", self.cluster.name, self.role, self.ordinal)
    }

    pub fn namespace(&self) -> &str {
        &self.cluster.namespace
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pod_name())
    }
}

/// Reference to a key inside a secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretKeyRef {
    pub name: String,
    pub key: String,
}

/// TLS settings of a cluster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSpec {
    /// Secret holding the certificates mounted into the pods
    pub secret_name: Option<String>,
}

/// Declarative shape of a cluster, owned by the reconciliation side
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterSpec {
    pub leader_replicas: u32,
    pub follower_replicas: u32,
    /// Password secret, when authentication is enabled
    pub password: Option<SecretKeyRef>,
    pub tls: Option<TlsSpec>,
}

impl ClusterSpec {
    pub fn new(leader_replicas: u32, follower_replicas: u32) -> Self {
        Self {
            leader_replicas,
            follower_replicas,
            password: None,
            tls: None,
        }
    }

    pub fn with_password(mut self, name: impl Into<String>, key: impl Into<String>) -> Self {
        self.password = Some(SecretKeyRef {
            name: name.into(),
            key: key.into(),
        });
        self
    }

    pub fn with_tls(mut self, tls: TlsSpec) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn replicas(&self, role: Role) -> u32 {
        match role {
            Role::Leader => self.leader_replicas,
            Role::Follower => self.follower_replicas,
        }
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls.is_some()
    }
}
