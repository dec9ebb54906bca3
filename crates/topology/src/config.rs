//! Data-plane client settings

use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by every connection and host command the engine issues
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Redis port on every node
    pub redis_port: u16,
    /// CA bundle mounted into the operator when TLS is enabled
    pub tls_ca_path: PathBuf,
    /// Cluster management tool run inside the leader container
    pub cli_path: String,
    /// Deadline for one data-plane exchange (connect, auth, command, reply)
    pub command_timeout: Duration,
    /// Deadline for one host exec session
    pub exec_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            redis_port: 6379,
            tls_ca_path: PathBuf::from("/tls/ca.crt"),
            cli_path: "redis-cli".to_string(),
            command_timeout: Duration::from_secs(10),
            exec_timeout: Duration::from_secs(120),
        }
    }
}
