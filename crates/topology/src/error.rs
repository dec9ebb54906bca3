//! Error types for topology operations

/// Errors raised while inspecting or mutating a cluster's topology.
///
/// The variants follow the propagation policy of the orchestrator: resolution
/// and read failures abort an operation, forget failures are swallowed by the
/// caller, reset failures get one flush fallback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    /// A node's network address could not be resolved
    #[error("address resolution failed: {0}")]
    Resolution(String),
    /// A data-plane command failed or returned unusable output
    #[error("command failed: {0}")]
    Command(String),
    /// A command could not be run inside the node's container
    #[error("execution failed: {0}")]
    Execution(String),
    /// An upstream object (cluster spec, secret, pod) does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// The cluster spec cannot be acted upon
    #[error("invalid cluster spec: {0}")]
    InvalidSpec(String),
}

impl From<resp::RespError> for MeshError {
    fn from(e: resp::RespError) -> Self {
        MeshError::Command(e.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, MeshError>;
