//! Per-operation cluster context

use tracing::{info_span, Span};

use crate::cluster::{ClusterId, ClusterSpec, NodeRef, Role};

/// Everything one orchestration run knows about its cluster.
///
/// Built once at the start of an operation and handed to every component.
/// The logging span lives here so components log under the cluster's
/// namespace and name without rebuilding that context themselves.
#[derive(Debug, Clone)]
pub struct ClusterContext {
    id: ClusterId,
    spec: ClusterSpec,
    span: Span,
}

impl ClusterContext {
    pub fn new(id: ClusterId, spec: ClusterSpec) -> Self {
        let span = info_span!("redis_manager", namespace = %id.namespace, name = %id.name);
        Self { id, spec, span }
    }

    /// Use a caller-provided span instead of the default one
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn id(&self) -> &ClusterId {
        &self.id
    }

    pub fn spec(&self) -> &ClusterSpec {
        &self.spec
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn node(&self, role: Role, ordinal: u32) -> NodeRef {
        self.id.node(role, ordinal)
    }

    /// Every node of a role in ordinal order
    pub fn nodes(&self, role: Role) -> impl Iterator<Item = NodeRef> + '_ {
        (0..self.spec.replicas(role)).map(move |ordinal| self.id.node(role, ordinal))
    }

    /// The node every cluster-wide read and bootstrap goes through
    pub fn bootstrap_node(&self) -> NodeRef {
        self.node(Role::Leader, 0)
    }

    /// Name of the container host commands run in
    pub fn control_container(&self) -> String {
        format!("{}-leader", self.id.name)
    }
}
