//! Topology - Redis cluster mesh management
//!
//! Keeps the node mesh of a sharded, replicated Redis cluster coherent:
//! forms the initial mesh, attaches replicas to their shard owners, reads
//! node tables to spot failed or partitioned members, and drives the
//! cluster back to a fully meshed state after partial failure.
//!
//! # Components
//! - [`NodeLocator`]: resolves a node to its current pod address
//! - [`Executor`]: runs data-plane commands and in-container host commands
//! - [`TopologyReader`]: reads and interprets `CLUSTER NODES`
//! - [`Formation`]: initial mesh creation and replica attachment
//! - [`Failover`]: forced and graceful recovery
//! - [`Orchestrator`]: per-cluster serialized entry point for all of the above
//!
//! Platform access (cluster specs, pod IPs, secrets, exec) goes through the
//! traits in [`runtime`].

pub mod client;
pub mod cluster;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod failover;
pub mod formation;
pub mod locator;
pub mod locks;
pub mod orchestrator;
pub mod reader;
pub mod runtime;
pub mod table;

pub use client::{ClientOptions, DataPlane, RespDataPlane, TlsOptions};
pub use cluster::{protocol_role, ClusterId, ClusterSpec, NodeRef, Role, SecretKeyRef, TlsSpec};
pub use command::Command;
pub use config::ClientConfig;
pub use context::ClusterContext;
pub use error::{MeshError, Result};
pub use executor::Executor;
pub use failover::Failover;
pub use formation::{Formation, FormationReport};
pub use locator::{NodeAddress, NodeLocator};
pub use locks::{ClusterGuard, ClusterLocks};
pub use orchestrator::Orchestrator;
pub use reader::{ClusterStatus, TopologyReader};
pub use runtime::{ClusterSource, ExecOutput, PodExecutor, PodResolver, Runtime, SecretSource};
pub use table::{count_nodes, count_unhealthy, is_present, NodeTable, NodeTableRow};
