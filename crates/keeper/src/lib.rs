//! Keeper - command surface for the Redis cluster topology engine
//!
//! Wires the [`topology`] engine to Kubernetes and exposes its recovery and
//! formation operations over HTTP.

pub mod api;
pub mod config;
pub mod k8s;

pub use api::CommandApi;
pub use config::{Config, ConfigError, LogConfig, RedisConfig, ServerConfig};
pub use k8s::{KubeRuntime, RedisCluster, RedisClusterSpec};
