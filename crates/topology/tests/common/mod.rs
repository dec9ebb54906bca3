//! In-memory stand-in for a cluster's pods, secrets and Redis nodes.
//!
//! Every data-plane command and host exec is recorded. `CLUSTER NODES` is
//! rendered from a shared membership list, and the cluster tool's `create`
//! and `add-node` invocations mutate that list the way the real tool would.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use topology::{
    ClientConfig, ClientOptions, ClusterContext, ClusterId, ClusterSource, ClusterSpec, Command,
    DataPlane, ExecOutput, MeshError, Orchestrator, PodExecutor, PodResolver, Result, Role,
    Runtime, SecretSource,
};

pub const NAMESPACE: &str = "redis";
pub const CLUSTER: &str = "cache";

pub fn cluster_id() -> ClusterId {
    ClusterId::new(NAMESPACE, CLUSTER)
}

pub fn pod(role: Role, ordinal: u32) -> String {
    cluster_id().node(role, ordinal).pod_name()
}

pub fn node_id(pod: &str) -> String {
    format!("id-{}", pod)
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Command { pod: String, command: String },
    Exec { pod: String, container: String, argv: Vec<String> },
}

#[derive(Debug, Clone)]
struct Member {
    pod: String,
    master: Option<String>,
    failed: bool,
    /// Slot range owned after `create`
    slots: Option<String>,
}

#[derive(Default)]
struct State {
    spec: ClusterSpec,
    ips: HashMap<String, String>,
    containers: HashMap<String, Vec<String>>,
    secrets: HashMap<(String, String), String>,
    members: Vec<Member>,
    command_failures: Vec<(String, String)>,
    exec_failures: Vec<String>,
    calls: Vec<Call>,
    passwords: Vec<Option<String>>,
    tls_names: Vec<Option<String>>,
    delay: Option<Duration>,
}

impl State {
    fn pod_for_addr(&self, addr: &str) -> Option<String> {
        let host = addr.rsplit_once(':').map_or(addr, |(host, _)| host);
        let host = host.trim_start_matches('[').trim_end_matches(']');
        self.ips
            .iter()
            .find(|(_, ip)| ip.as_str() == host)
            .map(|(pod, _)| pod.clone())
    }

    fn join(&mut self, pod: String, master: Option<String>) {
        if self.members.iter().any(|m| m.pod == pod) {
            return;
        }
        self.members.push(Member {
            pod,
            master,
            failed: false,
            slots: None,
        });
    }

    fn assign_slots(&mut self, pod: &str, slots: &str) {
        if let Some(member) = self.members.iter_mut().find(|m| m.pod == pod) {
            member.slots = Some(slots.to_string());
        }
    }

    fn render_table(&self, viewer: &str) -> String {
        let alone = [Member {
            pod: viewer.to_string(),
            master: None,
            failed: false,
            slots: None,
        }];
        let members: &[Member] = if self.members.iter().any(|m| m.pod == viewer) {
            &self.members
        } else {
            &alone
        };

        let mut out = String::new();
        for member in members {
            let ip = self.ips.get(&member.pod).cloned().unwrap_or_default();
            let mut flags = Vec::new();
            if member.pod == viewer {
                flags.push("myself");
            }
            flags.push(if member.master.is_some() { "slave" } else { "master" });
            if member.failed {
                flags.push("fail");
            }
            let master = member.master.as_deref().map_or("-".to_string(), node_id);
            let link = if member.failed { "disconnected" } else { "connected" };
            let mut row = format!(
                "{} {}:6379@16379 {} {} 0 1700000000000 1 {}",
                node_id(&member.pod),
                ip,
                flags.join(","),
                master,
                link
            );
            if let Some(slots) = &member.slots {
                row.push(' ');
                row.push_str(slots);
            }
            row.push('\n');
            out.push_str(&row);
        }
        out
    }
}

/// Fake platform and data plane for one cluster named `redis/cache`.
///
/// Leaders get IPs `10.0.0.10` upward, followers continue after the last
/// leader. Every pod has a `cache-<role>` container plus an exporter sidecar.
#[derive(Clone)]
pub struct FakeCluster {
    state: Arc<Mutex<State>>,
}

impl FakeCluster {
    pub fn new(spec: ClusterSpec) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let mut state = State {
            spec: spec.clone(),
            ..Default::default()
        };
        let mut octet = 10;
        for role in [Role::Leader, Role::Follower] {
            for ordinal in 0..spec.replicas(role) {
                let name = pod(role, ordinal);
                state.ips.insert(name.clone(), format!("10.0.0.{}", octet));
                state.containers.insert(
                    name,
                    vec![format!("{}-{}", CLUSTER, role), "redis-exporter".to_string()],
                );
                octet += 1;
            }
        }
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn runtime(&self) -> Runtime {
        Runtime {
            clusters: Arc::new(self.clone()),
            pods: Arc::new(self.clone()),
            secrets: Arc::new(self.clone()),
            exec: Arc::new(self.clone()),
        }
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(ClientConfig::default(), self.runtime(), Arc::new(self.clone()))
    }

    pub fn context(&self) -> ClusterContext {
        ClusterContext::new(cluster_id(), self.state.lock().spec.clone())
    }

    pub fn ip(&self, pod: &str) -> String {
        self.state.lock().ips.get(pod).cloned().unwrap_or_default()
    }

    pub fn with_secret(self, name: &str, key: &str, value: &str) -> Self {
        self.state
            .lock()
            .secrets
            .insert((name.to_string(), key.to_string()), value.to_string());
        self
    }

    /// Put every leader into one mesh
    pub fn mesh_leaders(&self) {
        let mut state = self.state.lock();
        for ordinal in 0..state.spec.leader_replicas {
            state.join(pod(Role::Leader, ordinal), None);
        }
    }

    pub fn add_replica(&self, follower: &str, leader: &str) {
        self.state
            .lock()
            .join(follower.to_string(), Some(leader.to_string()));
    }

    /// Show a member as failed and disconnected in every table
    pub fn mark_failed(&self, pod: &str) {
        let mut state = self.state.lock();
        if let Some(member) = state.members.iter_mut().find(|m| m.pod == pod) {
            member.failed = true;
        }
    }

    /// Fail data-plane commands on `pod` whose text starts with `prefix`
    pub fn fail_command(&self, pod: &str, prefix: &str) {
        self.state
            .lock()
            .command_failures
            .push((pod.to_string(), prefix.to_string()));
    }

    /// Fail host execs whose command line contains `fragment`
    pub fn fail_exec(&self, fragment: &str) {
        self.state.lock().exec_failures.push(fragment.to_string());
    }

    pub fn set_containers(&self, pod: &str, containers: &[&str]) {
        self.state
            .lock()
            .containers
            .insert(pod.to_string(), strings(containers));
    }

    /// Pod exists but has no IP assigned
    pub fn clear_ip(&self, pod: &str) {
        self.state.lock().ips.insert(pod.to_string(), String::new());
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Data-plane commands as `(pod, command)`
    pub fn commands(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Command { pod, command } => Some((pod, command)),
                Call::Exec { .. } => None,
            })
            .collect()
    }

    /// Commands whose text starts with `prefix`, as `(pod, command)`
    pub fn commands_starting_with(&self, prefix: &str) -> Vec<(String, String)> {
        self.commands()
            .into_iter()
            .filter(|(_, command)| command.starts_with(prefix))
            .collect()
    }

    /// Host execs as `(pod, container, argv)`
    pub fn execs(&self) -> Vec<(String, String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Exec {
                    pod,
                    container,
                    argv,
                } => Some((pod, container, argv)),
                Call::Command { .. } => None,
            })
            .collect()
    }

    pub fn passwords(&self) -> Vec<Option<String>> {
        self.state.lock().passwords.clone()
    }

    pub fn tls_names(&self) -> Vec<Option<String>> {
        self.state.lock().tls_names.clone()
    }
}

#[async_trait]
impl ClusterSource for FakeCluster {
    async fn cluster_spec(&self, id: &ClusterId) -> Result<ClusterSpec> {
        if *id != cluster_id() {
            return Err(MeshError::NotFound(format!("rediscluster {}", id)));
        }
        Ok(self.state.lock().spec.clone())
    }
}

#[async_trait]
impl PodResolver for FakeCluster {
    async fn pod_address(&self, _namespace: &str, pod: &str) -> Result<String> {
        self.state
            .lock()
            .ips
            .get(pod)
            .cloned()
            .ok_or_else(|| MeshError::NotFound(format!("pod {}", pod)))
    }
}

#[async_trait]
impl SecretSource for FakeCluster {
    async fn secret_value(&self, _namespace: &str, name: &str, key: &str) -> Result<String> {
        self.state
            .lock()
            .secrets
            .get(&(name.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| MeshError::NotFound(format!("secret {}/{}", name, key)))
    }
}

#[async_trait]
impl PodExecutor for FakeCluster {
    async fn containers(&self, _namespace: &str, pod: &str) -> Result<Vec<String>> {
        self.state
            .lock()
            .containers
            .get(pod)
            .cloned()
            .ok_or_else(|| MeshError::NotFound(format!("pod {}", pod)))
    }

    async fn exec(
        &self,
        _namespace: &str,
        pod: &str,
        container: &str,
        argv: &[String],
    ) -> Result<ExecOutput> {
        let mut state = self.state.lock();
        state.calls.push(Call::Exec {
            pod: pod.to_string(),
            container: container.to_string(),
            argv: argv.to_vec(),
        });

        let line = argv.join(" ");
        if state.exec_failures.iter().any(|f| line.contains(f.as_str())) {
            return Err(MeshError::Execution(
                "command terminated with exit code 1".to_string(),
            ));
        }

        match argv.get(2).map(String::as_str) {
            Some("create") => {
                let addrs: Vec<String> = argv[3..]
                    .iter()
                    .take_while(|arg| !arg.starts_with("--"))
                    .cloned()
                    .collect();
                for addr in addrs {
                    if let Some(leader) = state.pod_for_addr(&addr) {
                        state.join(leader.clone(), None);
                        state.assign_slots(&leader, "0-16383");
                    }
                }
            }
            Some("add-node") => {
                let follower = argv.get(3).and_then(|a| state.pod_for_addr(a));
                let leader = argv.get(4).and_then(|a| state.pod_for_addr(a));
                if let (Some(follower), Some(leader)) = (follower, leader) {
                    state.join(follower, Some(leader));
                }
            }
            _ => {}
        }

        Ok(ExecOutput {
            stdout: "[OK] All 16384 slots covered.\n".to_string(),
            stderr: String::new(),
        })
    }
}

#[async_trait]
impl DataPlane for FakeCluster {
    async fn send(&self, options: &ClientOptions, command: &Command) -> Result<String> {
        let delay = self.state.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        let pod = state
            .pod_for_addr(&options.addr)
            .ok_or_else(|| MeshError::Command(format!("connect {}: connection refused", options.addr)))?;
        let text = command.to_string();
        state.calls.push(Call::Command {
            pod: pod.clone(),
            command: text.clone(),
        });
        state.passwords.push(options.password.clone());
        state
            .tls_names
            .push(options.tls.as_ref().map(|tls| tls.server_name.clone()));

        if state
            .command_failures
            .iter()
            .any(|(p, prefix)| *p == pod && text.starts_with(prefix.as_str()))
        {
            return Err(MeshError::Command(format!("{} failed on {}", text, pod)));
        }

        if text == "CLUSTER NODES" {
            return Ok(state.render_table(&pod));
        }
        Ok("OK".to_string())
    }
}
