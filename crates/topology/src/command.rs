//! Data-plane commands issued against cluster nodes

use std::fmt;

/// One Redis command: an ordered list of arguments.
///
/// Built per operation, sent once, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<String>,
}

impl Command {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `CLUSTER NODES`
    pub fn cluster_nodes() -> Self {
        Self::new(["CLUSTER", "NODES"])
    }

    /// `CLUSTER MEET <ip> <port>`
    pub fn cluster_meet(ip: &str, port: u16) -> Self {
        Self::new(["CLUSTER".to_string(), "MEET".to_string(), ip.to_string(), port.to_string()])
    }

    /// `CLUSTER FORGET <node-id>`
    pub fn cluster_forget(node_id: &str) -> Self {
        Self::new(["CLUSTER", "FORGET", node_id])
    }

    /// `CLUSTER FAILOVER TAKEOVER`
    pub fn cluster_failover_takeover() -> Self {
        Self::new(["CLUSTER", "FAILOVER", "TAKEOVER"])
    }

    /// `CLUSTER RESET`
    pub fn cluster_reset() -> Self {
        Self::new(["CLUSTER", "RESET"])
    }

    /// `FLUSHALL`
    pub fn flushall() -> Self {
        Self::new(["FLUSHALL"])
    }

    /// `AUTH <password>`
    pub fn auth(password: &str) -> Self {
        Self::new(["AUTH", password])
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never leak credentials into logs
        if self.args.first().map_or(false, |a| a.eq_ignore_ascii_case("AUTH")) {
            return f.write_str("AUTH ******");
        }
        f.write_str(&self.args.join(" "))
    }
}

/// Render a host command line with the value after `-a` masked
pub fn redact(argv: &[String]) -> String {
    let mut out = Vec::with_capacity(argv.len());
    let mut mask_next = false;
    for arg in argv {
        if mask_next {
            out.push("******");
            mask_next = false;
        } else {
            out.push(arg.as_str());
            mask_next = arg == "-a";
        }
    }
    out.join(" ")
}
