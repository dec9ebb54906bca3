//! `CLUSTER NODES` table parsing
//!
//! Each line of the reply describes one node as whitespace separated fields:
//!
//! ```text
//! <id> <ip:port@bus> <flags> <master-id|-> <ping-sent> <pong-recv> <config-epoch> <link-state> [<slot> ...]
//! ```
//!
//! The first eight fields are fixed; slot ranges (and anything a future
//! server version appends) are kept as opaque trailing fields.

use std::collections::HashSet;

use crate::cluster::protocol_role;
use crate::error::{MeshError, Result};

/// Number of fixed leading fields on every row
pub const MIN_FIELDS: usize = 8;

/// One node as seen by the node that produced the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTableRow {
    pub id: String,
    /// `ip:port@bus-port`
    pub address: String,
    /// Comma separated flags, e.g. `myself,master`
    pub flags: String,
    /// Master node id, or `-` for masters
    pub master_id: String,
    /// Kept verbatim; only membership, flags and link state are interpreted
    pub ping_sent: String,
    pub pong_recv: String,
    pub config_epoch: String,
    /// `connected` or `disconnected`
    pub link_state: String,
    /// Slot ranges and any further trailing fields
    pub slots: Vec<String>,
}

impl NodeTableRow {
    fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < MIN_FIELDS {
            return Err(MeshError::Command(format!(
                "node table row has {} fields, expected at least {}: {:?}",
                fields.len(),
                MIN_FIELDS,
                line
            )));
        }

        Ok(Self {
            id: fields[0].to_string(),
            address: fields[1].to_string(),
            flags: fields[2].to_string(),
            master_id: fields[3].to_string(),
            ping_sent: fields[4].to_string(),
            pong_recv: fields[5].to_string(),
            config_epoch: fields[6].to_string(),
            link_state: fields[7].to_string(),
            slots: fields[MIN_FIELDS..].iter().map(|s| s.to_string()).collect(),
        })
    }

    /// IP portion of the address field, without port, bus port or brackets
    pub fn ip(&self) -> &str {
        let endpoint = self.address.split('@').next().unwrap_or_default();
        let host = match endpoint.rsplit_once(':') {
            // IPv4 and bracketed IPv6 both carry exactly one port separator
            Some((host, _port)) => host,
            None => endpoint,
        };
        host.trim_start_matches('[').trim_end_matches(']')
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_myself(&self) -> bool {
        self.has_flag("myself")
    }

    pub fn is_replica(&self) -> bool {
        self.has_flag("slave")
    }

    /// Failed flag set (`fail` or `fail?`) or the cluster bus link is down
    pub fn is_unhealthy(&self) -> bool {
        self.has_flag("fail") || self.link_state.contains("disconnected")
    }
}

/// Point-in-time membership view returned by one node.
///
/// Only meaningful relative to the node it was read from; tables from
/// different nodes are never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTable {
    rows: Vec<NodeTableRow>,
}

impl NodeTable {
    /// Parse a `CLUSTER NODES` reply.
    ///
    /// Blank lines are ignored. An empty reply or a row missing one of the
    /// fixed fields is an error: a live node always lists at least itself.
    pub fn parse(text: &str) -> Result<Self> {
        let rows = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(NodeTableRow::parse)
            .collect::<Result<Vec<_>>>()?;
        if rows.is_empty() {
            return Err(MeshError::Command("empty node table".to_string()));
        }
        Ok(Self { rows })
    }

    pub fn from_rows(rows: Vec<NodeTableRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[NodeTableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row describing the node that produced this table
    pub fn myself(&self) -> Option<&NodeTableRow> {
        self.rows.iter().find(|row| row.is_myself())
    }

    /// Distinct node ids in table order
    pub fn node_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|row| row.id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// Count rows matching a role filter.
///
/// An empty filter counts every row; `leader`/`follower` match the protocol
/// flags `master`/`slave`; other filters match the flag field verbatim.
pub fn count_nodes(table: &NodeTable, filter: &str) -> usize {
    if filter.is_empty() {
        return table.len();
    }
    let flag = protocol_role(filter);
    table.rows.iter().filter(|row| row.has_flag(flag)).count()
}

/// Count rows that are failed or disconnected, each row at most once
pub fn count_unhealthy(table: &NodeTable) -> usize {
    table.rows.iter().filter(|row| row.is_unhealthy()).count()
}

/// Whether some row's address has the given IP
pub fn is_present(table: &NodeTable, ip: &str) -> bool {
    table.rows.iter().any(|row| row.ip() == ip)
}
