//! Hierarchical scope addressing
//!
//! A [`ScopePath`] is derived from a resource's identity tuple and decides
//! both which document holds the current state and how the scope is
//! spelled inside emitted scripts.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Level at which a configuration object is managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Cell,
    Cluster,
    Node,
    Server,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cell => "cell",
            Self::Cluster => "cluster",
            Self::Node => "node",
            Self::Server => "server",
        }
    }
}

impl FromStr for ScopeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cell" => Ok(Self::Cell),
            "cluster" => Ok(Self::Cluster),
            "node" => Ok(Self::Node),
            "server" => Ok(Self::Server),
            other => Err(Error::UnknownScope(other.to_string())),
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved scope address: cell, then optionally cluster or node/server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopePath {
    kind: ScopeKind,
    cell: String,
    cluster: Option<String>,
    node: Option<String>,
    server: Option<String>,
}

impl ScopePath {
    /// Derive a scope from identity components.
    ///
    /// Components not used by `kind` are ignored; components it needs must be
    /// present and non-empty.
    pub fn derive(
        kind: ScopeKind,
        cell: &str,
        cluster: Option<&str>,
        node: Option<&str>,
        server: Option<&str>,
    ) -> Result<Self> {
        let required = |value: Option<&str>, component: &'static str| -> Result<String> {
            match value {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => Err(Error::MissingScopeComponent {
                    kind: kind.to_string(),
                    component,
                }),
            }
        };

        let cell = required(Some(cell), "cell")?;
        let (cluster, node, server) = match kind {
            ScopeKind::Cell => (None, None, None),
            ScopeKind::Cluster => (Some(required(cluster, "cluster")?), None, None),
            ScopeKind::Node => (None, Some(required(node, "node")?), None),
            ScopeKind::Server => (
                None,
                Some(required(node, "node")?),
                Some(required(server, "server")?),
            ),
        };

        Ok(Self {
            kind,
            cell,
            cluster,
            node,
            server,
        })
    }

    /// Shorthand for a cell scope
    pub fn cell(cell: &str) -> Result<Self> {
        Self::derive(ScopeKind::Cell, cell, None, None, None)
    }

    /// Shorthand for a server scope
    pub fn server(cell: &str, node: &str, server: &str) -> Result<Self> {
        Self::derive(ScopeKind::Server, cell, None, Some(node), Some(server))
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn cell_name(&self) -> &str {
        &self.cell
    }

    pub fn cluster_name(&self) -> Option<&str> {
        self.cluster.as_deref()
    }

    pub fn node_name(&self) -> Option<&str> {
        self.node.as_deref()
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Address components from outermost to innermost
    pub fn segments(&self) -> Vec<(ScopeKind, &str)> {
        let mut segments = vec![(ScopeKind::Cell, self.cell.as_str())];
        if let Some(cluster) = &self.cluster {
            segments.push((ScopeKind::Cluster, cluster));
        }
        if let Some(node) = &self.node {
            segments.push((ScopeKind::Node, node));
        }
        if let Some(server) = &self.server {
            segments.push((ScopeKind::Server, server));
        }
        segments
    }

    /// Directory holding this scope's documents, relative to the config root
    pub fn config_dir(&self) -> PathBuf {
        let mut dir = PathBuf::from("cells").join(&self.cell);
        if let Some(cluster) = &self.cluster {
            dir = dir.join("clusters").join(cluster);
        }
        if let Some(node) = &self.node {
            dir = dir.join("nodes").join(node);
        }
        if let Some(server) = &self.server {
            dir = dir.join("servers").join(server);
        }
        dir
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .segments()
            .into_iter()
            .map(|(kind, name)| format!("{kind}={name}"))
            .collect();
        f.write_str(&parts.join(","))
    }
}
