// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Graph queries used by the parameter verbs.
//!
//! A [`GraphNode`] answers "which nodes are alive" and "which services exist",
//! hands out [`Transport`]s to service endpoints and signals graph changes.
//! The middleware backend implements it; [`crate::loopback`] provides an
//! in-process one.

use crate::rpc::{Service, ServiceClient, Transport};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

/// Graph errors
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Invalid graph fixture: {0}")]
    Fixture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid node name: '{0}'")]
    InvalidName(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),
}

/// Namespace + local name of a node.
///
/// Equality and hashing use the fully-qualified name. Ordering is by local
/// name, then namespace, so `/z/a` sorts before `/b`.
#[derive(Debug, Clone)]
pub struct NodeName {
    namespace: String,
    name: String,
    full_name: String,
}

impl NodeName {
    /// Build from a namespace (`""`, `"/"` or `"/a/b"`) and a local name.
    pub fn new(namespace: &str, name: &str) -> Self {
        let trimmed = namespace.trim_matches('/');
        let namespace = format!("/{}", trimmed);
        let full_name = if trimmed.is_empty() {
            format!("/{}", name)
        } else {
            format!("{}/{}", namespace, name)
        };
        Self {
            namespace,
            name: name.to_string(),
            full_name,
        }
    }

    /// Parse a fully-qualified name such as `/robot/arm/driver`.
    pub fn parse(full_name: &str) -> Result<Self, GraphError> {
        let invalid = || GraphError::InvalidName(full_name.to_string());
        if !full_name.starts_with('/') || full_name.ends_with('/') {
            return Err(invalid());
        }
        let (namespace, name) = full_name.rsplit_once('/').ok_or_else(invalid)?;
        if name.is_empty() || namespace.contains("//") {
            return Err(invalid());
        }
        Ok(Self::new(namespace, name))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"/ns/name"`, or `"/name"` in the root namespace.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Whether the node is hidden (local name starts with `_`).
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('_')
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

impl PartialEq for NodeName {
    fn eq(&self, other: &Self) -> bool {
        self.full_name == other.full_name
    }
}

impl Eq for NodeName {}

impl Hash for NodeName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_name.hash(state);
    }
}

impl PartialOrd for NodeName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeName {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.name, &self.namespace).cmp(&(&other.name, &other.namespace))
    }
}

/// Prefix a relative node name with `/`. Empty or missing names give `None`.
pub fn absolute_node_name(node_name: Option<&str>) -> Option<String> {
    match node_name {
        None | Some("") => None,
        Some(name) if name.starts_with('/') => Some(name.to_string()),
        Some(name) => Some(format!("/{}", name)),
    }
}

/// Whether any token of a graph path starts with `_`.
pub fn is_hidden_name(path: &str) -> bool {
    path.split('/').any(|token| token.starts_with('_'))
}

/// A service visible on the graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServiceInfo {
    pub name: String,
    pub types: Vec<String>,
}

/// Read access to the graph, as seen by one participant.
pub trait GraphNode: Send + Sync {
    /// Nodes currently alive, hidden ones only when asked for.
    fn node_names(&self, include_hidden: bool) -> Vec<NodeName>;

    /// Services currently advertised, hidden ones only when asked for.
    fn service_names(&self, include_hidden: bool) -> Vec<ServiceInfo>;

    /// Open a connection to `service_name`.
    fn connect(&self, service_name: &str) -> Result<Arc<dyn Transport>, GraphError>;

    /// Notified on every graph change (node added, server matched, ...).
    fn graph_events(&self) -> Arc<Notify>;
}

/// Create a typed client for `service_name` on `node`.
pub fn create_client<S, G>(node: &G, service_name: &str) -> Result<ServiceClient<S>, GraphError>
where
    S: Service,
    G: GraphNode + ?Sized,
{
    let transport = node.connect(service_name)?;
    Ok(ServiceClient::new(service_name, transport))
}

/// Process graph events for at most `timeout`.
///
/// Returns `true` when woken by a graph change, `false` on timeout.
pub async fn spin_once<G: GraphNode + ?Sized>(node: &G, timeout: Duration) -> bool {
    let events = node.graph_events();
    tokio::time::timeout(timeout, events.notified()).await.is_ok()
}
