// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process graph serving the parameter services.
//!
//! Nodes are registered programmatically ([`LoopbackNode`]) or loaded from a
//! TOML fixture:
//!
//! ```toml
//! [[nodes]]
//! name = "/robot/arm/driver"
//! ready_after_ms = 200
//!
//! [nodes.parameters]
//! use_sim_time = "bool"
//! "gains.kp" = { type = "double", description = "Proportional gain" }
//! ```

use crate::graph::{is_hidden_name, GraphError, GraphNode, NodeName, ServiceInfo};
use crate::rpc::{
    self, DescribeParameters, DescribeParametersRequest, DescribeParametersResponse,
    ListParameters, ListParametersRequest, ListParametersResponse, ListParametersResult,
    ParameterDescriptor, ParameterType, RemoteExceptionCode, ReplyFrame, ReplySender,
    RequestFrame, RpcError, RpcResult, Service, Transport, DEPTH_RECURSIVE,
};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Parameter services every node advertises, with their interface types.
const PARAMETER_SERVICES: &[(&str, &str)] = &[
    (DescribeParameters::ENDPOINT, DescribeParameters::TYPE_NAME),
    (
        "get_parameter_types",
        "rcl_interfaces/srv/GetParameterTypes",
    ),
    ("get_parameters", "rcl_interfaces/srv/GetParameters"),
    (ListParameters::ENDPOINT, ListParameters::TYPE_NAME),
    ("set_parameters", "rcl_interfaces/srv/SetParameters"),
    (
        "set_parameters_atomically",
        "rcl_interfaces/srv/SetParametersAtomically",
    ),
];

/// How a loopback node reacts to requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeBehavior {
    /// Delay after registration before the services match; `None` never does.
    pub ready_after: Option<Duration>,
    /// Delay before a reply is delivered.
    pub reply_delay: Duration,
    /// Answer every request with a remote exception carrying this message.
    pub failure: Option<String>,
    /// Accept requests but never reply.
    pub silent: bool,
    /// Whether the parameter services are advertised at all.
    pub services: bool,
}

impl Default for NodeBehavior {
    fn default() -> Self {
        Self {
            ready_after: Some(Duration::ZERO),
            reply_delay: Duration::ZERO,
            failure: None,
            silent: false,
            services: true,
        }
    }
}

/// Builder for a node registered on a [`LoopbackGraph`].
#[derive(Debug, Clone)]
pub struct LoopbackNode {
    name: NodeName,
    parameters: BTreeMap<String, ParameterDescriptor>,
    behavior: NodeBehavior,
}

impl LoopbackNode {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            name: NodeName::new(namespace, name),
            parameters: BTreeMap::new(),
            behavior: NodeBehavior::default(),
        }
    }

    /// Build from a fully-qualified name.
    pub fn named(full_name: &str) -> Result<Self, GraphError> {
        let name = NodeName::parse(full_name)?;
        Ok(Self::new(name.namespace(), name.name()))
    }

    pub fn parameter(self, name: &str, kind: ParameterType) -> Self {
        self.descriptor(ParameterDescriptor {
            name: name.to_string(),
            kind,
            ..Default::default()
        })
    }

    pub fn descriptor(mut self, descriptor: ParameterDescriptor) -> Self {
        self.parameters.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn ready_after(mut self, delay: Duration) -> Self {
        self.behavior.ready_after = Some(delay);
        self
    }

    pub fn never_ready(mut self) -> Self {
        self.behavior.ready_after = None;
        self
    }

    pub fn reply_delay(mut self, delay: Duration) -> Self {
        self.behavior.reply_delay = delay;
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.behavior.failure = Some(message.into());
        self
    }

    pub fn silent(mut self) -> Self {
        self.behavior.silent = true;
        self
    }

    pub fn without_services(mut self) -> Self {
        self.behavior.services = false;
        self
    }
}

struct NodeState {
    parameters: BTreeMap<String, ParameterDescriptor>,
    behavior: NodeBehavior,
    registered_at: Instant,
}

impl NodeState {
    fn is_ready(&self) -> bool {
        self.behavior.services
            && self
                .behavior
                .ready_after
                .is_some_and(|delay| self.registered_at.elapsed() >= delay)
    }
}

#[derive(Default)]
struct GraphState {
    nodes: BTreeMap<NodeName, NodeState>,
}

/// Request held by a silent node.
struct Parked {
    endpoint: String,
    request: RequestFrame,
    reply: ReplySender,
}

struct Shared {
    state: RwLock<GraphState>,
    events: Arc<Notify>,
    parked: Mutex<BTreeMap<NodeName, Vec<Parked>>>,
    requests: AtomicU64,
}

impl Shared {
    fn changed(&self) {
        self.events.notify_waiters();
    }
}

/// Graph living entirely inside the process.
#[derive(Clone)]
pub struct LoopbackGraph {
    shared: Arc<Shared>,
}

impl Default for LoopbackGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackGraph {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(GraphState::default()),
                events: Arc::new(Notify::new()),
                parked: Mutex::new(BTreeMap::new()),
                requests: AtomicU64::new(0),
            }),
        }
    }

    /// Load the nodes of `domain_id` from a TOML fixture string.
    pub fn from_fixture(content: &str, domain_id: u32) -> Result<Self, GraphError> {
        let fixture: Fixture = toml::from_str(content)?;
        let graph = Self::new();
        let mut loaded = 0usize;
        for entry in fixture.nodes {
            if entry.domain.is_some_and(|domain| domain != domain_id) {
                continue;
            }
            graph.add_node(entry.into_node()?);
            loaded += 1;
        }
        tracing::debug!("Loaded {} loopback node(s) for domain {}", loaded, domain_id);
        Ok(graph)
    }

    /// Load the nodes of `domain_id` from a TOML fixture file.
    pub fn from_fixture_file<P: AsRef<Path>>(path: P, domain_id: u32) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_fixture(&content, domain_id)
    }

    /// Register (or replace) a node.
    ///
    /// Requests held by a silent node it replaces are answered by the new
    /// node, unless it is silent as well.
    pub fn add_node(&self, node: LoopbackNode) {
        let mut state = self.shared.state.write();
        let name = node.name;
        let node = NodeState {
            parameters: node.parameters,
            behavior: node.behavior,
            registered_at: Instant::now(),
        };

        let mut parked = self.shared.parked.lock();
        if let Some(held) = parked.remove(&name) {
            let open = held.into_iter().filter(|p| !p.reply.is_closed());
            if node.behavior.silent {
                parked.insert(name.clone(), open.collect());
            } else {
                for p in open {
                    let frame = serve(&node, &p.endpoint, &p.request);
                    deliver(p.reply, frame, node.behavior.reply_delay);
                }
            }
        }
        drop(parked);

        state.nodes.insert(name, node);
        self.shared.changed();
    }

    /// Remove a node, dropping the requests it held. Returns false when it
    /// was not registered.
    pub fn remove_node(&self, name: &NodeName) -> bool {
        let mut state = self.shared.state.write();
        if state.nodes.remove(name).is_none() {
            return false;
        }
        self.shared.parked.lock().remove(name);
        self.shared.changed();
        true
    }

    /// Match or unmatch a node's services right away.
    pub fn set_ready(&self, name: &NodeName, ready: bool) -> bool {
        let mut state = self.shared.state.write();
        let Some(node) = state.nodes.get_mut(name) else {
            return false;
        };
        node.behavior.ready_after = ready.then_some(Duration::ZERO);
        self.shared.changed();
        true
    }

    /// Number of requests received by all nodes.
    pub fn requests_served(&self) -> u64 {
        self.shared.requests.load(Ordering::Relaxed)
    }

    /// Requests held by `name` whose client is still waiting.
    #[cfg(test)]
    pub(crate) fn pending_replies(&self, name: &NodeName) -> usize {
        self.shared
            .parked
            .lock()
            .get(name)
            .map_or(0, |held| held.iter().filter(|p| !p.reply.is_closed()).count())
    }
}

impl GraphNode for LoopbackGraph {
    fn node_names(&self, include_hidden: bool) -> Vec<NodeName> {
        self.shared
            .state
            .read()
            .nodes
            .keys()
            .filter(|name| include_hidden || !name.is_hidden())
            .cloned()
            .collect()
    }

    fn service_names(&self, include_hidden: bool) -> Vec<ServiceInfo> {
        let state = self.shared.state.read();
        let mut services: Vec<ServiceInfo> = state
            .nodes
            .iter()
            .filter(|(_, node)| node.behavior.services)
            .flat_map(|(name, _)| {
                PARAMETER_SERVICES
                    .iter()
                    .map(move |(endpoint, type_name)| ServiceInfo {
                        name: format!("{}/{}", name.full_name(), endpoint),
                        types: vec![type_name.to_string()],
                    })
            })
            .filter(|service| include_hidden || !is_hidden_name(&service.name))
            .collect();
        services.sort();
        services
    }

    fn connect(&self, service_name: &str) -> Result<Arc<dyn Transport>, GraphError> {
        let (node, endpoint) = service_name
            .rsplit_once('/')
            .ok_or_else(|| GraphError::InvalidName(service_name.to_string()))?;
        let node = NodeName::parse(node)?;
        if !PARAMETER_SERVICES.iter().any(|(known, _)| *known == endpoint) {
            return Err(GraphError::ServiceNotFound(service_name.to_string()));
        }
        Ok(Arc::new(LoopbackTransport {
            shared: Arc::clone(&self.shared),
            node,
            endpoint: endpoint.to_string(),
        }))
    }

    fn graph_events(&self) -> Arc<Notify> {
        Arc::clone(&self.shared.events)
    }
}

struct LoopbackTransport {
    shared: Arc<Shared>,
    node: NodeName,
    endpoint: String,
}

impl Transport for LoopbackTransport {
    fn is_ready(&self) -> bool {
        self.shared
            .state
            .read()
            .nodes
            .get(&self.node)
            .is_some_and(NodeState::is_ready)
    }

    fn send(&self, request: RequestFrame, reply: ReplySender) -> RpcResult<()> {
        self.shared.requests.fetch_add(1, Ordering::Relaxed);

        let (frame, delay) = {
            let state = self.shared.state.read();
            let node = state
                .nodes
                .get(&self.node)
                .filter(|node| node.is_ready())
                .ok_or_else(|| {
                    RpcError::SendFailed(format!(
                        "no server matched for {}/{}",
                        self.node, self.endpoint
                    ))
                })?;

            if node.behavior.silent {
                let mut parked = self.shared.parked.lock();
                let held = parked.entry(self.node.clone()).or_default();
                held.retain(|p| !p.reply.is_closed());
                held.push(Parked {
                    endpoint: self.endpoint.clone(),
                    request,
                    reply,
                });
                return Ok(());
            }
            (serve(node, &self.endpoint, &request), node.behavior.reply_delay)
        };

        deliver(reply, frame, delay);
        Ok(())
    }
}

fn serve(node: &NodeState, endpoint: &str, request: &RequestFrame) -> ReplyFrame {
    let id = request.header.request_id;
    if let Some(message) = &node.behavior.failure {
        return ReplyFrame::exception(id, RemoteExceptionCode::InternalError, message.clone());
    }

    let payload = if endpoint == ListParameters::ENDPOINT {
        rpc::decode(&request.payload)
            .and_then(|req| rpc::encode(&list_parameters(&node.parameters, &req)))
    } else if endpoint == DescribeParameters::ENDPOINT {
        rpc::decode(&request.payload)
            .and_then(|req| rpc::encode(&describe_parameters(&node.parameters, &req)))
    } else {
        return ReplyFrame::exception(
            id,
            RemoteExceptionCode::UnsupportedMethod,
            format!("{} is not served by the loopback graph", endpoint),
        );
    };

    match payload {
        Ok(payload) => ReplyFrame::success(id, payload),
        Err(e) => ReplyFrame::exception(id, RemoteExceptionCode::InvalidArgument, e.to_string()),
    }
}

fn deliver(reply: ReplySender, frame: ReplyFrame, delay: Duration) {
    if delay.is_zero() {
        let _ = reply.send(frame);
        return;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = reply.send(frame);
            });
        }
        Err(_) => {
            let _ = reply.send(frame);
        }
    }
}

fn depth_allows(relative: &str, depth: u64) -> bool {
    depth == DEPTH_RECURSIVE || (relative.matches('.').count() as u64) < depth
}

/// `rcl_interfaces/srv/ListParameters` over a node's parameter table.
fn list_parameters(
    parameters: &BTreeMap<String, ParameterDescriptor>,
    request: &ListParametersRequest,
) -> ListParametersResponse {
    let mut result = ListParametersResult::default();

    for name in parameters.keys() {
        let selected = if request.prefixes.is_empty() {
            depth_allows(name, request.depth)
        } else {
            request.prefixes.iter().any(|prefix| {
                name == prefix
                    || name
                        .strip_prefix(prefix.as_str())
                        .and_then(|rest| rest.strip_prefix('.'))
                        .is_some_and(|rest| depth_allows(rest, request.depth))
            })
        };
        if !selected {
            continue;
        }

        result.names.push(name.clone());
        if let Some((parent, _)) = name.rsplit_once('.') {
            if !result.prefixes.iter().any(|p| p == parent) {
                result.prefixes.push(parent.to_string());
            }
        }
    }

    ListParametersResponse { result }
}

/// `rcl_interfaces/srv/DescribeParameters`; unknown names are `not set`.
fn describe_parameters(
    parameters: &BTreeMap<String, ParameterDescriptor>,
    request: &DescribeParametersRequest,
) -> DescribeParametersResponse {
    let descriptors = request
        .names
        .iter()
        .map(|name| {
            parameters
                .get(name)
                .cloned()
                .unwrap_or_else(|| ParameterDescriptor {
                    name: name.clone(),
                    ..Default::default()
                })
        })
        .collect();
    DescribeParametersResponse { descriptors }
}

// ---------------------------------------------------------------------------
// Fixture format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Fixture {
    #[serde(default)]
    nodes: Vec<FixtureNode>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureNode {
    name: String,
    /// Domain the node lives in; absent means every domain.
    #[serde(default)]
    domain: Option<u32>,
    #[serde(default)]
    ready_after_ms: u64,
    #[serde(default)]
    never_ready: bool,
    #[serde(default)]
    reply_delay_ms: u64,
    #[serde(default)]
    failure: Option<String>,
    #[serde(default)]
    silent: bool,
    #[serde(default = "default_true")]
    services: bool,
    #[serde(default)]
    parameters: BTreeMap<String, FixtureParameter>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FixtureParameter {
    Type(String),
    Described {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        read_only: bool,
    },
}

impl FixtureNode {
    fn into_node(self) -> Result<LoopbackNode, GraphError> {
        let mut node = LoopbackNode::named(&self.name)?;
        node.behavior = NodeBehavior {
            ready_after: (!self.never_ready).then(|| Duration::from_millis(self.ready_after_ms)),
            reply_delay: Duration::from_millis(self.reply_delay_ms),
            failure: self.failure,
            silent: self.silent,
            services: self.services,
        };

        for (name, parameter) in self.parameters {
            let (kind, description, read_only) = match parameter {
                FixtureParameter::Type(kind) => (kind, String::new(), false),
                FixtureParameter::Described {
                    kind,
                    description,
                    read_only,
                } => (kind, description, read_only),
            };
            let kind = kind.parse::<ParameterType>().map_err(|e| {
                GraphError::Fixture(format!("node '{}', parameter '{}': {}", self.name, name, e))
            })?;
            node = node.descriptor(ParameterDescriptor {
                name,
                kind,
                description,
                read_only,
            });
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{create_client, spin_once};
    use crate::rpc::{CallOutcome, ServiceClient};

    fn table(names: &[&str]) -> BTreeMap<String, ParameterDescriptor> {
        names
            .iter()
            .map(|n| {
                (
                    n.to_string(),
                    ParameterDescriptor {
                        name: n.to_string(),
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    fn list(names: &[&str], prefixes: &[&str], depth: u64) -> ListParametersResult {
        let request = ListParametersRequest {
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            depth,
        };
        list_parameters(&table(names), &request).result
    }

    #[test]
    fn list_without_prefixes() {
        let names = ["a", "b.c", "b.d.e"];
        let all = list(&names, &[], DEPTH_RECURSIVE);
        assert_eq!(all.names, vec!["a", "b.c", "b.d.e"]);
        assert_eq!(all.prefixes, vec!["b", "b.d"]);

        assert_eq!(list(&names, &[], 1).names, vec!["a"]);
        assert_eq!(list(&names, &[], 2).names, vec!["a", "b.c"]);
    }

    #[test]
    fn list_with_prefixes() {
        let names = ["bar", "foo", "foo.x", "foo.y.z", "foobar"];
        let result = list(&names, &["foo"], DEPTH_RECURSIVE);
        assert_eq!(result.names, vec!["foo", "foo.x", "foo.y.z"]);
        assert_eq!(result.prefixes, vec!["foo", "foo.y"]);

        assert_eq!(list(&names, &["foo"], 1).names, vec!["foo", "foo.x"]);
        assert_eq!(
            list(&names, &["bar", "foobar"], DEPTH_RECURSIVE).names,
            vec!["bar", "foobar"]
        );
    }

    #[test]
    fn describe_unknown_is_not_set() {
        let mut parameters = table(&["gain"]);
        parameters.get_mut("gain").expect("gain").kind = ParameterType::Double;

        let request = DescribeParametersRequest {
            names: vec!["gain".into(), "missing".into()],
        };
        let response = describe_parameters(&parameters, &request);
        let kinds: Vec<_> = response.descriptors.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![ParameterType::Double, ParameterType::NotSet]);

        let empty = describe_parameters(&parameters, &DescribeParametersRequest::default());
        assert!(empty.descriptors.is_empty());
    }

    #[test]
    fn hidden_nodes_and_services() {
        let graph = LoopbackGraph::new();
        graph.add_node(LoopbackNode::new("/", "talker"));
        graph.add_node(LoopbackNode::new("/", "_daemon"));
        graph.add_node(LoopbackNode::new("/", "quiet").without_services());

        let visible: Vec<_> = graph
            .node_names(false)
            .iter()
            .map(|n| n.full_name().to_string())
            .collect();
        assert_eq!(visible, vec!["/quiet", "/talker"]);
        assert_eq!(graph.node_names(true).len(), 3);

        let services = graph.service_names(false);
        assert_eq!(services.len(), PARAMETER_SERVICES.len());
        assert!(services
            .iter()
            .any(|s| s.name == "/talker/list_parameters"
                && s.types == vec!["rcl_interfaces/srv/ListParameters"]));
        assert_eq!(graph.service_names(true).len(), 2 * PARAMETER_SERVICES.len());
    }

    #[test]
    fn connect_rejects_unknown_endpoints() {
        let graph = LoopbackGraph::new();
        assert!(matches!(
            graph.connect("/talker/get_type_description"),
            Err(GraphError::ServiceNotFound(_))
        ));
        assert!(matches!(
            graph.connect("talker"),
            Err(GraphError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn serves_list_and_rejects_unsupported() {
        let graph = LoopbackGraph::new();
        graph.add_node(
            LoopbackNode::new("/", "talker")
                .parameter("use_sim_time", ParameterType::Bool)
                .parameter("qos.depth", ParameterType::Integer),
        );

        let client: ServiceClient<ListParameters> =
            create_client(&graph, "/talker/list_parameters").expect("client");
        let reply = client
            .call(&ListParametersRequest::default(), Duration::from_secs(1))
            .await
            .expect("reply");
        assert_eq!(reply.result.names, vec!["qos.depth", "use_sim_time"]);
        assert_eq!(reply.result.prefixes, vec!["qos"]);

        // Same payload shape, wrong endpoint.
        let setter: ServiceClient<ListParameters> =
            create_client(&graph, "/talker/set_parameters").expect("client");
        let err = setter
            .call(&ListParametersRequest::default(), Duration::from_secs(1))
            .await
            .expect_err("unsupported");
        assert!(matches!(
            err,
            RpcError::RemoteException {
                code: RemoteExceptionCode::UnsupportedMethod,
                ..
            }
        ));
        assert_eq!(graph.requests_served(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_and_reply_delay() {
        let graph = LoopbackGraph::new();
        graph.add_node(
            LoopbackNode::new("/", "slow")
                .ready_after(Duration::from_millis(300))
                .reply_delay(Duration::from_millis(200)),
        );
        let client: ServiceClient<ListParameters> =
            create_client(&graph, "/slow/list_parameters").expect("client");

        assert!(!client.service_is_ready());
        assert!(client.wait_for_service(Duration::from_secs(1)).await);

        let mut call = client.call_async(&ListParametersRequest::default());
        assert!(matches!(
            call.wait(Duration::from_millis(100)).await,
            CallOutcome::TimedOut
        ));
        assert!(matches!(
            call.wait(Duration::from_millis(200)).await,
            CallOutcome::Completed(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn graph_changes_wake_spin_once() {
        let graph = LoopbackGraph::new();
        let name = NodeName::new("/", "late");
        graph.add_node(LoopbackNode::new("/", "late").never_ready());

        let waker = graph.clone();
        let target = name.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            waker.set_ready(&target, true);
        });

        assert!(spin_once(&graph, Duration::from_secs(1)).await);
        assert!(!spin_once(&graph, Duration::from_millis(10)).await);

        assert!(graph.remove_node(&name));
        assert!(!graph.remove_node(&name));
        assert!(!graph.set_ready(&name, true));
    }

    #[tokio::test]
    async fn failing_and_silent_nodes() {
        let graph = LoopbackGraph::new();
        graph.add_node(LoopbackNode::new("/", "broken").failing("parameter services crashed"));
        graph.add_node(LoopbackNode::new("/", "mute").silent());

        let broken: ServiceClient<ListParameters> =
            create_client(&graph, "/broken/list_parameters").expect("client");
        let err = broken
            .call(&ListParametersRequest::default(), Duration::from_secs(1))
            .await
            .expect_err("failure");
        assert!(err.to_string().contains("parameter services crashed"));

        let mute: ServiceClient<ListParameters> =
            create_client(&graph, "/mute/list_parameters").expect("client");
        let mut call = mute.call_async(&ListParametersRequest::default());
        assert!(matches!(
            call.wait(Duration::from_millis(20)).await,
            CallOutcome::TimedOut
        ));
    }

    #[tokio::test]
    async fn held_requests_released_with_node() {
        let graph = LoopbackGraph::new();
        let name = NodeName::new("/", "mute");
        graph.add_node(LoopbackNode::new("/", "mute").silent());
        let client: ServiceClient<ListParameters> =
            create_client(&graph, "/mute/list_parameters").expect("client");

        let abandoned = client.call_async(&ListParametersRequest::default());
        assert_eq!(graph.pending_replies(&name), 1);
        drop(abandoned);
        let mut answered = client.call_async(&ListParametersRequest::default());
        assert_eq!(graph.pending_replies(&name), 1);
        assert_eq!(graph.shared.parked.lock()[&name].len(), 1);

        graph.add_node(LoopbackNode::new("/", "mute").parameter("p", ParameterType::Bool));
        match answered.wait(Duration::from_secs(1)).await {
            CallOutcome::Completed(response) => assert_eq!(response.result.names, vec!["p"]),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(graph.pending_replies(&name), 0);

        graph.add_node(LoopbackNode::new("/", "mute").silent());
        let mut orphaned = client.call_async(&ListParametersRequest::default());
        assert!(graph.remove_node(&name));
        assert!(matches!(
            orphaned.wait(Duration::from_secs(1)).await,
            CallOutcome::Failed(RpcError::Internal(_))
        ));
        assert!(graph.shared.parked.lock().is_empty());
    }

    #[test]
    fn fixture_loading() {
        let fixture = r#"
            [[nodes]]
            name = "/robot/driver"
            reply_delay_ms = 20

            [nodes.parameters]
            use_sim_time = "bool"
            "gains.kp" = { type = "double", description = "P gain", read_only = true }

            [[nodes]]
            name = "/other_domain"
            domain = 7

            [[nodes]]
            name = "/stuck"
            never_ready = true
        "#;
        let graph = LoopbackGraph::from_fixture(fixture, 0).expect("fixture");
        let names: Vec<_> = graph
            .node_names(false)
            .iter()
            .map(|n| n.full_name().to_string())
            .collect();
        assert_eq!(names, vec!["/robot/driver", "/stuck"]);

        let state = graph.shared.state.read();
        let driver = &state.nodes[&NodeName::new("/robot", "driver")];
        assert_eq!(driver.behavior.reply_delay, Duration::from_millis(20));
        assert!(driver.parameters["gains.kp"].read_only);
        assert_eq!(driver.parameters["use_sim_time"].kind, ParameterType::Bool);
        assert_eq!(
            state.nodes[&NodeName::new("/", "stuck")].behavior.ready_after,
            None
        );
    }

    #[test]
    fn fixture_errors() {
        let bad_type = "[[nodes]]\nname = \"/a\"\n[nodes.parameters]\nx = \"quaternion\"\n";
        assert!(matches!(
            LoopbackGraph::from_fixture(bad_type, 0),
            Err(GraphError::Fixture(_))
        ));

        let bad_name = "[[nodes]]\nname = \"relative\"\n";
        assert!(matches!(
            LoopbackGraph::from_fixture(bad_name, 0),
            Err(GraphError::InvalidName(_))
        ));

        assert!(matches!(
            LoopbackGraph::from_fixture("[[nodes]]\nnmae = \"/a\"\n", 0),
            Err(GraphError::Toml(_))
        ));
    }

    #[test]
    fn fixture_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("graph.toml");
        std::fs::write(&path, "[[nodes]]\nname = \"/talker\"\n").expect("write");

        let graph = LoopbackGraph::from_fixture_file(&path, 0).expect("load");
        assert_eq!(graph.node_names(false).len(), 1);
        assert!(matches!(
            LoopbackGraph::from_fixture_file(dir.path().join("missing.toml"), 0),
            Err(GraphError::Io(_))
        ));
    }
}
