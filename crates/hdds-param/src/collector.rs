// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Batched service calls: one client per node, dispatch once ready, collect
//! with a per-call timeout.
//!
//! ```text
//! Discovered -> ClientCreated -> (WaitingReady)* -> Dispatched
//!     -> Completed ok | Completed error | TimedOut
//! ```
//!
//! A node's failure never aborts the batch; it becomes a [`CallFailure`] in
//! the [`BatchResults`] map, which is keyed (and therefore ordered) by
//! [`NodeName`].

use crate::graph::{create_client, spin_once, GraphError, GraphNode, NodeName, ServiceInfo};
use crate::helpers::{before_invocation_with_call, Invocation};
use crate::rpc::{CallOutcome, PendingCall, RpcError, Service, ServiceClient};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What to do with a call that produced no reply within `call_timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Give up; a late reply is ignored.
    #[default]
    Abandon,
    /// Wait once more for `grace_ms`.
    Extend { grace_ms: u64 },
    /// Re-send the request up to `attempts` times.
    Retry { attempts: u32 },
}

/// Collector tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Longest wait for graph events between dispatch rounds.
    pub poll_timeout: Duration,
    /// Wait for each reply.
    pub call_timeout: Duration,
    /// Give up on clients that are still not ready; `None` waits forever.
    pub dispatch_deadline: Option<Duration>,
    /// First readiness re-check delay, doubled up to `poll_timeout`.
    pub readiness_backoff: Duration,
    pub on_timeout: TimeoutPolicy,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(1),
            call_timeout: Duration::from_secs(1),
            dispatch_deadline: None,
            readiness_backoff: Duration::from_millis(50),
            on_timeout: TimeoutPolicy::Abandon,
        }
    }
}

/// Why a node produced no result.
#[derive(Debug, Error)]
pub enum CallFailure {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("no reply within {0:?}")]
    NoReply(Duration),

    #[error("service never became ready")]
    NeverReady,
}

/// Per-node outcome of a batch.
pub type BatchResults<T> = BTreeMap<NodeName, Result<T, CallFailure>>;

/// One client per node exposing the service `S`.
pub struct ClientPool<S: Service> {
    clients: BTreeMap<NodeName, ServiceClient<S>>,
}

impl<S: Service> ClientPool<S> {
    /// Create a client for every candidate whose endpoint appears in
    /// `services`. Candidates without it are skipped.
    pub fn discover<G: GraphNode + ?Sized>(
        node: &G,
        candidates: &[NodeName],
        services: &[ServiceInfo],
    ) -> Result<Self, GraphError> {
        let mut clients = BTreeMap::new();
        for candidate in candidates {
            let service_name = S::service_name(candidate);
            if !services.iter().any(|service| service.name == service_name) {
                debug!("{} does not expose {}", candidate, S::ENDPOINT);
                continue;
            }
            clients.insert(candidate.clone(), create_client(node, &service_name)?);
        }
        Ok(Self { clients })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeName> {
        self.clients.keys()
    }

    pub fn client(&self, node: &NodeName) -> Option<&ServiceClient<S>> {
        self.clients.get(node)
    }
}

struct InFlight<S: Service> {
    request: S::Request,
    call: PendingCall<S::Response>,
}

/// Calls dispatched by [`Collector::dispatch`].
pub struct Dispatched<S: Service> {
    calls: BTreeMap<NodeName, InFlight<S>>,
    stalled: Vec<NodeName>,
}

impl<S: Service> Dispatched<S> {
    pub fn dispatched(&self) -> usize {
        self.calls.len()
    }

    /// Nodes whose service never became ready before the deadline.
    pub fn stalled(&self) -> &[NodeName] {
        &self.stalled
    }
}

/// Readiness re-check schedule of one client.
struct Gate {
    next_check: Instant,
    delay: Duration,
}

impl Gate {
    fn open(now: Instant, backoff: Duration) -> Self {
        Self {
            next_check: now,
            delay: backoff,
        }
    }

    fn back_off(&mut self, now: Instant, cap: Duration) {
        self.next_check = now + self.delay;
        self.delay = (self.delay * 2).min(cap);
    }
}

/// Runs call batches against one graph participant.
pub struct Collector<'a, G: GraphNode + ?Sized> {
    node: &'a G,
    config: CollectorConfig,
}

impl<'a, G: GraphNode + ?Sized> Collector<'a, G> {
    pub fn new(node: &'a G, config: CollectorConfig) -> Self {
        Self { node, config }
    }

    /// Dispatch one request per client, each as soon as its service is ready.
    ///
    /// Without a `dispatch_deadline` this only returns once every client was
    /// dispatched.
    pub async fn dispatch<S, F>(&self, pool: &ClientPool<S>, mut build_request: F) -> Dispatched<S>
    where
        S: Service,
        F: FnMut(&NodeName) -> S::Request,
    {
        let start = Instant::now();
        let deadline = self.config.dispatch_deadline.map(|limit| start + limit);
        let backoff = self.config.readiness_backoff.min(self.config.poll_timeout);

        let call_async = before_invocation_with_call(
            "call_async",
            |(node, request): (NodeName, S::Request)| {
                pool.client(&node).map(|client| {
                    let call = client.call_async(&request);
                    (node, InFlight::<S> { request, call })
                })
            },
            |invocation: &Invocation| debug!("{} {}", S::ENDPOINT, invocation),
        );

        let mut gates: BTreeMap<&NodeName, Gate> = pool
            .nodes()
            .map(|node| (node, Gate::open(start, backoff)))
            .collect();
        let mut calls: BTreeMap<NodeName, InFlight<S>> = BTreeMap::new();

        loop {
            let now = Instant::now();
            for (node, gate) in gates.iter_mut() {
                if calls.contains_key(*node) || now < gate.next_check {
                    continue;
                }
                let ready = pool
                    .client(*node)
                    .is_some_and(|client| client.service_is_ready());
                if !ready {
                    gate.back_off(now, self.config.poll_timeout);
                    continue;
                }
                let request = build_request(*node);
                if let Some((node, in_flight)) = call_async(((*node).clone(), request)) {
                    calls.insert(node, in_flight);
                }
            }
            gates.retain(|node, _| !calls.contains_key(*node));
            if gates.is_empty() {
                break;
            }

            let now = Instant::now();
            let mut wait = gates
                .values()
                .map(|gate| gate.next_check.saturating_duration_since(now))
                .min()
                .unwrap_or(self.config.poll_timeout)
                .min(self.config.poll_timeout);
            if let Some(deadline) = deadline {
                if now >= deadline {
                    break;
                }
                wait = wait.min(deadline - now);
            }

            if spin_once(self.node, wait).await {
                let now = Instant::now();
                for gate in gates.values_mut() {
                    *gate = Gate::open(now, backoff);
                }
            }
        }

        let stalled: Vec<NodeName> = gates.into_keys().cloned().collect();
        for node in &stalled {
            warn!("{} not ready after {:?}, giving up", node, start.elapsed());
        }
        debug!(
            "Dispatched {}/{} {} call(s) in {:?}",
            calls.len(),
            pool.len(),
            S::ENDPOINT,
            start.elapsed()
        );

        Dispatched { calls, stalled }
    }

    /// Wait for every dispatched call, applying the timeout policy.
    pub async fn collect<S: Service>(
        &self,
        pool: &ClientPool<S>,
        dispatched: Dispatched<S>,
    ) -> BatchResults<S::Response> {
        let mut results = BTreeMap::new();

        for (node, in_flight) in dispatched.calls {
            let outcome = self.settle(pool, &node, in_flight).await;
            match &outcome {
                Ok(_) => debug!("{} replied", node),
                Err(e) => warn!("{}: {}", node, e),
            }
            results.insert(node, outcome);
        }
        for node in dispatched.stalled {
            results.insert(node, Err(CallFailure::NeverReady));
        }

        results
    }

    /// Dispatch then collect.
    pub async fn run<S, F>(&self, pool: &ClientPool<S>, build_request: F) -> BatchResults<S::Response>
    where
        S: Service,
        F: FnMut(&NodeName) -> S::Request,
    {
        let dispatched = self.dispatch(pool, build_request).await;
        let results = self.collect(pool, dispatched).await;

        let succeeded = results.values().filter(|r| r.is_ok()).count();
        info!(
            "{}: {}/{} node(s) replied",
            S::ENDPOINT,
            succeeded,
            results.len()
        );
        results
    }

    async fn settle<S: Service>(
        &self,
        pool: &ClientPool<S>,
        node: &NodeName,
        mut in_flight: InFlight<S>,
    ) -> Result<S::Response, CallFailure> {
        let call_timeout = self.config.call_timeout;
        let mut retries = match self.config.on_timeout {
            TimeoutPolicy::Retry { attempts } => attempts,
            _ => 0,
        };

        loop {
            match in_flight.call.wait(call_timeout).await {
                CallOutcome::Completed(reply) => return Ok(reply),
                CallOutcome::Failed(e) => return Err(e.into()),
                CallOutcome::TimedOut => {}
            }

            match self.config.on_timeout {
                TimeoutPolicy::Abandon => {
                    warn!("{} did not reply within {:?}, abandoning", node, call_timeout);
                    return Err(CallFailure::NoReply(call_timeout));
                }
                TimeoutPolicy::Extend { grace_ms } => {
                    let grace = Duration::from_millis(grace_ms);
                    return match in_flight.call.wait(grace).await {
                        CallOutcome::Completed(reply) => Ok(reply),
                        CallOutcome::Failed(e) => Err(e.into()),
                        CallOutcome::TimedOut => Err(CallFailure::NoReply(call_timeout + grace)),
                    };
                }
                TimeoutPolicy::Retry { attempts } => {
                    let Some(client) = pool.client(node).filter(|_| retries > 0) else {
                        return Err(CallFailure::NoReply(call_timeout));
                    };
                    retries -= 1;
                    debug!(
                        "{} did not reply, retry {}/{}",
                        node,
                        attempts - retries,
                        attempts
                    );
                    in_flight.call = client.call_async(&in_flight.request);
                }
            }
        }
    }
}
