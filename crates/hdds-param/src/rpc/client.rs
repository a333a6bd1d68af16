// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RPC Client (Requester) implementation.
//!
//! A [`ServiceClient`] encodes requests, hands them to the backend
//! [`Transport`] and returns a [`PendingCall`] that resolves when the reply
//! arrives.

use crate::helpers::{wait_for_async, Timeout};
use crate::rpc::error::{RpcError, RpcResult};
use crate::rpc::service::Service;
use crate::rpc::types::{self, ReplyFrame, RequestFrame, RequestHeader, SampleIdentity};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Channel half used by a transport to deliver a reply.
pub type ReplySender = oneshot::Sender<ReplyFrame>;

/// Connection to one remote service endpoint, provided by the graph backend.
pub trait Transport: Send + Sync {
    /// Whether a server is currently matched and able to take requests.
    fn is_ready(&self) -> bool;

    /// Deliver `request`; the reply (if any) is sent on `reply`.
    ///
    /// Dropping `reply` without sending reports the call as failed.
    fn send(&self, request: RequestFrame, reply: ReplySender) -> RpcResult<()>;
}

/// Poll period used while waiting for a service to appear.
const SERVICE_POLL_PERIOD: Duration = Duration::from_millis(100);

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// RPC client bound to one service endpoint.
pub struct ServiceClient<S: Service> {
    /// Service name
    service_name: String,

    /// Backend connection
    transport: Arc<dyn Transport>,

    /// Client id used in every SampleIdentity
    client_id: u64,

    /// Sequence number counter
    sequence: AtomicI64,

    _service: PhantomData<fn() -> S>,
}

impl<S: Service> ServiceClient<S> {
    /// Create a client for `service_name` over `transport`.
    pub fn new(service_name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            service_name: service_name.into(),
            transport,
            client_id: NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed),
            sequence: AtomicI64::new(1),
            _service: PhantomData,
        }
    }

    /// Get the service name
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Whether the remote service can take a request right now.
    pub fn service_is_ready(&self) -> bool {
        self.transport.is_ready()
    }

    /// Wait until the service is ready or `timeout` elapses.
    pub async fn wait_for_service(&self, timeout: impl Into<Timeout>) -> bool {
        wait_for_async(|| self.service_is_ready(), timeout, SERVICE_POLL_PERIOD).await
    }

    /// Send a request without waiting for the reply.
    ///
    /// Encoding and send errors do not surface here: the returned call is
    /// already failed and reports them from [`PendingCall::wait`].
    pub fn call_async(&self, request: &S::Request) -> PendingCall<S::Response> {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let request_id = SampleIdentity::new(self.client_id, seq);

        let payload = match types::encode(request) {
            Ok(payload) => payload,
            Err(e) => return PendingCall::failed(request_id, e),
        };

        let (tx, rx) = oneshot::channel();
        let frame = RequestFrame {
            header: RequestHeader::new(request_id),
            payload,
        };
        if let Err(e) = self.transport.send(frame, tx) {
            return PendingCall::failed(request_id, e);
        }

        PendingCall {
            request_id,
            state: CallState::Waiting(rx),
            _reply: PhantomData,
        }
    }

    /// Send a request and wait for its reply.
    pub async fn call(
        &self,
        request: &S::Request,
        timeout: impl Into<Timeout>,
    ) -> RpcResult<S::Response> {
        match self.call_async(request).wait(timeout).await {
            CallOutcome::Completed(reply) => Ok(reply),
            CallOutcome::Failed(e) => Err(e),
            CallOutcome::TimedOut => Err(RpcError::Timeout),
        }
    }
}

/// How a wait on a [`PendingCall`] ended.
#[derive(Debug)]
pub enum CallOutcome<T> {
    /// Reply received and decoded.
    Completed(T),
    /// The call failed (send error, remote exception, bad reply).
    Failed(RpcError),
    /// No reply yet; the call may still complete on a later wait.
    TimedOut,
}

enum CallState {
    Waiting(oneshot::Receiver<ReplyFrame>),
    Failed(RpcError),
    Finished,
}

/// An in-flight request.
pub struct PendingCall<T> {
    request_id: SampleIdentity,
    state: CallState,
    _reply: PhantomData<fn() -> T>,
}

impl<T: serde::de::DeserializeOwned> PendingCall<T> {
    fn failed(request_id: SampleIdentity, error: RpcError) -> Self {
        Self {
            request_id,
            state: CallState::Failed(error),
            _reply: PhantomData,
        }
    }

    /// Identity the request was sent with.
    pub fn request_id(&self) -> SampleIdentity {
        self.request_id
    }

    /// Whether the call can still produce an outcome.
    pub fn is_pending(&self) -> bool {
        !matches!(self.state, CallState::Finished)
    }

    /// Wait up to `timeout` for the reply.
    ///
    /// A [`CallOutcome::TimedOut`] call stays pending and can be waited on
    /// again; any other outcome finishes it. [`Timeout::Infinite`] waits
    /// until the reply arrives or the transport drops it.
    pub async fn wait(&mut self, timeout: impl Into<Timeout>) -> CallOutcome<T> {
        let rx = match &mut self.state {
            CallState::Waiting(rx) => rx,
            _ => {
                return match std::mem::replace(&mut self.state, CallState::Finished) {
                    CallState::Failed(e) => CallOutcome::Failed(e),
                    _ => CallOutcome::Failed(RpcError::Internal(
                        "call already completed".to_string(),
                    )),
                };
            }
        };
        let received = match timeout.into() {
            Timeout::Infinite => rx.await,
            Timeout::After(limit) => match tokio::time::timeout(limit, rx).await {
                Err(_) => return CallOutcome::TimedOut,
                Ok(received) => received,
            },
        };

        self.state = CallState::Finished;
        match received {
            Ok(frame) => decode_reply(frame),
            Err(_) => CallOutcome::Failed(RpcError::Internal("Reply channel closed".to_string())),
        }
    }
}

fn decode_reply<T: serde::de::DeserializeOwned>(frame: ReplyFrame) -> CallOutcome<T> {
    if !frame.header.is_success() {
        let code = frame.header.remote_exception_code;
        return CallOutcome::Failed(match frame.header.message {
            Some(message) => RpcError::remote_with_message(code, message),
            None => RpcError::from_code(code),
        });
    }
    match types::decode(&frame.payload) {
        Ok(reply) => CallOutcome::Completed(reply),
        Err(e) => CallOutcome::Failed(e),
    }
}
