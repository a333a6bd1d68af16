// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request/Reply plumbing for the parameter services.
//!
//! - [`ServiceClient`] - sends requests and tracks pending replies
//! - [`Transport`] - backend connection to one remote endpoint
//! - [`Service`] - request/response pairing of a parameter service
//!
//! # Example
//!
//! ```ignore
//! let client: ServiceClient<ListParameters> = graph::create_client(node, &name)?;
//! let reply = client.call(&ListParametersRequest::default(), timeout).await?;
//! ```

mod client;
mod error;
mod service;
mod types;

pub use client::{CallOutcome, PendingCall, ReplySender, ServiceClient, Transport};
pub use error::{RpcError, RpcResult};
pub use service::{DescribeParameters, ListParameters, Service};
pub use types::{
    decode, encode, DescribeParametersRequest, DescribeParametersResponse,
    ListParametersRequest, ListParametersResponse, ListParametersResult, ParameterDescriptor,
    ParameterType, RemoteExceptionCode, ReplyFrame, ReplyHeader, RequestFrame, RequestHeader,
    SampleIdentity, DEPTH_RECURSIVE,
};
