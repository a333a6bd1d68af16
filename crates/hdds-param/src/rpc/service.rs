// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service definitions: request/response pairing and endpoint naming.

use crate::graph::NodeName;
use crate::rpc::types::{
    DescribeParametersRequest, DescribeParametersResponse, ListParametersRequest,
    ListParametersResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// A request/response service exposed by every node under
/// `<node full name>/<ENDPOINT>`.
pub trait Service: 'static {
    type Request: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + 'static;
    type Response: Serialize + DeserializeOwned + fmt::Debug + Send + 'static;

    /// Operation name appended to the node name.
    const ENDPOINT: &'static str;

    /// Interface type name advertised in discovery.
    const TYPE_NAME: &'static str;

    /// Fully-qualified service name for `node`.
    fn service_name(node: &NodeName) -> String {
        format!("{}/{}", node.full_name(), Self::ENDPOINT)
    }
}

/// `rcl_interfaces/srv/ListParameters`
#[derive(Debug, Clone, Copy)]
pub struct ListParameters;

impl Service for ListParameters {
    type Request = ListParametersRequest;
    type Response = ListParametersResponse;

    const ENDPOINT: &'static str = "list_parameters";
    const TYPE_NAME: &'static str = "rcl_interfaces/srv/ListParameters";
}

/// `rcl_interfaces/srv/DescribeParameters`
#[derive(Debug, Clone, Copy)]
pub struct DescribeParameters;

impl Service for DescribeParameters {
    type Request = DescribeParametersRequest;
    type Response = DescribeParametersResponse;

    const ENDPOINT: &'static str = "describe_parameters";
    const TYPE_NAME: &'static str = "rcl_interfaces/srv/DescribeParameters";
}
