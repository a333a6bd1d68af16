// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire types for the parameter services.
//!
//! Request/reply correlation follows the DDS-RPC layout (request header with
//! a sample identity, reply header with the related identity and an exception
//! code). Payloads are JSON-encoded `rcl_interfaces` messages.

use crate::rpc::error::{RpcError, RpcResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of one request: which client sent it and its sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SampleIdentity {
    /// Identifier of the client that sent the request
    pub client_id: u64,
    /// Sequence number assigned by the client
    pub sequence_number: i64,
}

impl SampleIdentity {
    pub fn new(client_id: u64, sequence_number: i64) -> Self {
        Self {
            client_id,
            sequence_number,
        }
    }
}

/// Request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestHeader {
    pub request_id: SampleIdentity,
}

impl RequestHeader {
    pub fn new(request_id: SampleIdentity) -> Self {
        Self { request_id }
    }
}

/// Reply header; `related_request_id` echoes the request it answers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplyHeader {
    pub related_request_id: SampleIdentity,
    /// `Ok` unless the server raised an exception
    pub remote_exception_code: RemoteExceptionCode,
    /// Optional human-readable cause sent with an exception
    pub message: Option<String>,
}

impl ReplyHeader {
    pub fn success(related_request_id: SampleIdentity) -> Self {
        Self {
            related_request_id,
            remote_exception_code: RemoteExceptionCode::Ok,
            message: None,
        }
    }

    /// Header of a reply carrying an exception instead of a payload.
    pub fn error(
        related_request_id: SampleIdentity,
        code: RemoteExceptionCode,
        message: Option<String>,
    ) -> Self {
        Self {
            related_request_id,
            remote_exception_code: code,
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        self.remote_exception_code == RemoteExceptionCode::Ok
    }
}

/// Request frame handed to a transport.
#[derive(Debug, Clone)]
pub struct RequestFrame {
    pub header: RequestHeader,
    pub payload: Vec<u8>,
}

/// Reply frame sent back by a transport.
#[derive(Debug, Clone)]
pub struct ReplyFrame {
    pub header: ReplyHeader,
    pub payload: Vec<u8>,
}

impl ReplyFrame {
    /// Successful reply carrying `payload`.
    pub fn success(related_request_id: SampleIdentity, payload: Vec<u8>) -> Self {
        Self {
            header: ReplyHeader::success(related_request_id),
            payload,
        }
    }

    /// Exception reply without payload.
    pub fn exception(
        related_request_id: SampleIdentity,
        code: RemoteExceptionCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            header: ReplyHeader::error(related_request_id, code, Some(message.into())),
            payload: Vec::new(),
        }
    }
}

/// DDS-RPC remote exception codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RemoteExceptionCode {
    #[default]
    Ok,
    /// The endpoint exists but this operation is not served.
    UnsupportedMethod,
    /// The request payload could not be decoded.
    InvalidArgument,
    Timeout,
    /// The server failed while handling the request.
    InternalError,
}

/// `rcl_interfaces/msg/ParameterType` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum ParameterType {
    #[default]
    NotSet = 0,
    Bool = 1,
    Integer = 2,
    Double = 3,
    String = 4,
    ByteArray = 5,
    BoolArray = 6,
    IntegerArray = 7,
    DoubleArray = 8,
    StringArray = 9,
}

impl ParameterType {
    /// Label printed by `list --param-type`.
    pub fn label(self) -> &'static str {
        match self {
            Self::NotSet => "not set",
            Self::Bool => "boolean",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::String => "string",
            Self::ByteArray => "byte array",
            Self::BoolArray => "boolean array",
            Self::IntegerArray => "integer array",
            Self::DoubleArray => "double array",
            Self::StringArray => "string array",
        }
    }
}

impl From<ParameterType> for u8 {
    fn from(kind: ParameterType) -> Self {
        kind as u8
    }
}

impl TryFrom<u8> for ParameterType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Self::NotSet,
            1 => Self::Bool,
            2 => Self::Integer,
            3 => Self::Double,
            4 => Self::String,
            5 => Self::ByteArray,
            6 => Self::BoolArray,
            7 => Self::IntegerArray,
            8 => Self::DoubleArray,
            9 => Self::StringArray,
            other => return Err(format!("unknown parameter type code {}", other)),
        })
    }
}

impl FromStr for ParameterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "not set" | "none" => Ok(Self::NotSet),
            "bool" | "boolean" => Ok(Self::Bool),
            "int" | "integer" => Ok(Self::Integer),
            "double" | "float" => Ok(Self::Double),
            "str" | "string" => Ok(Self::String),
            "bytes" | "byte array" => Ok(Self::ByteArray),
            "bool array" | "boolean array" => Ok(Self::BoolArray),
            "int array" | "integer array" => Ok(Self::IntegerArray),
            "double array" | "float array" => Ok(Self::DoubleArray),
            "str array" | "string array" => Ok(Self::StringArray),
            _ => Err(format!("Unknown parameter type: {}", s)),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Recurse without limit when listing parameters.
pub const DEPTH_RECURSIVE: u64 = 0;

/// `rcl_interfaces/srv/ListParameters` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParametersRequest {
    /// Only list parameters equal to or nested under these prefixes.
    #[serde(default)]
    pub prefixes: Vec<String>,
    /// Maximum nesting depth below a prefix, [`DEPTH_RECURSIVE`] for all.
    #[serde(default)]
    pub depth: u64,
}

/// `rcl_interfaces/msg/ListParametersResult`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParametersResult {
    pub names: Vec<String>,
    pub prefixes: Vec<String>,
}

/// `rcl_interfaces/srv/ListParameters` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParametersResponse {
    pub result: ListParametersResult,
}

/// `rcl_interfaces/msg/ParameterDescriptor` (the fields the CLI uses).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub read_only: bool,
}

/// `rcl_interfaces/srv/DescribeParameters` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeParametersRequest {
    pub names: Vec<String>,
}

/// `rcl_interfaces/srv/DescribeParameters` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeParametersResponse {
    pub descriptors: Vec<ParameterDescriptor>,
}

/// Encode a message payload.
pub fn encode<T: Serialize>(message: &T) -> RpcResult<Vec<u8>> {
    serde_json::to_vec(message).map_err(|e| RpcError::SerializationError(e.to_string()))
}

/// Decode a message payload.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> RpcResult<T> {
    Ok(serde_json::from_slice(payload)?)
}
