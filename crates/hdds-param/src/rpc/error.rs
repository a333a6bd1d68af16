// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for parameter service calls.

use crate::rpc::RemoteExceptionCode;
use thiserror::Error;

pub type RpcResult<T> = Result<T, RpcError>;

/// Why a service call produced no response.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The transport refused the request (typically no matched server).
    #[error("RPC send failed: {0}")]
    SendFailed(String),

    #[error("RPC request timed out")]
    Timeout,

    /// The server answered with an exception code instead of a payload.
    #[error("Remote exception: {code:?}{}", message_suffix(.message))]
    RemoteException {
        code: RemoteExceptionCode,
        message: Option<String>,
    },

    #[error("RPC serialization error: {0}")]
    SerializationError(String),

    /// The reply payload does not decode as the expected response.
    #[error("RPC deserialization error: {0}")]
    DeserializationError(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Internal RPC error: {0}")]
    Internal(String),
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" - {}", m))
        .unwrap_or_default()
}

impl RpcError {
    pub fn remote(code: RemoteExceptionCode) -> Self {
        Self::RemoteException {
            code,
            message: None,
        }
    }

    pub fn remote_with_message(code: RemoteExceptionCode, message: impl Into<String>) -> Self {
        Self::RemoteException {
            code,
            message: Some(message.into()),
        }
    }

    /// Error for a reply header carrying `code` and no message.
    pub fn from_code(code: RemoteExceptionCode) -> Self {
        match code {
            RemoteExceptionCode::Ok => Self::Internal("from_code called with Ok".to_string()),
            RemoteExceptionCode::Timeout => Self::Timeout,
            _ => Self::remote(code),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        Self::DeserializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert!(RpcError::Timeout.to_string().contains("timed out"));
        assert!(RpcError::ServiceNotFound("/a/list_parameters".into())
            .to_string()
            .contains("/a/list_parameters"));
        assert_eq!(
            RpcError::remote(RemoteExceptionCode::InvalidArgument).to_string(),
            "Remote exception: InvalidArgument"
        );
        assert_eq!(
            RpcError::remote_with_message(RemoteExceptionCode::InternalError, "boom").to_string(),
            "Remote exception: InternalError - boom"
        );
    }

    #[test]
    fn from_code() {
        assert!(matches!(
            RpcError::from_code(RemoteExceptionCode::Timeout),
            RpcError::Timeout
        ));
        assert!(matches!(
            RpcError::from_code(RemoteExceptionCode::UnsupportedMethod),
            RpcError::RemoteException {
                code: RemoteExceptionCode::UnsupportedMethod,
                message: None,
            }
        ));
    }
}
