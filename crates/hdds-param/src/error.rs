// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::config::ConfigError;
use crate::graph::GraphError;
use thiserror::Error;

/// Errors that abort a verb.
///
/// Per-node call failures are not errors at this level; they are reported
/// alongside the successful results.
#[derive(Debug, Error)]
pub enum ParamError {
    /// The requested node is not on the graph.
    #[error("Node not found")]
    NodeNotFound(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] regex::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No graph source: pass --graph or set HDDS_PARAM_GRAPH")]
    NoGraphSource,
}

pub type Result<T> = std::result::Result<T, ParamError>;
