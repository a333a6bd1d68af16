// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Parameter Tools
//!
//! Lists the parameters exposed by running nodes through their
//! `list_parameters` / `describe_parameters` services.
//!
//! # Features
//!
//! - **Fan-out calls**: one asynchronous request per node, dispatched as soon
//!   as its service is ready, collected with a per-call timeout
//! - **Sorted report**: sections in node-name order, regex name filtering,
//!   optional parameter types
//! - **Loopback graph**: in-process nodes loaded from a TOML fixture
//!
//! # Quick Start
//!
//! ```bash
//! # Every node of the fixture graph
//! hdds-param --graph graph.toml list
//!
//! # One node, with types, names starting with "qos"
//! hdds-param --graph graph.toml list /talker --filter qos --param-type
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! call_timeout_ms = 2000
//! dispatch_deadline_ms = 10000
//!
//! [on_timeout]
//! policy = "extend"
//! grace_ms = 1000
//! ```

pub mod collector;
pub mod config;
pub mod env_config;
pub mod error;
pub mod graph;
pub mod helpers;
pub mod loopback;
pub mod report;
pub mod rpc;
pub mod verb;

pub use collector::{BatchResults, CallFailure, ClientPool, Collector, CollectorConfig, TimeoutPolicy};
pub use config::{ConfigError, ListConfig};
pub use env_config::EnvConfig;
pub use error::ParamError;
pub use graph::{GraphError, GraphNode, NodeName, ServiceInfo};
pub use loopback::{LoopbackGraph, LoopbackNode};
pub use report::{NameFilter, ReportOptions, ReportSummary, Reporter};
pub use verb::{list_parameters, ListArgs};

/// Serializes tests that touch process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());
