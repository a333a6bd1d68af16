// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The `list` verb.

use crate::collector::{ClientPool, Collector};
use crate::config::ListConfig;
use crate::error::{ParamError, Result};
use crate::graph::{absolute_node_name, GraphNode};
use crate::report::{NameFilter, ReportOptions, ReportSummary, Reporter};
use crate::rpc::{ListParameters, ListParametersRequest, Service, DEPTH_RECURSIVE};
use std::io::Write;
use tracing::debug;

/// Arguments of `list`.
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    /// Only list this node (relative names get a leading `/`).
    pub node_name: Option<String>,
    /// Keep parameter names this regex matches from their first character.
    pub filter: Option<String>,
    pub include_hidden_nodes: bool,
    /// Only list parameters under these prefixes.
    pub param_prefixes: Vec<String>,
    /// Print each parameter's type.
    pub param_type: bool,
}

/// List the parameters of every node (or of `args.node_name`).
///
/// The report goes to `out`, per-node failures to `err`. An unknown target
/// node fails before any service is looked up or called.
pub async fn list_parameters<G, O, E>(
    node: &G,
    args: &ListArgs,
    config: &ListConfig,
    out: &mut O,
    err: &mut E,
) -> Result<ReportSummary>
where
    G: GraphNode + ?Sized,
    O: Write,
    E: Write,
{
    let mut node_names = node.node_names(args.include_hidden_nodes);

    let target = absolute_node_name(args.node_name.as_deref());
    if let Some(target) = &target {
        if !node_names.iter().any(|n| n.full_name() == target) {
            return Err(ParamError::NodeNotFound(target.clone()));
        }
        node_names.retain(|n| n.full_name() == target);
    }

    let filter = args.filter.as_deref().map(NameFilter::new).transpose()?;

    let service_names = node.service_names(args.include_hidden_nodes);
    let pool = ClientPool::<ListParameters>::discover(node, &node_names, &service_names)?;
    debug!(
        "{} of {} node(s) expose {}",
        pool.len(),
        node_names.len(),
        ListParameters::ENDPOINT
    );

    let results = Collector::new(node, config.collector_config())
        .run(&pool, |_| ListParametersRequest {
            prefixes: args.param_prefixes.clone(),
            depth: DEPTH_RECURSIVE,
        })
        .await;
    drop(pool);

    let options = ReportOptions {
        filter,
        show_headers: target.is_none(),
        show_types: args.param_type,
        describe_wait: config.describe_wait(),
        describe_timeout: config.describe_timeout(),
    };
    let summary = Reporter::new(node, options)
        .render(&results, out, err)
        .await?;
    Ok(summary)
}
