// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Text report of a `list_parameters` batch.

use crate::collector::BatchResults;
use crate::graph::{create_client, GraphNode, NodeName};
use crate::helpers::Timeout;
use crate::rpc::{
    DescribeParameters, DescribeParametersRequest, ListParametersResponse, ListParametersResult,
    ParameterType, RpcError, Service, ServiceClient,
};
use regex::Regex;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, warn};

/// Parameter-name filter anchored at the start of the name.
#[derive(Debug, Clone)]
pub struct NameFilter {
    regex: Regex,
}

impl NameFilter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(r"\A(?:{})", pattern))?;
        Ok(Self { regex })
    }

    /// True when the pattern matches at position 0 (not necessarily the
    /// whole name).
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// Unique names of `result`, sorted, restricted to `filter` matches.
pub fn select_names(result: &ListParametersResult, filter: Option<&NameFilter>) -> Vec<String> {
    let mut names: Vec<String> = result
        .names
        .iter()
        .filter(|name| filter.map_or(true, |f| f.matches(name)))
        .cloned()
        .collect();
    names.sort();
    names.dedup();
    names
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub filter: Option<NameFilter>,
    /// Print a `<node>:` header above each non-empty section.
    pub show_headers: bool,
    /// Query and print each parameter's type.
    pub show_types: bool,
    /// How long to wait for `describe_parameters` to appear.
    pub describe_wait: Duration,
    /// Reply timeout of the describe call.
    pub describe_timeout: Timeout,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            filter: None,
            show_headers: true,
            show_types: false,
            describe_wait: Duration::from_secs(5),
            describe_timeout: Timeout::Infinite,
        }
    }
}

/// Counters of a rendered report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Nodes that contributed a section (possibly empty after filtering).
    pub nodes: usize,
    /// Parameter lines printed.
    pub parameters: usize,
    /// Nodes reported on the error stream.
    pub failures: usize,
}

pub struct Reporter<'a, G: GraphNode + ?Sized> {
    node: &'a G,
    options: ReportOptions,
}

impl<'a, G: GraphNode + ?Sized> Reporter<'a, G> {
    pub fn new(node: &'a G, options: ReportOptions) -> Self {
        Self { node, options }
    }

    /// Write the report in node-name order; failures go to `err`.
    pub async fn render<O, E>(
        &self,
        results: &BatchResults<ListParametersResponse>,
        out: &mut O,
        err: &mut E,
    ) -> io::Result<ReportSummary>
    where
        O: Write,
        E: Write,
    {
        let mut summary = ReportSummary::default();

        for (node, result) in results {
            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    summary.failures += 1;
                    write_failure(err, node, e)?;
                    continue;
                }
            };

            let names = select_names(&response.result, self.options.filter.as_ref());
            let types = if self.options.show_types && !names.is_empty() {
                match self.describe(node, &names).await {
                    Ok(types) => Some(types),
                    Err(e) => {
                        summary.failures += 1;
                        write_failure(err, node, &e)?;
                        continue;
                    }
                }
            } else {
                None
            };

            summary.nodes += 1;
            if self.options.show_headers && !names.is_empty() {
                writeln!(out, "{}:", node.full_name())?;
            }
            for name in &names {
                match &types {
                    Some(types) => {
                        let kind = types.get(name).copied().unwrap_or_default();
                        writeln!(out, "  {} (type: {})", name, kind)?;
                    }
                    None => writeln!(out, "  {}", name)?,
                }
            }
            summary.parameters += names.len();
        }

        Ok(summary)
    }

    async fn describe(
        &self,
        node: &NodeName,
        names: &[String],
    ) -> Result<BTreeMap<String, ParameterType>, RpcError> {
        let service_name = DescribeParameters::service_name(node);
        let client: ServiceClient<DescribeParameters> = create_client(self.node, &service_name)
            .map_err(|_| RpcError::ServiceNotFound(service_name.clone()))?;

        if !client.wait_for_service(self.options.describe_wait).await {
            warn!(
                "{} not available after {:?}",
                service_name, self.options.describe_wait
            );
            return Err(RpcError::ServiceNotFound(service_name));
        }

        let request = DescribeParametersRequest {
            names: names.to_vec(),
        };
        let response = client.call(&request, self.options.describe_timeout).await?;
        debug!("{} described {} parameter(s)", node, response.descriptors.len());

        Ok(response
            .descriptors
            .into_iter()
            .map(|descriptor| (descriptor.name, descriptor.kind))
            .collect())
    }
}

fn write_failure<E: Write>(err: &mut E, node: &NodeName, cause: &dyn std::fmt::Display) -> io::Result<()> {
    writeln!(
        err,
        "Exception while calling service of node '{}': {}",
        node.full_name(),
        cause
    )
}
