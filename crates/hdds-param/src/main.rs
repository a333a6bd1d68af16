// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Parameter CLI
//!
//! # Usage
//!
//! ```bash
//! # Parameters of every node
//! hdds-param --graph graph.toml list
//!
//! # One node, names starting with "qos", with types
//! hdds-param --graph graph.toml list talker --filter qos --param-type
//!
//! # Only parameters under a prefix, hidden nodes included
//! hdds-param list --include-hidden-nodes --param-prefixes qos_overrides
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use hdds_param::{list_parameters, EnvConfig, ListArgs, ListConfig, LoopbackGraph, ParamError};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// HDDS parameter tools
#[derive(Parser, Debug)]
#[command(name = "hdds-param")]
#[command(about = "HDDS parameter tools - inspect parameters of running nodes")]
#[command(version)]
struct Args {
    /// Loopback graph fixture (default: $HDDS_PARAM_GRAPH)
    #[arg(long, global = true)]
    graph: Option<PathBuf>,

    /// Collector configuration file (default: $HDDS_PARAM_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Domain ID (default: $HDDS_DOMAIN_ID, then $ROS_DOMAIN_ID)
    #[arg(short, long, global = true)]
    domain_id: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Output a list of available parameters
    List {
        /// Name of the ROS node
        node_name: Option<String>,

        /// Only list parameters whose name matches this regular expression
        #[arg(long)]
        filter: Option<String>,

        /// Consider hidden nodes as well
        #[arg(long)]
        include_hidden_nodes: bool,

        /// Only list parameters with the provided prefixes
        #[arg(long, num_args = 1..)]
        param_prefixes: Vec<String>,

        /// Print parameter types with parameter names
        #[arg(long)]
        param_type: bool,

        /// Per-call reply timeout (seconds)
        #[arg(long)]
        call_timeout: Option<f64>,

        /// Give up on services not ready after this long (seconds)
        #[arg(long)]
        dispatch_deadline: Option<f64>,
    },
}

fn main() {
    let args = Args::parse();
    let env = EnvConfig::from_env();

    if let Err(e) = run(args, env) {
        match e {
            ParamError::NodeNotFound(_) => eprintln!("{}", e),
            _ => eprintln!("{} {}", "Error:".red().bold(), e),
        }
        std::process::exit(1);
    }
}

fn run(args: Args, env: EnvConfig) -> Result<(), ParamError> {
    let mut config = match args.config.as_ref().or(env.config_file.as_ref()) {
        Some(path) => ListConfig::from_file(path)?,
        None => ListConfig::default(),
    };

    init_logging(
        args.log_level
            .as_deref()
            .or(config.log_level.as_deref())
            .or(env.log_level.as_deref()),
    );

    let domain_id = args.domain_id.unwrap_or(env.domain_id);
    let graph_file = args
        .graph
        .or(env.graph_file)
        .ok_or(ParamError::NoGraphSource)?;
    let graph = LoopbackGraph::from_fixture_file(&graph_file, domain_id)?;
    tracing::debug!("Graph {} loaded (domain {})", graph_file.display(), domain_id);

    match args.command {
        Commands::List {
            node_name,
            filter,
            include_hidden_nodes,
            param_prefixes,
            param_type,
            call_timeout,
            dispatch_deadline,
        } => {
            if let Some(secs) = call_timeout {
                config.call_timeout_ms = secs_to_ms(secs);
            }
            if let Some(secs) = dispatch_deadline {
                config.dispatch_deadline_ms = Some(secs_to_ms(secs));
            }
            config.validate()?;

            let list_args = ListArgs {
                node_name,
                filter,
                include_hidden_nodes,
                param_prefixes,
                param_type,
            };

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?;
            let stdout = std::io::stdout();
            let stderr = std::io::stderr();
            let summary = runtime.block_on(list_parameters(
                &graph,
                &list_args,
                &config,
                &mut stdout.lock(),
                &mut stderr.lock(),
            ))?;
            tracing::info!(
                "{} parameter(s) from {} node(s), {} failure(s)",
                summary.parameters,
                summary.nodes,
                summary.failures
            );
        }
    }

    Ok(())
}

fn init_logging(level: Option<&str>) {
    let filter = level
        .and_then(|l| EnvFilter::try_new(l).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn secs_to_ms(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    }
}
