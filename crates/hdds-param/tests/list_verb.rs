// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! `list` verb integration tests
//!
//! Drives the verb end to end against a loopback graph and checks what ends
//! up on the output and error streams.

use hdds_param::rpc::ParameterType;
use hdds_param::{
    list_parameters, ListArgs, ListConfig, LoopbackGraph, LoopbackNode, ParamError,
    ReportSummary, TimeoutPolicy,
};
use std::io::Write;
use std::time::Duration;

struct Output {
    out: String,
    err: String,
    summary: ReportSummary,
}

async fn list(graph: &LoopbackGraph, args: ListArgs, config: ListConfig) -> Result<Output, ParamError> {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let summary = list_parameters(graph, &args, &config, &mut out, &mut err).await?;
    Ok(Output {
        out: String::from_utf8(out).expect("utf8"),
        err: String::from_utf8(err).expect("utf8"),
        summary,
    })
}

fn node(name: &str, params: &[&str]) -> LoopbackNode {
    params.iter().fold(LoopbackNode::new("/", name), |node, p| {
        node.parameter(p, ParameterType::Integer)
    })
}

#[tokio::test(start_paused = true)]
async fn test_nodes_reported_in_name_order() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("b", &["z"]));
    graph.add_node(node("a", &["y", "x"]));

    let output = list(&graph, ListArgs::default(), ListConfig::default())
        .await
        .expect("list");
    assert_eq!(output.out, "/a:\n  x\n  y\n/b:\n  z\n");
    assert!(output.err.is_empty());
    assert_eq!(output.summary.parameters, 3);
}

#[tokio::test(start_paused = true)]
async fn test_namespaced_nodes_sorted_by_local_name() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("b", &["p"]));
    graph.add_node(LoopbackNode::new("/z", "a").parameter("q", ParameterType::Integer));

    let output = list(&graph, ListArgs::default(), ListConfig::default())
        .await
        .expect("list");
    assert_eq!(output.out, "/z/a:\n  q\n/b:\n  p\n");
}

#[tokio::test(start_paused = true)]
async fn test_filter_matches_from_start() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("talker", &["x1", "x2", "y1", "yx"]));

    let args = ListArgs {
        filter: Some("^x".into()),
        ..Default::default()
    };
    let output = list(&graph, args, ListConfig::default()).await.expect("list");
    assert_eq!(output.out, "/talker:\n  x1\n  x2\n");

    let unanchored = ListArgs {
        filter: Some("x".into()),
        ..Default::default()
    };
    let output = list(&graph, unanchored, ListConfig::default())
        .await
        .expect("list");
    assert_eq!(output.out, "/talker:\n  x1\n  x2\n");
}

#[tokio::test(start_paused = true)]
async fn test_empty_sections_have_no_header() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("a", &["alpha"]));
    graph.add_node(node("b", &["beta"]));

    let args = ListArgs {
        filter: Some("al".into()),
        ..Default::default()
    };
    let output = list(&graph, args, ListConfig::default()).await.expect("list");
    assert_eq!(output.out, "/a:\n  alpha\n");
}

#[tokio::test(start_paused = true)]
async fn test_unknown_node_fails_before_any_call() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("talker", &["x"]));

    let args = ListArgs {
        node_name: Some("listener".into()),
        ..Default::default()
    };
    let err = list(&graph, args, ListConfig::default())
        .await
        .err()
        .expect("unknown node");
    assert!(matches!(err, ParamError::NodeNotFound(ref name) if name == "/listener"));
    assert_eq!(err.to_string(), "Node not found");
    assert_eq!(graph.requests_served(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failing_node_reported_on_error_stream() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("good", &["p", "q"]));
    graph.add_node(node("bad", &["secret"]).failing("parameter service crashed"));

    let output = list(&graph, ListArgs::default(), ListConfig::default())
        .await
        .expect("list");
    assert_eq!(output.out, "/good:\n  p\n  q\n");
    let lines: Vec<_> = output.err.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Exception while calling service of node '/bad': "));
    assert!(lines[0].contains("parameter service crashed"));
    assert_eq!(output.summary.failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_targeted_node_has_no_header() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("a", &["x"]));
    graph.add_node(LoopbackNode::new("/robot", "arm").parameter("joints", ParameterType::StringArray));

    let args = ListArgs {
        node_name: Some("robot/arm".into()),
        ..Default::default()
    };
    let output = list(&graph, args, ListConfig::default()).await.expect("list");
    assert_eq!(output.out, "  joints\n");
    assert_eq!(graph.requests_served(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_nodes_need_flag() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("visible", &["v"]));
    graph.add_node(node("_hidden", &["h"]));

    let output = list(&graph, ListArgs::default(), ListConfig::default())
        .await
        .expect("list");
    assert_eq!(output.out, "/visible:\n  v\n");

    let args = ListArgs {
        include_hidden_nodes: true,
        ..Default::default()
    };
    let output = list(&graph, args, ListConfig::default()).await.expect("list");
    assert_eq!(output.out, "/_hidden:\n  h\n/visible:\n  v\n");

    let hidden_target = ListArgs {
        node_name: Some("/_hidden".into()),
        ..Default::default()
    };
    assert!(matches!(
        list(&graph, hidden_target, ListConfig::default()).await,
        Err(ParamError::NodeNotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_param_prefixes_forwarded() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("talker", &["qos.depth", "qos.history", "qosx", "rate"]));

    let args = ListArgs {
        param_prefixes: vec!["qos".into()],
        ..Default::default()
    };
    let output = list(&graph, args, ListConfig::default()).await.expect("list");
    assert_eq!(output.out, "/talker:\n  qos.depth\n  qos.history\n");
}

#[tokio::test(start_paused = true)]
async fn test_param_type_labels() {
    let graph = LoopbackGraph::new();
    graph.add_node(
        LoopbackNode::new("/", "talker")
            .parameter("use_sim_time", ParameterType::Bool)
            .parameter("names", ParameterType::StringArray)
            .parameter("blob", ParameterType::ByteArray),
    );

    let args = ListArgs {
        param_type: true,
        ..Default::default()
    };
    let output = list(&graph, args, ListConfig::default()).await.expect("list");
    assert_eq!(
        output.out,
        "/talker:\n  blob (type: byte array)\n  names (type: string array)\n  use_sim_time (type: boolean)\n"
    );
    // one list call, one describe call
    assert_eq!(graph.requests_served(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_silent_node_abandoned_after_call_timeout() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("quick", &["a"]));
    graph.add_node(node("mute", &["b"]).silent());

    let output = list(&graph, ListArgs::default(), ListConfig::default())
        .await
        .expect("list");
    assert_eq!(output.out, "/quick:\n  a\n");
    assert_eq!(
        output.err,
        "Exception while calling service of node '/mute': no reply within 1s\n"
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_node_with_extend_policy() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("slow", &["s"]).reply_delay(Duration::from_millis(1800)));

    let config = ListConfig {
        on_timeout: TimeoutPolicy::Extend { grace_ms: 1000 },
        ..Default::default()
    };
    let output = list(&graph, ListArgs::default(), config.clone())
        .await
        .expect("list");
    assert_eq!(output.out, "/slow:\n  s\n");

    let typed = ListArgs {
        param_type: true,
        ..Default::default()
    };
    let output = list(&graph, typed, config).await.expect("list");
    assert_eq!(output.out, "/slow:\n  s (type: integer)\n");
    assert!(output.err.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_deadline_reports_stalled_node() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("ready", &["r"]));
    graph.add_node(node("stuck", &["s"]).never_ready());

    let config = ListConfig {
        dispatch_deadline_ms: Some(3000),
        ..Default::default()
    };
    let output = list(&graph, ListArgs::default(), config).await.expect("list");
    assert_eq!(output.out, "/ready:\n  r\n");
    assert_eq!(
        output.err,
        "Exception while calling service of node '/stuck': service never became ready\n"
    );
}

#[tokio::test(start_paused = true)]
async fn test_nodes_without_service_are_skipped() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("plain", &["x"]).without_services());
    graph.add_node(node("talker", &["y"]));

    let output = list(&graph, ListArgs::default(), ListConfig::default())
        .await
        .expect("list");
    assert_eq!(output.out, "/talker:\n  y\n");
    assert!(output.err.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_filter() {
    let graph = LoopbackGraph::new();
    graph.add_node(node("talker", &["x"]));

    let args = ListArgs {
        filter: Some("(unclosed".into()),
        ..Default::default()
    };
    assert!(matches!(
        list(&graph, args, ListConfig::default()).await,
        Err(ParamError::InvalidFilter(_))
    ));
    assert_eq!(graph.requests_served(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fixture_file_end_to_end() {
    let mut fixture = tempfile::NamedTempFile::new().expect("tempfile");
    write!(
        fixture,
        r#"
[[nodes]]
name = "/camera/driver"
ready_after_ms = 1500

[nodes.parameters]
exposure = "double"
"roi.width" = {{ type = "integer", description = "Region of interest width" }}

[[nodes]]
name = "/elsewhere"
domain = 3

[nodes.parameters]
unused = "bool"
"#
    )
    .expect("write");

    let graph = LoopbackGraph::from_fixture_file(fixture.path(), 0).expect("fixture");
    let args = ListArgs {
        param_type: true,
        ..Default::default()
    };
    let output = list(&graph, args, ListConfig::default()).await.expect("list");
    assert_eq!(
        output.out,
        "/camera/driver:\n  exposure (type: double)\n  roi.width (type: integer)\n"
    );
}
