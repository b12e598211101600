use std::sync::Arc;

use routeloom::graphs::{EdgePredicate, GraphBuilder, GraphCompileError};
use routeloom::types::NodeKind;

mod common;
use common::*;

fn custom(name: &str) -> NodeKind {
    NodeKind::Custom(name.to_string())
}

#[test]
fn missing_entry_edge_is_rejected() {
    let err = GraphBuilder::new()
        .add_node(custom("worker"), SimpleMessageNode { msg: "hi" })
        .add_edge(custom("worker"), NodeKind::End)
        .compile()
        .unwrap_err();
    assert_eq!(err, GraphCompileError::NoEntryEdge);
}

#[test]
fn multiple_entry_edges_are_rejected() {
    let err = GraphBuilder::new()
        .add_node(custom("a"), SimpleMessageNode { msg: "a" })
        .add_node(custom("b"), SimpleMessageNode { msg: "b" })
        .add_edge(NodeKind::Start, custom("a"))
        .add_edge(NodeKind::Start, custom("b"))
        .compile()
        .unwrap_err();
    assert_eq!(err, GraphCompileError::AmbiguousEntry);
}

#[test]
fn edge_to_undefined_node_is_rejected() {
    let err = GraphBuilder::new()
        .add_node(custom("worker"), SimpleMessageNode { msg: "hi" })
        .add_edge(NodeKind::Start, custom("worker"))
        .add_edge(custom("worker"), custom("ghost"))
        .compile()
        .unwrap_err();
    assert_eq!(
        err,
        GraphCompileError::UndefinedEdgeTarget {
            node: "Custom:ghost".into()
        }
    );
}

#[test]
fn conflicting_unconditional_edges_are_rejected() {
    let err = GraphBuilder::new()
        .add_node(custom("worker"), SimpleMessageNode { msg: "w" })
        .add_node(custom("a"), SimpleMessageNode { msg: "a" })
        .add_node(custom("b"), SimpleMessageNode { msg: "b" })
        .add_edge(NodeKind::Start, custom("worker"))
        .add_edge(custom("worker"), custom("a"))
        .add_edge(custom("worker"), custom("b"))
        .compile()
        .unwrap_err();
    assert_eq!(
        err,
        GraphCompileError::ConflictingEdges {
            node: "Custom:worker".into()
        }
    );
}

#[test]
fn conditional_candidate_must_be_registered() {
    let predicate: EdgePredicate = Arc::new(|_| "ghost".to_string());
    let err = GraphBuilder::new()
        .add_node(custom("worker"), SimpleMessageNode { msg: "hi" })
        .add_edge(NodeKind::Start, custom("worker"))
        .add_conditional_edge(
            custom("worker"),
            vec![custom("ghost"), NodeKind::End],
            predicate,
        )
        .compile()
        .unwrap_err();
    assert_eq!(
        err,
        GraphCompileError::UndefinedCandidate {
            from: "Custom:worker".into(),
            candidate: "Custom:ghost".into()
        }
    );
}

#[test]
fn end_and_start_are_always_valid_candidates() {
    let predicate: EdgePredicate = Arc::new(|_| "End".to_string());
    let app = GraphBuilder::new()
        .add_node(custom("worker"), SimpleMessageNode { msg: "hi" })
        .add_edge(NodeKind::Start, custom("worker"))
        .add_conditional_edge(custom("worker"), vec![NodeKind::End], predicate)
        .compile()
        .unwrap();
    assert_eq!(app.entry_node(), custom("worker"));
}

#[test]
fn virtual_endpoints_cannot_be_registered() {
    let app = GraphBuilder::new()
        .add_node(NodeKind::Start, SimpleMessageNode { msg: "ignored" })
        .add_node(custom("worker"), SimpleMessageNode { msg: "hi" })
        .add_edge(NodeKind::Start, custom("worker"))
        .add_edge(custom("worker"), NodeKind::End)
        .compile()
        .unwrap();
    assert_eq!(app.nodes().len(), 1);
}
