//! Graph validation and compilation into an executable [`App`].

use miette::Diagnostic;
use thiserror::Error;

use crate::app::App;
use crate::reducers::ReducerRegistry;
use crate::types::NodeKind;

/// Structural problems detected at compile time.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum GraphCompileError {
    #[error("no entry edge from Start")]
    #[diagnostic(
        code(routeloom::graph::no_entry),
        help("Add an edge from NodeKind::Start to the first executable node.")
    )]
    NoEntryEdge,

    #[error("edge references undefined node: {node}")]
    #[diagnostic(code(routeloom::graph::undefined_edge_target))]
    UndefinedEdgeTarget { node: String },

    #[error("conditional edge from {from} declares unregistered candidate: {candidate}")]
    #[diagnostic(
        code(routeloom::graph::undefined_candidate),
        help("Register the candidate node or remove it from the candidate set.")
    )]
    UndefinedCandidate { from: String, candidate: String },

    #[error("multiple entry edges from Start; exactly one is required")]
    #[diagnostic(code(routeloom::graph::ambiguous_entry))]
    AmbiguousEntry,

    #[error("multiple unconditional edges from {node}; at most one is allowed")]
    #[diagnostic(
        code(routeloom::graph::conflicting_edges),
        help("Use a conditional edge with a candidate set to branch from a node.")
    )]
    ConflictingEdges { node: String },
}

impl super::builder::GraphBuilder {
    /// Validates the graph and compiles it into an [`App`].
    ///
    /// # Errors
    ///
    /// - [`GraphCompileError::NoEntryEdge`] / [`GraphCompileError::AmbiguousEntry`]
    ///   when Start has zero or more than one outgoing edge
    /// - [`GraphCompileError::UndefinedEdgeTarget`] when an edge endpoint
    ///   names a node that was never registered
    /// - [`GraphCompileError::ConflictingEdges`] when a node has more than
    ///   one unconditional successor
    /// - [`GraphCompileError::UndefinedCandidate`] when a conditional
    ///   edge's candidate set names an unregistered node
    pub fn compile(self) -> Result<App, GraphCompileError> {
        let is_defined = |kind: &NodeKind| -> bool {
            matches!(kind, NodeKind::Start | NodeKind::End) || self.nodes.contains_key(kind)
        };

        match self.edges.get(&NodeKind::Start).map(Vec::len) {
            None | Some(0) => return Err(GraphCompileError::NoEntryEdge),
            Some(1) => {}
            Some(_) => return Err(GraphCompileError::AmbiguousEntry),
        }

        for (from, targets) in &self.edges {
            if !is_defined(from) {
                return Err(GraphCompileError::UndefinedEdgeTarget {
                    node: from.encode(),
                });
            }
            // Start is covered by the entry check above.
            if !from.is_start() && targets.len() > 1 {
                return Err(GraphCompileError::ConflictingEdges {
                    node: from.encode(),
                });
            }
            for to in targets {
                if !is_defined(to) {
                    return Err(GraphCompileError::UndefinedEdgeTarget { node: to.encode() });
                }
            }
        }

        for edge in &self.conditional_edges {
            if !is_defined(edge.from()) {
                return Err(GraphCompileError::UndefinedEdgeTarget {
                    node: edge.from().encode(),
                });
            }
            for candidate in edge.candidates() {
                if !is_defined(candidate) {
                    return Err(GraphCompileError::UndefinedCandidate {
                        from: edge.from().encode(),
                        candidate: candidate.encode(),
                    });
                }
            }
        }

        let reducer_registry = ReducerRegistry::standard(
            self.field_policies,
            self.unknown_field_policy,
            self.message_cap,
        );

        Ok(App::from_parts(
            self.nodes,
            self.edges,
            self.conditional_edges,
            reducer_registry,
            self.runtime_config,
        ))
    }
}
