//! Edge types and routing predicates for conditional graph flow.

use std::sync::Arc;

use crate::state::StateSnapshot;
use crate::types::NodeKind;

/// Predicate function for conditional edge routing.
///
/// Evaluated on the merged state after the source node's step; returns
/// exactly one target node name (use `"End"` to terminate). Predicates
/// must be pure and synchronous so routing is replayable.
///
/// # Examples
///
/// ```
/// use routeloom::graphs::EdgePredicate;
/// use std::sync::Arc;
///
/// let route: EdgePredicate = Arc::new(|snapshot| {
///     if snapshot.extra.contains_key("route") {
///         "summarize".to_string()
///     } else {
///         "pick_route".to_string()
///     }
/// });
/// ```
pub type EdgePredicate = Arc<dyn Fn(StateSnapshot) -> String + Send + Sync + 'static>;

/// A conditional edge routing to one of a declared candidate set.
///
/// The candidates are part of the graph's static topology: compilation
/// verifies every candidate is registered, and the runner rejects any
/// predicate decision outside the set.
#[derive(Clone)]
pub struct ConditionalEdge {
    from: NodeKind,
    candidates: Vec<NodeKind>,
    predicate: EdgePredicate,
}

impl ConditionalEdge {
    pub fn new(
        from: impl Into<NodeKind>,
        candidates: Vec<NodeKind>,
        predicate: EdgePredicate,
    ) -> Self {
        Self {
            from: from.into(),
            candidates,
            predicate,
        }
    }

    pub fn from(&self) -> &NodeKind {
        &self.from
    }

    pub fn candidates(&self) -> &[NodeKind] {
        &self.candidates
    }

    pub fn predicate(&self) -> &EdgePredicate {
        &self.predicate
    }

    /// True when `target` is within the declared candidate set.
    #[must_use]
    pub fn permits(&self, target: &NodeKind) -> bool {
        self.candidates.contains(target)
    }
}
