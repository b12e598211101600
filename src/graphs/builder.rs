//! Fluent construction of workflow graphs.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::edges::{ConditionalEdge, EdgePredicate};
use crate::node::Node;
use crate::reducers::{FieldPolicies, UnknownFieldPolicy};
use crate::runtimes::RuntimeConfig;
use crate::types::NodeKind;

/// Builder for workflow graphs.
///
/// Add nodes and edges, declare the extras-channel field policies, then
/// [`compile`](Self::compile) into an executable
/// [`App`](crate::app::App). `NodeKind::Start` and `NodeKind::End` are
/// virtual endpoints: they anchor edges but are never registered or
/// executed.
///
/// # Examples
///
/// ```
/// use routeloom::graphs::GraphBuilder;
/// use routeloom::types::NodeKind;
///
/// # struct Worker;
/// # #[async_trait::async_trait]
/// # impl routeloom::node::Node for Worker {
/// #     async fn run(&self, _: routeloom::state::StateSnapshot, _: routeloom::node::NodeContext) -> Result<routeloom::node::NodePartial, routeloom::node::NodeError> {
/// #         Ok(routeloom::node::NodePartial::default())
/// #     }
/// # }
/// let app = GraphBuilder::new()
///     .add_node(NodeKind::Custom("worker".into()), Worker)
///     .add_edge(NodeKind::Start, NodeKind::Custom("worker".into()))
///     .add_edge(NodeKind::Custom("worker".into()), NodeKind::End)
///     .compile()
///     .unwrap();
/// ```
pub struct GraphBuilder {
    pub(crate) nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    pub(crate) edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    pub(crate) conditional_edges: Vec<ConditionalEdge>,
    pub(crate) field_policies: FieldPolicies,
    pub(crate) unknown_field_policy: UnknownFieldPolicy,
    pub(crate) message_cap: Option<usize>,
    pub(crate) runtime_config: RuntimeConfig,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            conditional_edges: Vec::new(),
            field_policies: FieldPolicies::default(),
            unknown_field_policy: UnknownFieldPolicy::default(),
            message_cap: None,
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Registers a node under a unique identifier.
    ///
    /// Attempts to register the virtual `Start`/`End` kinds are ignored
    /// with a warning.
    #[must_use]
    pub fn add_node(mut self, id: NodeKind, node: impl Node + 'static) -> Self {
        match id {
            NodeKind::Start | NodeKind::End => {
                tracing::warn!(
                    ?id,
                    "ignoring registration of virtual node kind (Start/End are virtual)"
                );
            }
            _ => {
                self.nodes.insert(id, Arc::new(node));
            }
        }
        self
    }

    /// Adds an unconditional edge. A node may have at most one
    /// unconditional successor (compilation rejects conflicts); routing
    /// prefers it over conditional edges.
    #[must_use]
    pub fn add_edge(mut self, from: NodeKind, to: NodeKind) -> Self {
        self.edges.entry(from).or_default().push(to);
        self
    }

    /// Adds a conditional edge with its declared candidate set.
    ///
    /// The predicate is evaluated on the merged state after `from`
    /// completes and must return the name of one candidate (or `"End"`).
    #[must_use]
    pub fn add_conditional_edge(
        mut self,
        from: NodeKind,
        candidates: Vec<NodeKind>,
        predicate: EdgePredicate,
    ) -> Self {
        self.conditional_edges
            .push(ConditionalEdge::new(from, candidates, predicate));
        self
    }

    /// Declares the merge policies for the extras channel.
    #[must_use]
    pub fn with_field_policies(mut self, policies: FieldPolicies) -> Self {
        self.field_policies = policies;
        self
    }

    /// Configures handling of patch fields with no declared policy.
    #[must_use]
    pub fn with_unknown_field_policy(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_field_policy = policy;
        self
    }

    /// Caps the message log to the newest `cap` entries after each merge.
    #[must_use]
    pub fn with_message_cap(mut self, cap: usize) -> Self {
        self.message_cap = Some(cap);
        self
    }

    #[must_use]
    pub fn with_runtime_config(mut self, runtime_config: RuntimeConfig) -> Self {
        self.runtime_config = runtime_config;
        self
    }
}
