//! Compiled workflow application.
//!
//! [`App`] is the immutable output of graph compilation: topology,
//! reducer registry, and runtime configuration. Execution state lives in
//! [`AppRunner`](crate::runtimes::AppRunner); one `App` can back any
//! number of concurrently running sessions.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::graphs::ConditionalEdge;
use crate::node::{Node, NodePartial};
use crate::reducers::{ReducerError, ReducerRegistry};
use crate::runtimes::{AppRunner, RunnerError, RuntimeConfig};
use crate::state::VersionedState;
use crate::types::NodeKind;

/// Orchestrates graph execution and applies reducers at merge barriers.
///
/// # Examples
///
/// ```rust,no_run
/// use routeloom::graphs::GraphBuilder;
/// use routeloom::state::VersionedState;
/// use routeloom::types::NodeKind;
///
/// # struct Worker;
/// # #[async_trait::async_trait]
/// # impl routeloom::node::Node for Worker {
/// #     async fn run(&self, _: routeloom::state::StateSnapshot, _: routeloom::node::NodeContext) -> Result<routeloom::node::NodePartial, routeloom::node::NodeError> {
/// #         Ok(routeloom::node::NodePartial::default())
/// #     }
/// # }
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let app = GraphBuilder::new()
///     .add_node(NodeKind::Custom("worker".into()), Worker)
///     .add_edge(NodeKind::Start, NodeKind::Custom("worker".into()))
///     .add_edge(NodeKind::Custom("worker".into()), NodeKind::End)
///     .compile()?;
///
/// let final_state = app
///     .invoke(VersionedState::new_with_user_message("Hello"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct App {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    conditional_edges: Vec<ConditionalEdge>,
    reducer_registry: ReducerRegistry,
    runtime_config: RuntimeConfig,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field(
                "conditional_edges",
                &self
                    .conditional_edges
                    .iter()
                    .map(|edge| (edge.from(), edge.candidates()))
                    .collect::<Vec<_>>(),
            )
            .field("runtime_config", &self.runtime_config)
            .finish_non_exhaustive()
    }
}

impl App {
    pub(crate) fn from_parts(
        nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
        edges: FxHashMap<NodeKind, Vec<NodeKind>>,
        conditional_edges: Vec<ConditionalEdge>,
        reducer_registry: ReducerRegistry,
        runtime_config: RuntimeConfig,
    ) -> Self {
        Self {
            nodes,
            edges,
            conditional_edges,
            reducer_registry,
            runtime_config,
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &FxHashMap<NodeKind, Arc<dyn Node>> {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &FxHashMap<NodeKind, Vec<NodeKind>> {
        &self.edges
    }

    #[must_use]
    pub fn conditional_edges(&self) -> &[ConditionalEdge] {
        &self.conditional_edges
    }

    #[must_use]
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }

    /// The single edge out of `Start`, validated at compile time.
    #[must_use]
    pub fn entry_node(&self) -> NodeKind {
        self.edges
            .get(&NodeKind::Start)
            .and_then(|targets| targets.first())
            .cloned()
            .unwrap_or(NodeKind::End)
    }

    /// Merge one node's partial update into the state.
    ///
    /// The only code path that mutates session state. Deterministic:
    /// replaying the same partial sequence yields identical state.
    pub fn apply_barrier(
        &self,
        state: &mut VersionedState,
        update: &NodePartial,
    ) -> Result<(), ReducerError> {
        self.reducer_registry.apply_all(state, update)
    }

    /// Run the workflow to completion with the configured runtime.
    ///
    /// Creates a runner, resolves the session id from the configured
    /// session-key policy, and drives the session until it routes to
    /// `End` or fails.
    pub async fn invoke(&self, initial_state: VersionedState) -> Result<VersionedState, RunnerError> {
        let mut runner = AppRunner::new(self.clone()).await;
        let session_id = self
            .runtime_config
            .session_key
            .resolve(&initial_state);
        runner.create_session(session_id.clone(), initial_state).await?;
        runner.run_until_complete(&session_id).await
    }
}
