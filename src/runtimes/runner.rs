//! Sequential session runner.
//!
//! One session executes exactly one node per step: run the current node,
//! merge its partial through the reducer registry, checkpoint, route.
//! Concurrent sessions are fully isolated; the checkpoint store is the
//! only shared resource and has one writer per session.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::instrument;

use crate::app::App;
use crate::channels::Channel;
use crate::channels::errors::{ErrorDetails, ErrorEvent};
use crate::node::{NodeContext, NodeError, NodePartial};
use crate::reducers::ReducerError;
use crate::runtimes::checkpointer::{
    Checkpoint, Checkpointer, CheckpointerError, InMemoryCheckpointer, restore_session_state,
};
use crate::state::VersionedState;
use crate::types::NodeKind;

/// In-memory execution state for one session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub state: VersionedState,
    /// Successfully merged steps so far.
    pub step: u64,
    /// The node to execute next; `End` means the session is complete.
    pub current: NodeKind,
}

/// Result of executing one step in a session.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: u64,
    pub ran_node: NodeKind,
    pub next_node: NodeKind,
    pub messages_version: u32,
    pub extra_version: u32,
    pub completed: bool,
}

/// How a session came into being.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInit {
    Fresh,
    Resumed { checkpoint_step: u64 },
}

#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error("session not found: {session_id}")]
    #[diagnostic(code(routeloom::runner::session_not_found))]
    SessionNotFound { session_id: String },

    #[error("recursion limit of {limit} steps exceeded")]
    #[diagnostic(
        code(routeloom::runner::recursion_limit),
        help("Raise RuntimeConfig::recursion_limit or check routing for a loop that never reaches End.")
    )]
    RecursionLimitExceeded { limit: u64 },

    #[error("node {node} failed at step {step}: {source}")]
    #[diagnostic(code(routeloom::runner::node_run))]
    NodeRun {
        node: String,
        step: u64,
        #[source]
        source: NodeError,
    },

    #[error("conditional edge from {from} routed to {target}, outside its declared candidates")]
    #[diagnostic(
        code(routeloom::runner::invalid_route),
        help("The predicate must return one of the candidate names declared on the edge.")
    )]
    InvalidRoute { from: String, target: String },

    #[error(transparent)]
    #[diagnostic(code(routeloom::runner::merge))]
    Merge(#[from] ReducerError),

    #[error(transparent)]
    #[diagnostic(code(routeloom::runner::checkpointer))]
    Checkpointer(#[from] CheckpointerError),
}

/// Runtime execution engine with session management and checkpointing.
///
/// `App` is the graph structure; `AppRunner` is the runtime environment.
/// One `App` can be shared (via `Arc`) across many runners, each holding
/// its own sessions.
pub struct AppRunner {
    app: Arc<App>,
    sessions: FxHashMap<String, SessionState>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    autosave: bool,
}

impl AppRunner {
    /// Runner with the persistence backend named in the app's runtime
    /// config and autosave enabled.
    pub async fn new(app: App) -> Self {
        // Only the in-memory backend ships today; the match keeps the
        // construction path explicit for durable backends.
        let checkpointer: Arc<dyn Checkpointer> = match app.runtime_config().checkpointer {
            super::CheckpointerType::InMemory => Arc::new(InMemoryCheckpointer::new()),
        };
        Self::with_checkpointer(app, checkpointer)
    }

    /// Runner backed by an externally owned checkpointer.
    ///
    /// Sharing one store between runners lets a new runner resume the
    /// sessions of a crashed one.
    pub fn with_checkpointer(app: App, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            app: Arc::new(app),
            sessions: FxHashMap::default(),
            checkpointer: Some(checkpointer),
            autosave: true,
        }
    }

    /// Runner without persistence; sessions live only in memory.
    pub fn without_checkpointer(app: App) -> Self {
        Self {
            app: Arc::new(app),
            sessions: FxHashMap::default(),
            checkpointer: None,
            autosave: false,
        }
    }

    /// Initialize a session, resuming from its latest checkpoint when one
    /// exists.
    ///
    /// On resume the supplied `initial_state` is not discarded: it is
    /// merged into the restored state as a patch through the reducer
    /// registry, so re-invoking a session with changed inputs takes
    /// effect.
    #[instrument(skip(self, initial_state), err)]
    pub async fn create_session(
        &mut self,
        session_id: String,
        initial_state: VersionedState,
    ) -> Result<SessionInit, RunnerError> {
        let restored = if let Some(cp) = &self.checkpointer {
            cp.load_latest(&session_id).await?
        } else {
            None
        };

        if let Some(stored) = restored {
            tracing::info!(
                session = %session_id,
                checkpoint_step = stored.step,
                current = %stored.current,
                "resuming session from checkpoint"
            );
            let checkpoint_step = stored.step;
            let mut session_state = restore_session_state(&stored);
            self.app
                .apply_barrier(&mut session_state.state, &initial_patch(&initial_state))?;
            self.sessions.insert(session_id.clone(), session_state);
            self.maybe_checkpoint(&session_id).await;
            return Ok(SessionInit::Resumed { checkpoint_step });
        }

        let session_state = SessionState {
            state: initial_state,
            step: 0,
            current: self.app.entry_node(),
        };
        self.sessions
            .insert(session_id.clone(), session_state.clone());
        if self.autosave && let Some(cp) = &self.checkpointer {
            cp.save(Checkpoint::from_session(&session_id, &session_state))
                .await?;
        }
        Ok(SessionInit::Fresh)
    }

    /// Execute one step: run the current node, merge, checkpoint, route.
    ///
    /// A failing node's patch is never merged and the step counter does
    /// not advance; the failure itself is recorded as an event on the
    /// errors channel, and retrying re-enters the same node.
    #[instrument(skip(self), err)]
    pub async fn run_step(&mut self, session_id: &str) -> Result<StepReport, RunnerError> {
        let session = self.sessions.get(session_id).ok_or_else(|| {
            RunnerError::SessionNotFound {
                session_id: session_id.to_string(),
            }
        })?;

        if session.current.is_end() {
            return Ok(StepReport {
                step: session.step,
                ran_node: NodeKind::End,
                next_node: NodeKind::End,
                messages_version: session.state.messages.version(),
                extra_version: session.state.extra.version(),
                completed: true,
            });
        }

        let limit = self.app.runtime_config().recursion_limit;
        if session.step >= limit {
            let event = ErrorEvent::runner(
                session_id,
                session.step,
                ErrorDetails::msg(format!("recursion limit of {limit} steps exceeded")),
            )
            .with_tag("recursion_limit");
            self.record_error_event(session_id, event).await;
            return Err(RunnerError::RecursionLimitExceeded { limit });
        }

        let current = session.current.clone();
        let step = session.step + 1;
        let snapshot = session.state.snapshot();

        let node = self.app.nodes().get(&current).cloned().ok_or_else(|| {
            // Compile validation makes this unreachable for well-formed
            // apps; kept as a runtime route check.
            RunnerError::InvalidRoute {
                from: NodeKind::Start.encode(),
                target: current.encode(),
            }
        })?;

        let ctx = NodeContext {
            node_id: current.to_string(),
            step,
            session_id: session_id.to_string(),
        };
        tracing::debug!(node = %current, step, "running node");
        let partial = match node.run(snapshot, ctx).await {
            Ok(partial) => partial,
            Err(source) => {
                let event = ErrorEvent::node(
                    current.to_string(),
                    step,
                    ErrorDetails::msg(source.to_string()),
                );
                self.record_error_event(session_id, event).await;
                return Err(RunnerError::NodeRun {
                    node: current.to_string(),
                    step,
                    source,
                });
            }
        };

        // Merge and route against owned state, then commit back.
        let mut session_state = self
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| RunnerError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        self.app.apply_barrier(&mut session_state.state, &partial)?;
        session_state.step = step;

        let next = self.route_from(&current, &session_state.state)?;
        tracing::debug!(node = %current, step, next = %next, "routed");
        session_state.current = next.clone();

        let report = StepReport {
            step,
            ran_node: current,
            next_node: next.clone(),
            messages_version: session_state.state.messages.version(),
            extra_version: session_state.state.extra.version(),
            completed: next.is_end(),
        };

        self.sessions
            .insert(session_id.to_string(), session_state);
        self.maybe_checkpoint(session_id).await;
        Ok(report)
    }

    /// Next node after `from`, on the merged state.
    ///
    /// An unconditional edge wins over conditional edges; a conditional
    /// decision must land within the edge's declared candidates.
    fn route_from(
        &self,
        from: &NodeKind,
        state: &VersionedState,
    ) -> Result<NodeKind, RunnerError> {
        if let Some(targets) = self.app.edges().get(from)
            && let Some(target) = targets.first()
        {
            return Ok(target.clone());
        }

        for edge in self.app.conditional_edges().iter().filter(|e| e.from() == from) {
            let target_name = (edge.predicate())(state.snapshot());
            let target = NodeKind::from(target_name.as_str());
            if !edge.permits(&target) {
                return Err(RunnerError::InvalidRoute {
                    from: from.encode(),
                    target: target.encode(),
                });
            }
            return Ok(target);
        }

        tracing::warn!(node = %from, "no outgoing edge; completing session");
        Ok(NodeKind::End)
    }

    /// Record a fatal failure as data on the errors channel and
    /// checkpoint, without advancing the session step.
    async fn record_error_event(&mut self, session_id: &str, event: ErrorEvent) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            let update = NodePartial::new().with_errors(vec![event]);
            if let Err(e) = self.app.apply_barrier(&mut session.state, &update) {
                tracing::error!(session = %session_id, error = %e, "failed to record error event");
            }
        }
        self.maybe_checkpoint(session_id).await;
    }

    async fn maybe_checkpoint(&self, session_id: &str) {
        if self.autosave
            && let Some(cp) = &self.checkpointer
            && let Some(session_state) = self.sessions.get(session_id)
        {
            if let Err(e) = cp
                .save(Checkpoint::from_session(session_id, session_state))
                .await
            {
                tracing::error!(session = %session_id, error = %e, "checkpoint save failed");
            }
        }
    }

    /// Drive the session until it routes to `End` or fails.
    #[instrument(skip(self), err)]
    pub async fn run_until_complete(
        &mut self,
        session_id: &str,
    ) -> Result<VersionedState, RunnerError> {
        tracing::info!(session = %session_id, "workflow run started");
        loop {
            let report = self.run_step(session_id).await?;
            if report.completed {
                tracing::info!(
                    session = %session_id,
                    step = report.step,
                    "workflow run completed"
                );
                break;
            }
        }
        let session = self.sessions.get(session_id).ok_or_else(|| {
            RunnerError::SessionNotFound {
                session_id: session_id.to_string(),
            }
        })?;
        Ok(session.state.clone())
    }

    #[must_use]
    pub fn get_session(&self, session_id: &str) -> Option<&SessionState> {
        self.sessions.get(session_id)
    }

    #[must_use]
    pub fn list_sessions(&self) -> Vec<&String> {
        self.sessions.keys().collect()
    }
}

/// Convert a caller-supplied initial state into the patch merged when a
/// session resumes from a checkpoint.
fn initial_patch(state: &VersionedState) -> NodePartial {
    let snapshot = state.snapshot();
    let mut patch = NodePartial::new();
    if !snapshot.messages.is_empty() {
        patch.messages = Some(snapshot.messages);
    }
    if !snapshot.extra.is_empty() {
        patch.extra = Some(snapshot.extra);
    }
    if !snapshot.errors.is_empty() {
        patch.errors = Some(snapshot.errors);
    }
    patch
}
