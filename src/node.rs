//! Node execution primitives.
//!
//! A [`Node`] is a named unit of work: it receives an immutable
//! [`StateSnapshot`] and returns a [`NodePartial`], the patch the
//! executor merges through the reducer registry. Nodes have no say in
//! routing; conditional edges decide that from the merged state.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::channels::errors::ErrorEvent;
use crate::message::Message;
use crate::state::StateSnapshot;

/// Core trait for executable workflow nodes.
///
/// Transforms must be safe to re-run against unchanged state: a failed
/// node's patch is never merged, and retrying the session re-enters the
/// same node.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use routeloom::node::{Node, NodeContext, NodeError, NodePartial};
/// use routeloom::message::Message;
/// use routeloom::state::StateSnapshot;
///
/// struct Greeter;
///
/// #[async_trait]
/// impl Node for Greeter {
///     async fn run(
///         &self,
///         _snapshot: StateSnapshot,
///         _ctx: NodeContext,
///     ) -> Result<NodePartial, NodeError> {
///         Ok(NodePartial::new().with_messages(vec![Message::assistant("hello")]))
///     }
/// }
/// ```
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError>;
}

/// Execution context handed to a node for one step.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Identifier of the node being executed.
    pub node_id: String,
    /// Step number within the session (1-based).
    pub step: u64,
    /// Session this step belongs to.
    pub session_id: String,
}

impl NodeContext {
    /// Emit a node-scoped tracing event enriched with this context.
    pub fn emit(&self, scope: &str, message: impl AsRef<str>) {
        tracing::info!(
            node = %self.node_id,
            step = self.step,
            session = %self.session_id,
            scope,
            "{}",
            message.as_ref()
        );
    }
}

/// Partial state update returned by a node.
///
/// All fields optional; the runtime merges only what is present.
#[derive(Clone, Debug, Default)]
pub struct NodePartial {
    /// Messages to append to the conversation log.
    pub messages: Option<Vec<Message>>,
    /// Extras fields to merge through their declared strategies.
    pub extra: Option<FxHashMap<String, serde_json::Value>>,
    /// Recoverable errors to record as data.
    pub errors: Option<Vec<ErrorEvent>>,
}

impl NodePartial {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: FxHashMap<String, serde_json::Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<ErrorEvent>) -> Self {
        self.errors = Some(errors);
        self
    }
}

/// Fatal errors halting the invocation. Recoverable problems belong in
/// `NodePartial::errors` instead.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(routeloom::node::missing_input),
        help("Check that an upstream node produced the required field.")
    )]
    MissingInput { what: &'static str },

    /// External collaborator (model, maps, search) failed fatally.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(routeloom::node::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// JSON (de)serialization failed inside the node.
    #[error(transparent)]
    #[diagnostic(code(routeloom::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Input validation failed.
    #[error("validation failed: {0}")]
    #[diagnostic(code(routeloom::node::validation))]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::collections::new_extra_map;
    use serde_json::json;

    #[test]
    fn partial_builder_sets_fields() {
        let mut extra = new_extra_map();
        extra.insert("route".into(), json!("Pacific Coast"));
        let partial = NodePartial::new()
            .with_messages(vec![Message::assistant("done")])
            .with_extra(extra);
        assert_eq!(partial.messages.as_ref().unwrap().len(), 1);
        assert!(partial.errors.is_none());
    }
}
