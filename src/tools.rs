//! Tool capability trait, registry, and the batched dispatch node.
//!
//! A model turn may request several tool calls at once. [`ToolNode`] runs
//! the whole batch concurrently and appends exactly one result message per
//! call, in the original call order, each tagged with its call id. A
//! failing call produces a failure-tagged result plus an error event; it
//! never aborts the rest of the batch.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::channels::errors::{ErrorDetails, ErrorEvent};
use crate::message::{Message, ToolCall};
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;

#[derive(Debug, Error, Diagnostic)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    #[diagnostic(code(routeloom::tool::invalid_arguments))]
    InvalidArguments(String),

    #[error("tool execution failed: {0}")]
    #[diagnostic(code(routeloom::tool::execution))]
    Execution(String),
}

/// An external capability invocable by name with JSON arguments.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn call(&self, arguments: Value) -> Result<Value, ToolError>;
}

/// Name-keyed table of registered tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: FxHashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}

/// Outcome of a single call within a batch, before rendering to messages.
enum CallOutcome {
    Ok(Value),
    Failed(String),
}

/// Graph node that answers every pending tool call on the latest message.
pub struct ToolNode {
    registry: ToolRegistry,
}

impl ToolNode {
    #[must_use]
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    async fn dispatch_one(&self, call: &ToolCall) -> CallOutcome {
        let Some(tool) = self.registry.get(&call.name) else {
            return CallOutcome::Failed(format!("unknown tool: {}", call.name));
        };
        match tool.call(call.arguments.clone()).await {
            Ok(value) => CallOutcome::Ok(value),
            Err(e) => CallOutcome::Failed(e.to_string()),
        }
    }
}

#[async_trait]
impl Node for ToolNode {
    #[instrument(skip(self, snapshot, _ctx), fields(node = %_ctx.node_id, step = _ctx.step))]
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let calls: Vec<ToolCall> = snapshot
            .last_message()
            .map(|m| m.tool_calls.clone())
            .unwrap_or_default();
        if calls.is_empty() {
            tracing::debug!("no pending tool calls; nothing to dispatch");
            return Ok(NodePartial::new());
        }

        tracing::debug!(batch = calls.len(), "dispatching tool call batch");

        // join_all yields outcomes in input order even though the calls
        // themselves complete in any order.
        let outcomes = join_all(calls.iter().map(|call| self.dispatch_one(call))).await;

        let mut messages = Vec::with_capacity(calls.len());
        let mut errors = Vec::new();
        for (call, outcome) in calls.iter().zip(outcomes) {
            match outcome {
                CallOutcome::Ok(value) => {
                    messages.push(Message::tool_result(&call.id, &value.to_string()));
                }
                CallOutcome::Failed(reason) => {
                    tracing::warn!(call_id = %call.id, tool = %call.name, %reason, "tool call failed");
                    messages.push(Message::tool_result(
                        &call.id,
                        &format!("error: {reason}"),
                    ));
                    errors.push(ErrorEvent::tool(
                        &call.id,
                        &call.name,
                        ErrorDetails::msg(reason),
                    ));
                }
            }
        }

        let partial = NodePartial::new().with_messages(messages);
        if errors.is_empty() {
            Ok(partial)
        } else {
            Ok(partial.with_errors(errors))
        }
    }
}
