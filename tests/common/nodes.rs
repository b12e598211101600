use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use routeloom::message::Message;
use routeloom::node::{Node, NodeContext, NodeError, NodePartial};
use routeloom::state::StateSnapshot;
use routeloom::utils::collections::new_extra_map;
use serde_json::json;

/// Appends a fixed assistant message.
#[derive(Debug, Clone)]
pub struct SimpleMessageNode {
    pub msg: &'static str,
}

#[async_trait]
impl Node for SimpleMessageNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with_messages(vec![Message::assistant(self.msg)]))
    }
}

/// Counts its own executions and writes the count into an extras field.
///
/// The shared counter lets tests assert exactly how many times the node
/// ran across runner restarts.
#[derive(Clone)]
pub struct CountingNode {
    pub field: &'static str,
    pub executions: Arc<AtomicU64>,
}

impl CountingNode {
    #[allow(dead_code)]
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            executions: Arc::new(AtomicU64::new(0)),
        }
    }
}

#[async_trait]
impl Node for CountingNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let current = snapshot
            .extra
            .get(self.field)
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        let mut extra = new_extra_map();
        extra.insert(self.field.to_string(), json!(current + 1));
        Ok(NodePartial::new().with_extra(extra))
    }
}

/// Always fails with a validation error.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct FailingNode;

#[async_trait]
impl Node for FailingNode {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Err(NodeError::ValidationFailed("always fails".into()))
    }
}
