use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use routeloom::message::{Message, ToolCall};
use routeloom::node::{Node, NodeContext};
use routeloom::state::VersionedState;
use routeloom::tools::{Tool, ToolError, ToolNode, ToolRegistry};
use serde_json::{Value, json};

/// Answers after a configurable delay, so completion order can be made
/// to differ from call order.
struct DelayedTool {
    name: &'static str,
    delay: Duration,
}

#[async_trait]
impl Tool for DelayedTool {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        "test tool with configurable latency"
    }
    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        tokio::time::sleep(self.delay).await;
        Ok(json!({"tool": self.name, "echo": arguments}))
    }
}

struct FlakyTool;

#[async_trait]
impl Tool for FlakyTool {
    fn name(&self) -> &str {
        "flaky"
    }
    fn description(&self) -> &str {
        "always fails"
    }
    async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
        Err(ToolError::Execution("upstream timed out".into()))
    }
}

fn ctx() -> NodeContext {
    NodeContext {
        node_id: "search_for_step_distances_tool".into(),
        step: 1,
        session_id: "s".into(),
    }
}

fn state_with_calls(calls: Vec<ToolCall>) -> VersionedState {
    VersionedState::builder()
        .with_message(Message::assistant_with_tool_calls("", calls))
        .build()
}

#[tokio::test]
async fn results_follow_call_order_not_completion_order() {
    let registry = ToolRegistry::new()
        .with_tool(Arc::new(DelayedTool {
            name: "slow",
            delay: Duration::from_millis(50),
        }))
        .with_tool(Arc::new(DelayedTool {
            name: "fast",
            delay: Duration::from_millis(1),
        }));
    let node = ToolNode::new(registry);

    // The slow call comes first; its result must still come first.
    let state = state_with_calls(vec![
        ToolCall::new("c1", "slow", json!({"leg": "a -> b"})),
        ToolCall::new("c2", "fast", json!({"leg": "b -> c"})),
        ToolCall::new("c3", "fast", json!({"leg": "c -> d"})),
    ]);

    let partial = node.run(state.snapshot(), ctx()).await.unwrap();
    let messages = partial.messages.unwrap();
    assert_eq!(messages.len(), 3);
    let ids: Vec<_> = messages
        .iter()
        .map(|m| m.tool_call_id.as_deref().unwrap())
        .collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
    assert!(messages[0].content.contains("slow"));
    assert!(partial.errors.is_none());
}

#[tokio::test]
async fn failing_call_never_aborts_the_batch() {
    let registry = ToolRegistry::new()
        .with_tool(Arc::new(DelayedTool {
            name: "ok",
            delay: Duration::from_millis(1),
        }))
        .with_tool(Arc::new(FlakyTool));
    let node = ToolNode::new(registry);

    let state = state_with_calls(vec![
        ToolCall::new("c1", "flaky", json!({})),
        ToolCall::new("c2", "ok", json!({})),
        ToolCall::new("c3", "unregistered", json!({})),
    ]);

    let partial = node.run(state.snapshot(), ctx()).await.unwrap();
    let messages = partial.messages.unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages[0].content.starts_with("error:"));
    assert!(messages[1].content.contains("ok"));
    assert!(messages[2].content.contains("unknown tool"));

    // One error event per failed call, correlated by call id.
    let errors = partial.errors.unwrap();
    assert_eq!(errors.len(), 2);
}

#[tokio::test]
async fn every_call_settles_before_the_node_returns() {
    let registry = ToolRegistry::new().with_tool(Arc::new(DelayedTool {
        name: "slow",
        delay: Duration::from_millis(30),
    }));
    let node = ToolNode::new(registry);

    let calls: Vec<ToolCall> = (0..5)
        .map(|i| ToolCall::new(format!("c{i}"), "slow", json!({"i": i})))
        .collect();
    let state = state_with_calls(calls);

    let partial = node.run(state.snapshot(), ctx()).await.unwrap();
    assert_eq!(partial.messages.unwrap().len(), 5);
}
