//! Conversation messages and tool-call correlation.
//!
//! [`Message`] is the append-only log entry flowing through the message
//! channel: model turns, user input, and tool results. A model turn may
//! carry pending [`ToolCall`] requests; the tool dispatcher answers each
//! with a message whose `tool_call_id` names the originating call, so
//! callers can correlate result *i* with call *i* regardless of
//! completion order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A model-issued request to invoke a named external capability.
///
/// The `id` is stable for the lifetime of the call and is echoed back on
/// the correlated result message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Stable correlation id, unique within the invocation.
    pub id: String,
    /// Registered tool name to resolve in the dispatcher's capability table.
    pub name: String,
    /// JSON arguments passed verbatim to the tool.
    pub arguments: Value,
}

impl ToolCall {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// A message in the workflow conversation log.
///
/// # Examples
///
/// ```
/// use routeloom::message::Message;
///
/// let user = Message::user("Plan a route on the Silk Road");
/// let reply = Message::assistant("Searching for candidate routes...");
/// assert!(user.has_role(Message::USER));
/// assert!(!reply.has_pending_tool_calls());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Role of the sender ("user", "assistant", "system", "tool").
    pub role: String,
    /// Text content. For tool results this is the JSON-encoded payload or
    /// a failure marker.
    pub content: String,
    /// Pending tool calls requested by a model turn. Empty for every
    /// other kind of message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool-result messages: the id of the call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// User input message role.
    pub const USER: &'static str = "user";
    /// Model response message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System instruction message role.
    pub const SYSTEM: &'static str = "system";
    /// Tool result message role.
    pub const TOOL: &'static str = "tool";

    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// An assistant turn that requests tool invocations instead of (or in
    /// addition to) producing content.
    #[must_use]
    pub fn assistant_with_tool_calls(content: &str, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Self::ASSISTANT.to_string(),
            content: content.to_string(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// A tool result correlated to the call that produced it.
    #[must_use]
    pub fn tool_result(call_id: impl Into<String>, content: &str) -> Self {
        Self {
            role: Self::TOOL.to_string(),
            content: content.to_string(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// True when this message carries unanswered tool-call requests.
    #[must_use]
    pub fn has_pending_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
