//! Model client abstraction.
//!
//! Nodes that talk to a language model depend on [`ModelClient`] rather
//! than a concrete provider, so workflows run identically against a real
//! backend or a scripted test double.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::message::{Message, ToolCall};

/// Desired shape of the model's reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free-form assistant text.
    #[default]
    Text,
    /// The reply content must be a single JSON document.
    Json,
}

/// A completed model turn: assistant content, or a batch of tool calls
/// the model wants executed before it can continue.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelResponse {
    Content(String),
    ToolCalls(Vec<ToolCall>),
}

impl ModelResponse {
    /// Render the response as a message appendable to the log.
    #[must_use]
    pub fn into_message(self) -> Message {
        match self {
            ModelResponse::Content(content) => Message::assistant(&content),
            ModelResponse::ToolCalls(calls) => Message::assistant_with_tool_calls("", calls),
        }
    }

    /// The textual content of the reply.
    ///
    /// # Errors
    ///
    /// [`ModelError::MalformedReply`] when the model answered with tool
    /// calls where content was required.
    pub fn into_content(self) -> Result<String, ModelError> {
        match self {
            ModelResponse::Content(content) => Ok(content),
            ModelResponse::ToolCalls(calls) => Err(ModelError::MalformedReply(format!(
                "expected content, got {} tool calls",
                calls.len()
            ))),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    #[diagnostic(code(routeloom::model::request))]
    Request(String),

    #[error("model returned an unusable reply: {0}")]
    #[diagnostic(
        code(routeloom::model::malformed_reply),
        help("Check the requested ResponseFormat against the provider's capabilities.")
    )]
    MalformedReply(String),
}

/// Provider-agnostic chat completion interface.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        format: ResponseFormat,
    ) -> Result<ModelResponse, ModelError>;
}

/// Strip a Markdown code fence from a model reply, if present.
///
/// Providers asked for JSON frequently wrap it in ```json fences; parsing
/// must tolerate both shapes.
#[must_use]
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .split_once('\n')
        .map(|(_, body)| body)
        .unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_json_is_unwrapped() {
        let fenced = "```json\n{\"name\": \"Ring of Fire\"}\n```";
        assert_eq!(strip_code_fence(fenced), "{\"name\": \"Ring of Fire\"}");
        assert_eq!(strip_code_fence("plain"), "plain");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
    }

    #[test]
    fn responses_render_as_messages() {
        let msg = ModelResponse::Content("done".into()).into_message();
        assert_eq!(msg.content, "done");
        assert!(!msg.has_pending_tool_calls());

        let call = ToolCall::new("c1", "distance_search", json!({"from": "a"}));
        let msg = ModelResponse::ToolCalls(vec![call]).into_message();
        assert!(msg.has_pending_tool_calls());
    }

    #[test]
    fn tool_call_replies_are_not_content() {
        assert_eq!(
            ModelResponse::Content("ok".into()).into_content().unwrap(),
            "ok"
        );
        let call = ToolCall::new("c1", "distance_search", json!({}));
        let err = ModelResponse::ToolCalls(vec![call])
            .into_content()
            .unwrap_err();
        assert!(matches!(err, ModelError::MalformedReply(_)));
    }
}
