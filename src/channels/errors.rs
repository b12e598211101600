//! Error events collected as state, not raised as control flow.
//!
//! Individual tool-call failures (and any other recoverable problem a
//! node wants to surface) are recorded on the errors channel so
//! downstream model-facing nodes can reason about partial failure. Only
//! graph- and node-level errors abort an invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an error event originated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ErrorScope {
    /// Raised inside a node's transform at the given step.
    Node { node: String, step: u64 },
    /// Raised by the runner while driving a session.
    Runner { session: String, step: u64 },
    /// A single tool call failed during batched dispatch.
    Tool { call_id: String, tool: String },
    /// Anything without a more specific home.
    App,
}

impl Default for ErrorScope {
    fn default() -> Self {
        ErrorScope::App
    }
}

/// Message plus optional structured details.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub message: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl ErrorDetails {
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }
}

/// A recoverable error recorded in the errors channel.
///
/// # Examples
///
/// ```
/// use routeloom::channels::errors::{ErrorDetails, ErrorEvent};
///
/// let event = ErrorEvent::tool("call-3", "distance_search",
///     ErrorDetails::msg("upstream timed out"))
///     .with_tag("transient");
/// assert_eq!(event.tags, vec!["transient"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    #[serde(default = "Utc::now")]
    pub when: DateTime<Utc>,
    #[serde(default)]
    pub scope: ErrorScope,
    #[serde(default)]
    pub error: ErrorDetails,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for ErrorEvent {
    fn default() -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::default(),
            error: ErrorDetails::default(),
            tags: Vec::new(),
        }
    }
}

impl ErrorEvent {
    /// A node-scoped error event.
    pub fn node(node: impl Into<String>, step: u64, error: ErrorDetails) -> Self {
        Self {
            scope: ErrorScope::Node {
                node: node.into(),
                step,
            },
            error,
            ..Default::default()
        }
    }

    /// A runner-scoped error event.
    pub fn runner(session: impl Into<String>, step: u64, error: ErrorDetails) -> Self {
        Self {
            scope: ErrorScope::Runner {
                session: session.into(),
                step,
            },
            error,
            ..Default::default()
        }
    }

    /// A tool-scoped error event, correlated to the failing call.
    pub fn tool(
        call_id: impl Into<String>,
        tool: impl Into<String>,
        error: ErrorDetails,
    ) -> Self {
        Self {
            scope: ErrorScope::Tool {
                call_id: call_id.into(),
                tool: tool.into(),
            },
            error,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}
