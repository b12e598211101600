//! Core identifier types for the routeloom workflow engine.
//!
//! [`NodeKind`] names the vertices of a workflow graph; [`ChannelType`]
//! names the state channels that reducers operate on. Runtime-only types
//! (session keys, step counters) live in [`crate::runtimes`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within a workflow graph.
///
/// `Start` and `End` are virtual endpoints: they are never registered as
/// executable nodes. `End` doubles as the terminal routing sentinel; a
/// conditional edge that resolves to `End` finishes the invocation.
///
/// # Examples
///
/// ```rust
/// use routeloom::types::NodeKind;
///
/// let pick = NodeKind::Custom("pick_route".to_string());
/// assert_eq!(pick.encode(), "Custom:pick_route");
/// assert_eq!(NodeKind::decode("Custom:pick_route"), pick);
/// assert!(NodeKind::End.is_end());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Virtual entry point; the edge out of `Start` selects the first
    /// executable node of every invocation.
    Start,
    /// Virtual terminal sentinel; routing to `End` completes the run.
    End,
    /// Executable node identified by a user-defined name.
    Custom(String),
}

impl NodeKind {
    /// Encode into the persisted string form (`"Start"`, `"End"`,
    /// `"Custom:<name>"`).
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            NodeKind::Start => "Start".to_string(),
            NodeKind::End => "End".to_string(),
            NodeKind::Custom(s) => format!("Custom:{s}"),
        }
    }

    /// Decode a persisted string form. Unrecognized formats fall back to
    /// `Custom(s)` so old checkpoints keep loading.
    pub fn decode(s: &str) -> Self {
        if s == "Start" {
            NodeKind::Start
        } else if s == "End" {
            NodeKind::End
        } else if let Some(rest) = s.strip_prefix("Custom:") {
            NodeKind::Custom(rest.to_string())
        } else {
            NodeKind::Custom(s.to_string())
        }
    }

    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::End => write!(f, "End"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

// Allow string literals where a NodeKind is expected ("End" and "Start"
// resolve to the virtual endpoints).
impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s {
            "Start" => NodeKind::Start,
            "End" => NodeKind::End,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

/// Identifies a state channel. Each channel has its own reducers and
/// version counter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    /// Conversation log: model turns and tool results.
    Message,
    /// Non-fatal error events collected as data.
    Error,
    /// Named workflow fields (route, itinerary, steps, ...) merged
    /// per-field through declared strategies.
    Extra,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => write!(f, "message"),
            Self::Error => write!(f, "error"),
            Self::Extra => write!(f, "extra"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        for kind in [
            NodeKind::Start,
            NodeKind::End,
            NodeKind::Custom("summarize".into()),
        ] {
            assert_eq!(NodeKind::decode(&kind.encode()), kind);
        }
    }

    #[test]
    fn unknown_encoding_becomes_custom() {
        assert_eq!(
            NodeKind::decode("legacy_node"),
            NodeKind::Custom("legacy_node".into())
        );
    }

    #[test]
    fn from_str_resolves_virtual_endpoints() {
        assert_eq!(NodeKind::from("End"), NodeKind::End);
        assert_eq!(NodeKind::from("Start"), NodeKind::Start);
        assert_eq!(
            NodeKind::from("find_step"),
            NodeKind::Custom("find_step".into())
        );
    }
}
