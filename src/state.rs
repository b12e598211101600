//! Versioned workflow state and immutable snapshots.
//!
//! [`VersionedState`] owns the three channels (messages, extras, errors).
//! Nodes never touch it directly: they receive a [`StateSnapshot`] and
//! return a [`NodePartial`](crate::node::NodePartial), which the executor
//! merges through the reducer registry. State therefore evolves only
//! through pure merges, and replaying the same patch sequence always
//! reproduces the same state.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::{
    channels::{Channel, ErrorsChannel, ExtrasChannel, MessagesChannel},
    message::Message,
};

/// The shared state container for one workflow session.
///
/// # Examples
///
/// ```rust
/// use routeloom::state::VersionedState;
/// use serde_json::json;
///
/// let state = VersionedState::builder()
///     .with_user_message("Plan a volcano-themed route")
///     .with_extra("route_idea", json!("Ring of Fire"))
///     .build();
///
/// let snapshot = state.snapshot();
/// assert_eq!(snapshot.messages.len(), 1);
/// assert_eq!(snapshot.extra.get("route_idea"), Some(&json!("Ring of Fire")));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedState {
    /// Conversation log.
    pub messages: MessagesChannel,
    /// Named workflow fields.
    pub extra: ExtrasChannel,
    /// Recoverable error events.
    pub errors: ErrorsChannel,
}

/// Immutable view of the state at a point in time.
///
/// Snapshots are cloned data: nodes and routing predicates can hold them
/// across awaits without observing later merges.
#[derive(Clone, Debug, Default)]
pub struct StateSnapshot {
    pub messages: Vec<Message>,
    pub messages_version: u32,
    pub extra: FxHashMap<String, Value>,
    pub extra_version: u32,
    pub errors: Vec<crate::channels::errors::ErrorEvent>,
    pub errors_version: u32,
}

impl StateSnapshot {
    /// The most recent message, if any. Routing policies key off this.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl VersionedState {
    /// State seeded with a single user message; the common entry point
    /// for a fresh session.
    pub fn new_with_user_message(user_text: &str) -> Self {
        Self {
            messages: MessagesChannel::new(vec![Message::user(user_text)], 1),
            extra: ExtrasChannel::default(),
            errors: ErrorsChannel::default(),
        }
    }

    /// Empty state: no messages, no fields. Used when an invocation is
    /// driven entirely by an initial extras patch.
    pub fn empty() -> Self {
        Self {
            messages: MessagesChannel::default(),
            extra: ExtrasChannel::default(),
            errors: ErrorsChannel::default(),
        }
    }

    pub fn builder() -> VersionedStateBuilder {
        VersionedStateBuilder::default()
    }

    /// Clone the channels into an immutable [`StateSnapshot`].
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            messages: self.messages.snapshot(),
            messages_version: self.messages.version(),
            extra: self.extra.snapshot(),
            extra_version: self.extra.version(),
            errors: self.errors.snapshot(),
            errors_version: self.errors.version(),
        }
    }
}

/// Fluent construction of initial state.
#[derive(Debug, Default)]
pub struct VersionedStateBuilder {
    messages: Vec<Message>,
    extra: FxHashMap<String, Value>,
}

impl VersionedStateBuilder {
    pub fn with_user_message(mut self, content: &str) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    pub fn with_system_message(mut self, content: &str) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> VersionedState {
        VersionedState {
            messages: MessagesChannel::new(self.messages, 1),
            extra: ExtrasChannel::new(self.extra, 1),
            errors: ErrorsChannel::default(),
        }
    }
}
