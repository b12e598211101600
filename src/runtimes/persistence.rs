/*!
Persistence primitives for serializing checkpoints.

Explicit serde-friendly structs decoupled from the in-memory
representations, with conversion logic localized in From / TryFrom impls
so durable checkpointer backends stay lean and declarative. Unknown
NodeKind encodings round-trip as `NodeKind::Custom(encoded_string)` for
forward compatibility. No I/O happens here.
*/

use chrono::Utc;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    channels::{Channel, ErrorsChannel, ExtrasChannel, MessagesChannel},
    channels::errors::ErrorEvent,
    message::Message,
    runtimes::checkpointer::Checkpoint,
    state::VersionedState,
    types::NodeKind,
};

/// Channel holding a vector collection with version metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedVecChannel<T> {
    pub version: u32,
    #[serde(default)]
    pub items: Vec<T>,
}

impl<T> Default for PersistedVecChannel<T> {
    fn default() -> Self {
        Self {
            version: 1,
            items: Vec::new(),
        }
    }
}

/// Channel holding a map collection with version metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedMapChannel<V> {
    pub version: u32,
    #[serde(default)]
    pub map: FxHashMap<String, V>,
}

impl<V> Default for PersistedMapChannel<V> {
    fn default() -> Self {
        Self {
            version: 1,
            map: FxHashMap::default(),
        }
    }
}

/// Complete persisted shape of the in-memory [`VersionedState`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PersistedState {
    pub messages: PersistedVecChannel<Message>,
    pub extra: PersistedMapChannel<Value>,
    #[serde(default)]
    pub errors: PersistedVecChannel<ErrorEvent>,
}

/// Full persisted checkpoint representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedCheckpoint {
    pub session_id: String,
    pub step: u64,
    pub state: PersistedState,
    /// Next node encoded via `NodeKind::encode()`.
    pub current: String,
    /// RFC3339 creation time (keeps chrono types out of the wire shape).
    pub created_at: String,
}

#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("missing field: {0}")]
    #[diagnostic(
        code(routeloom::persistence::missing_field),
        help("Populate the field in the persisted JSON before conversion.")
    )]
    MissingField(&'static str),

    #[error("JSON serialization/deserialization failed: {source}")]
    #[diagnostic(
        code(routeloom::persistence::serde),
        help("Ensure the JSON structure matches the Persisted* types.")
    )]
    Serde {
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

impl From<&VersionedState> for PersistedState {
    fn from(s: &VersionedState) -> Self {
        PersistedState {
            messages: PersistedVecChannel {
                version: s.messages.version(),
                items: s.messages.snapshot(),
            },
            extra: PersistedMapChannel {
                version: s.extra.version(),
                map: s.extra.snapshot(),
            },
            errors: PersistedVecChannel {
                version: s.errors.version(),
                items: s.errors.snapshot(),
            },
        }
    }
}

impl From<PersistedState> for VersionedState {
    fn from(p: PersistedState) -> Self {
        VersionedState {
            messages: MessagesChannel::new(p.messages.items, p.messages.version),
            extra: ExtrasChannel::new(p.extra.map, p.extra.version),
            errors: ErrorsChannel::new(p.errors.items, p.errors.version),
        }
    }
}

impl From<&Checkpoint> for PersistedCheckpoint {
    fn from(cp: &Checkpoint) -> Self {
        PersistedCheckpoint {
            session_id: cp.session_id.clone(),
            step: cp.step,
            state: PersistedState::from(&cp.state),
            current: cp.current.encode(),
            created_at: cp.created_at.to_rfc3339(),
        }
    }
}

impl From<PersistedCheckpoint> for Checkpoint {
    fn from(p: PersistedCheckpoint) -> Self {
        let parsed_dt = chrono::DateTime::parse_from_rfc3339(&p.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Checkpoint {
            session_id: p.session_id,
            step: p.step,
            state: VersionedState::from(p.state),
            current: NodeKind::decode(&p.current),
            created_at: parsed_dt,
        }
    }
}

impl PersistedCheckpoint {
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|source| PersistenceError::Serde { source })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|source| PersistenceError::Serde { source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn checkpoint_roundtrips_through_json() {
        let mut state = VersionedState::new_with_user_message("plan a route");
        state
            .extra
            .get_mut()
            .insert("route_idea".into(), json!("Ring of Fire"));
        state.extra.bump_version();

        let cp = Checkpoint {
            session_id: "s1".into(),
            step: 4,
            state,
            current: NodeKind::Custom("find_step".into()),
            created_at: Utc::now(),
        };

        let persisted = PersistedCheckpoint::from(&cp);
        let json = persisted.to_json_string().unwrap();
        let back = Checkpoint::from(PersistedCheckpoint::from_json_str(&json).unwrap());

        assert_eq!(back.session_id, "s1");
        assert_eq!(back.step, 4);
        assert_eq!(back.current, NodeKind::Custom("find_step".into()));
        assert_eq!(back.state.extra.version(), 2);
        assert_eq!(
            back.state.snapshot().extra.get("route_idea"),
            Some(&json!("Ring of Fire"))
        );
    }

    #[test]
    fn unknown_current_encoding_degrades_to_custom() {
        let persisted = PersistedCheckpoint {
            session_id: "s".into(),
            step: 0,
            state: PersistedState::default(),
            current: "legacy".into(),
            created_at: "not-a-date".into(),
        };
        let cp = Checkpoint::from(persisted);
        assert_eq!(cp.current, NodeKind::Custom("legacy".into()));
    }
}
