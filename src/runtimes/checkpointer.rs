//! Checkpoint persistence: trait and the in-memory backend.
//!
//! A [`Checkpoint`] is written by the runner after every successfully
//! merged step and read once at session creation. Per-session isolation:
//! a backend never lets one session observe another's checkpoints.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::runtimes::runner::SessionState;
use crate::state::VersionedState;
use crate::types::NodeKind;

/// Durable record of one session's progress.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    pub session_id: String,
    /// Count of successfully merged steps.
    pub step: u64,
    pub state: VersionedState,
    /// The node the session will execute next.
    pub current: NodeKind,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn from_session(session_id: &str, session: &SessionState) -> Self {
        Self {
            session_id: session_id.to_string(),
            step: session.step,
            state: session.state.clone(),
            current: session.current.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Rebuild in-memory session state from a stored checkpoint.
#[must_use]
pub fn restore_session_state(checkpoint: &Checkpoint) -> SessionState {
    SessionState {
        state: checkpoint.state.clone(),
        step: checkpoint.step,
        current: checkpoint.current.clone(),
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    #[error("failed to persist checkpoint for session {session_id}: {message}")]
    #[diagnostic(code(routeloom::checkpointer::save))]
    Save { session_id: String, message: String },

    #[error("failed to load checkpoint for session {session_id}: {message}")]
    #[diagnostic(code(routeloom::checkpointer::load))]
    Load { session_id: String, message: String },
}

/// Pluggable checkpoint persistence.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Persist the latest checkpoint for its session, replacing any
    /// earlier one.
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError>;

    /// The most recent checkpoint for a session, if any.
    async fn load_latest(&self, session_id: &str)
    -> Result<Option<Checkpoint>, CheckpointerError>;

    /// Ids of every session with a stored checkpoint.
    async fn list_sessions(&self) -> Result<Vec<String>, CheckpointerError>;
}

/// Volatile checkpoint store for tests and development.
///
/// Clones share the underlying map, so one instance can back several
/// runners to simulate resume-after-crash.
#[derive(Clone, Default)]
pub struct InMemoryCheckpointer {
    inner: Arc<RwLock<FxHashMap<String, Checkpoint>>>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        let mut store = self.inner.write().await;
        store.insert(checkpoint.session_id.clone(), checkpoint);
        Ok(())
    }

    async fn load_latest(
        &self,
        session_id: &str,
    ) -> Result<Option<Checkpoint>, CheckpointerError> {
        let store = self.inner.read().await;
        Ok(store.get(session_id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, CheckpointerError> {
        let store = self.inner.read().await;
        Ok(store.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(session: &str, step: u64) -> Checkpoint {
        Checkpoint {
            session_id: session.to_string(),
            step,
            state: VersionedState::new_with_user_message("hi"),
            current: NodeKind::Custom("pick_route".into()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_replaces_earlier_checkpoint() {
        let cp = InMemoryCheckpointer::new();
        cp.save(checkpoint("s1", 1)).await.unwrap();
        cp.save(checkpoint("s1", 2)).await.unwrap();
        let latest = cp.load_latest("s1").await.unwrap().unwrap();
        assert_eq!(latest.step, 2);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let cp = InMemoryCheckpointer::new();
        cp.save(checkpoint("s1", 3)).await.unwrap();
        assert!(cp.load_latest("s2").await.unwrap().is_none());
        let mut sessions = cp.list_sessions().await.unwrap();
        sessions.sort();
        assert_eq!(sessions, vec!["s1"]);
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let cp = InMemoryCheckpointer::new();
        let other = cp.clone();
        cp.save(checkpoint("shared", 5)).await.unwrap();
        assert_eq!(other.load_latest("shared").await.unwrap().unwrap().step, 5);
    }
}
