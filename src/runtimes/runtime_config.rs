//! Runtime configuration: session keys, recursion bound, persistence.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::state::VersionedState;
use crate::utils::id_generator::IdGenerator;

/// Default number of merged steps before an invocation is aborted.
pub const DEFAULT_RECURSION_LIMIT: u64 = 40;

/// How the runner derives a session id for an invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionKey {
    /// Caller-supplied id; resuming requires passing the same id again.
    Explicit(String),
    /// Deterministic hash of the initial state: invoking twice with the
    /// same input resumes the same session.
    Derived,
    /// Fresh random id per invocation; never resumes.
    Ephemeral,
}

impl SessionKey {
    /// Resolve a concrete session id for the given initial state.
    #[must_use]
    pub fn resolve(&self, initial_state: &VersionedState) -> String {
        match self {
            SessionKey::Explicit(id) => id.clone(),
            SessionKey::Derived => {
                let snapshot = initial_state.snapshot();
                let mut hasher = FxHasher::default();
                for message in &snapshot.messages {
                    message.role.hash(&mut hasher);
                    message.content.hash(&mut hasher);
                }
                // Map iteration order is unspecified; sort for determinism.
                let mut keys: Vec<_> = snapshot.extra.iter().collect();
                keys.sort_by(|a, b| a.0.cmp(b.0));
                for (key, value) in keys {
                    key.hash(&mut hasher);
                    value.to_string().hash(&mut hasher);
                }
                format!("derived-{:016x}", hasher.finish())
            }
            SessionKey::Ephemeral => IdGenerator::new().generate_session_id(),
        }
    }
}

/// Persistence backend selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckpointerType {
    #[default]
    InMemory,
}

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub session_key: SessionKey,
    /// Merged-step bound; the run fails once `steps == recursion_limit`
    /// with the last good checkpoint retained.
    pub recursion_limit: u64,
    pub checkpointer: CheckpointerType,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            session_key: SessionKey::Derived,
            recursion_limit: Self::resolve_recursion_limit(None),
            checkpointer: CheckpointerType::InMemory,
        }
    }
}

impl RuntimeConfig {
    fn resolve_recursion_limit(provided: Option<u64>) -> u64 {
        if let Some(limit) = provided {
            return limit;
        }
        dotenvy::dotenv().ok();
        std::env::var("ROUTELOOM_RECURSION_LIMIT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_RECURSION_LIMIT)
    }

    pub fn new(
        session_key: SessionKey,
        recursion_limit: Option<u64>,
        checkpointer: CheckpointerType,
    ) -> Self {
        Self {
            session_key,
            recursion_limit: Self::resolve_recursion_limit(recursion_limit),
            checkpointer,
        }
    }

    #[must_use]
    pub fn with_session_key(mut self, session_key: SessionKey) -> Self {
        self.session_key = session_key;
        self
    }

    #[must_use]
    pub fn with_recursion_limit(mut self, limit: u64) -> Self {
        self.recursion_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_keys_are_stable_for_identical_input() {
        let a = VersionedState::new_with_user_message("volcano route");
        let b = VersionedState::new_with_user_message("volcano route");
        let key = SessionKey::Derived;
        assert_eq!(key.resolve(&a), key.resolve(&b));

        let c = VersionedState::new_with_user_message("coastal route");
        assert_ne!(key.resolve(&a), key.resolve(&c));
    }

    #[test]
    fn explicit_key_passes_through() {
        let state = VersionedState::empty();
        assert_eq!(
            SessionKey::Explicit("trip-7".into()).resolve(&state),
            "trip-7"
        );
    }
}
