//! Identifier generation for ephemeral sessions.

use uuid::Uuid;

/// Generates unique, prefixed identifiers.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Session id for an ad-hoc run without a caller-supplied key.
    #[must_use]
    pub fn generate_session_id(&self) -> String {
        format!("session-{}", Uuid::new_v4())
    }
}
