//! Workflow runtime: session management and checkpointed execution.
//!
//! - [`AppRunner`]: sequential step loop with per-session isolation
//! - [`Checkpointer`]: pluggable state persistence ([`InMemoryCheckpointer`] ships)
//! - [`RuntimeConfig`]: session-key policy, recursion bound, backend choice
//! - Persistence models: serde shapes for durable backends
//!
//! # Usage
//!
//! ```rust,no_run
//! use routeloom::runtimes::AppRunner;
//! use routeloom::state::VersionedState;
//! # use routeloom::app::App;
//! # async fn example(app: App) -> Result<(), Box<dyn std::error::Error>> {
//! let mut runner = AppRunner::new(app).await;
//! runner
//!     .create_session("trip-1".to_string(), VersionedState::new_with_user_message("Hello"))
//!     .await?;
//! let final_state = runner.run_until_complete("trip-1").await?;
//! # Ok(())
//! # }
//! ```

pub mod checkpointer;
pub mod persistence;
pub mod runner;
pub mod runtime_config;

pub use checkpointer::{
    Checkpoint, Checkpointer, CheckpointerError, InMemoryCheckpointer, restore_session_state,
};
pub use persistence::{
    PersistedCheckpoint, PersistedMapChannel, PersistedState, PersistedVecChannel,
    PersistenceError,
};
pub use runner::{AppRunner, RunnerError, SessionInit, SessionState, StepReport};
pub use runtime_config::{
    CheckpointerType, DEFAULT_RECURSION_LIMIT, RuntimeConfig, SessionKey,
};
