//! State merge: reducers and the per-channel registry.
//!
//! A [`Reducer`] folds one [`NodePartial`] into [`VersionedState`] for a
//! single channel. The [`ReducerRegistry`] holds the channel→reducer
//! table and is the only code path that mutates state during execution.

mod strategies;

pub use strategies::{FieldPolicies, FieldPolicy, Keep, MergeStrategy, UnknownFieldPolicy};

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::channels::Channel;
use crate::node::NodePartial;
use crate::state::VersionedState;
use crate::types::ChannelType;

/// Folds a node's partial update into the state for one channel.
///
/// Reducers must be pure over `(state, update)`: no I/O, no external
/// mutable captures. Determinism of replay depends on it.
pub trait Reducer: Send + Sync {
    fn apply(&self, state: &mut VersionedState, update: &NodePartial)
    -> Result<(), ReducerError>;
}

#[derive(Debug)]
pub enum ReducerError {
    UnknownChannel(ChannelType),
    /// A patch carried a field with no declared policy while the
    /// registry is configured to reject unknown fields.
    UnknownField(String),
}

impl fmt::Display for ReducerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReducerError::UnknownChannel(channel) => {
                write!(f, "no reducers registered for channel: {channel}")
            }
            ReducerError::UnknownField(name) => {
                write!(f, "patch field has no declared policy: {name}")
            }
        }
    }
}

impl std::error::Error for ReducerError {}

/// Appends messages to the conversation log, optionally trimming the
/// history to the newest `cap` entries (append-then-cap).
pub struct AddMessages {
    cap: Option<usize>,
}

impl AddMessages {
    #[must_use]
    pub fn new(cap: Option<usize>) -> Self {
        Self { cap }
    }
}

impl Reducer for AddMessages {
    fn apply(
        &self,
        state: &mut VersionedState,
        update: &NodePartial,
    ) -> Result<(), ReducerError> {
        let Some(messages) = update.messages.as_ref().filter(|m| !m.is_empty()) else {
            return Ok(());
        };
        let log = state.messages.get_mut();
        log.extend(messages.iter().cloned());
        if let Some(cap) = self.cap
            && log.len() > cap
        {
            log.drain(..log.len() - cap);
        }
        state.messages.bump_version();
        Ok(())
    }
}

/// Appends error events to the errors channel.
pub struct AddErrors;

impl Reducer for AddErrors {
    fn apply(
        &self,
        state: &mut VersionedState,
        update: &NodePartial,
    ) -> Result<(), ReducerError> {
        let Some(errors) = update.errors.as_ref().filter(|e| !e.is_empty()) else {
            return Ok(());
        };
        state.errors.get_mut().extend(errors.iter().cloned());
        state.errors.bump_version();
        Ok(())
    }
}

/// Merges extras fields through their declared [`MergeStrategy`].
///
/// Fields absent from the patch pass through unchanged; a field absent
/// from the current state merges against its declared default. Undeclared
/// patch fields follow the configured [`UnknownFieldPolicy`].
pub struct FieldMerge {
    policies: FieldPolicies,
    unknown: UnknownFieldPolicy,
}

impl FieldMerge {
    #[must_use]
    pub fn new(policies: FieldPolicies, unknown: UnknownFieldPolicy) -> Self {
        Self { policies, unknown }
    }
}

impl Reducer for FieldMerge {
    fn apply(
        &self,
        state: &mut VersionedState,
        update: &NodePartial,
    ) -> Result<(), ReducerError> {
        let Some(patch) = update.extra.as_ref().filter(|m| !m.is_empty()) else {
            return Ok(());
        };
        let mut touched = false;
        for (name, value) in patch {
            let Some(policy) = self.policies.get(name) else {
                match self.unknown {
                    UnknownFieldPolicy::Ignore => {
                        tracing::debug!(field = %name, "ignoring undeclared patch field");
                        continue;
                    }
                    UnknownFieldPolicy::Reject => {
                        return Err(ReducerError::UnknownField(name.clone()));
                    }
                }
            };
            let current = state
                .extra
                .get_mut()
                .get(name)
                .cloned()
                .unwrap_or_else(|| policy.default.clone());
            let next = policy.strategy.merge(Some(&current), value);
            state.extra.get_mut().insert(name.clone(), next);
            touched = true;
        }
        if touched {
            state.extra.bump_version();
        }
        Ok(())
    }
}

/// Channel→reducer table applied at every merge barrier.
#[derive(Clone)]
pub struct ReducerRegistry {
    reducer_map: FxHashMap<ChannelType, Vec<Arc<dyn Reducer>>>,
}

impl ReducerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reducer_map: FxHashMap::default(),
        }
    }

    /// Standard registry: append-then-cap messages, per-field extras
    /// merge, appended errors.
    #[must_use]
    pub fn standard(
        policies: FieldPolicies,
        unknown: UnknownFieldPolicy,
        message_cap: Option<usize>,
    ) -> Self {
        Self::new()
            .with_reducer(ChannelType::Message, Arc::new(AddMessages::new(message_cap)))
            .with_reducer(ChannelType::Extra, Arc::new(FieldMerge::new(policies, unknown)))
            .with_reducer(ChannelType::Error, Arc::new(AddErrors))
    }

    pub fn register(&mut self, channel: ChannelType, reducer: Arc<dyn Reducer>) -> &mut Self {
        self.reducer_map.entry(channel).or_default().push(reducer);
        self
    }

    #[must_use]
    pub fn with_reducer(mut self, channel: ChannelType, reducer: Arc<dyn Reducer>) -> Self {
        self.register(channel, reducer);
        self
    }

    /// Apply every registered reducer to the update. Reducers guard
    /// internally against partials with no data for their channel.
    pub fn apply_all(
        &self,
        state: &mut VersionedState,
        update: &NodePartial,
    ) -> Result<(), ReducerError> {
        for reducers in self.reducer_map.values() {
            for reducer in reducers {
                reducer.apply(state, update)?;
            }
        }
        Ok(())
    }
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        Self::standard(
            FieldPolicies::default(),
            UnknownFieldPolicy::default(),
            None,
        )
    }
}
