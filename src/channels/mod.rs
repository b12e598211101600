//! Versioned state channels.
//!
//! Every piece of shared workflow state lives in a channel: a payload
//! plus a monotonically increasing version counter. Reducers are the only
//! writers; they mutate the payload and bump the version once per barrier
//! so checkpoints and tests can detect change without diffing payloads.

pub mod errors;

pub use errors::{ErrorDetails, ErrorEvent, ErrorScope};

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::message::Message;

/// Common surface shared by all channels.
pub trait Channel {
    type Payload: Clone;

    /// Cloned point-in-time copy of the payload.
    fn snapshot(&self) -> Self::Payload;

    /// Current version counter. Starts at 1 and only ever increases.
    fn version(&self) -> u32;

    /// Mark the payload as changed. Called once per applied reduction.
    fn bump_version(&mut self);
}

macro_rules! channel_impl {
    ($name:ident, $payload:ty) => {
        impl $name {
            #[must_use]
            pub fn new(payload: $payload, version: u32) -> Self {
                Self { payload, version }
            }

            /// Mutable access to the payload for reducers and state
            /// construction. Does not bump the version.
            pub fn get_mut(&mut self) -> &mut $payload {
                &mut self.payload
            }

            #[must_use]
            pub fn len(&self) -> usize {
                self.payload.len()
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.payload.is_empty()
            }
        }

        impl Channel for $name {
            type Payload = $payload;

            fn snapshot(&self) -> $payload {
                self.payload.clone()
            }

            fn version(&self) -> u32 {
                self.version
            }

            fn bump_version(&mut self) {
                self.version += 1;
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    payload: Default::default(),
                    version: 1,
                }
            }
        }
    };
}

/// Conversation log channel. Reduction strategy: append, optionally
/// capped to a trimmed history window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessagesChannel {
    payload: Vec<Message>,
    version: u32,
}

channel_impl!(MessagesChannel, Vec<Message>);

/// Named workflow fields channel. Reduction is per-field via declared
/// merge strategies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtrasChannel {
    payload: FxHashMap<String, Value>,
    version: u32,
}

channel_impl!(ExtrasChannel, FxHashMap<String, Value>);

/// Error event channel. Reduction strategy: append.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorsChannel {
    payload: Vec<ErrorEvent>,
    version: u32,
}

channel_impl!(ErrorsChannel, Vec<ErrorEvent>);
