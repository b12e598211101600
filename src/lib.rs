//! # Routeloom: Workflow Engine for Themed Travel-Route Research
//!
//! Routeloom executes declarative workflow graphs of asynchronous steps
//! over a versioned, reducer-merged shared state, with conditional
//! routing, batched tool-call dispatch, recursion bounding, and
//! per-session checkpointed resumability. It ships a complete domain
//! graph ([`itinerary`]) that researches themed travel routes by
//! chaining model calls and external lookup tools.
//!
//! ## Core Concepts
//!
//! - **Nodes**: async units of work over immutable state snapshots,
//!   returning partial updates
//! - **State**: versioned channels (messages / extras / errors) mutated
//!   only by declared merge strategies
//! - **Graph**: declarative topology with validated conditional edges
//! - **Runner**: sequential per-session step loop, checkpointing after
//!   every merged step
//!
//! ## Quick Start
//!
//! ```
//! use routeloom::{
//!     graphs::GraphBuilder,
//!     message::Message,
//!     node::{Node, NodeContext, NodeError, NodePartial},
//!     state::{StateSnapshot, VersionedState},
//!     types::NodeKind,
//! };
//! use async_trait::async_trait;
//!
//! struct Greeting;
//!
//! #[async_trait]
//! impl Node for Greeting {
//!     async fn run(
//!         &self,
//!         _snapshot: StateSnapshot,
//!         _ctx: NodeContext,
//!     ) -> Result<NodePartial, NodeError> {
//!         Ok(NodePartial::new().with_messages(vec![Message::assistant("Hello!")]))
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = GraphBuilder::new()
//!     .add_node(NodeKind::Custom("greeting".into()), Greeting)
//!     .add_edge(NodeKind::Start, NodeKind::Custom("greeting".into()))
//!     .add_edge(NodeKind::Custom("greeting".into()), NodeKind::End)
//!     .compile()?;
//!
//! let final_state = app
//!     .invoke(VersionedState::new_with_user_message("hi"))
//!     .await?;
//! assert_eq!(final_state.snapshot().messages.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`message`] - Conversation messages and tool-call correlation
//! - [`state`] - Versioned state and snapshots
//! - [`channels`] - Channel storage and error events
//! - [`reducers`] - Merge strategies and the per-field policy registry
//! - [`node`] - Node trait and execution primitives
//! - [`graphs`] - Graph definition and compile-time validation
//! - [`app`] - Compiled application and merge barrier
//! - [`runtimes`] - Session runner, checkpointing, persistence models
//! - [`tools`] - Tool capability trait and batched dispatch
//! - [`model`] - Model client abstraction
//! - [`itinerary`] - The shipped route-research workflow

pub mod app;
pub mod channels;
pub mod graphs;
pub mod itinerary;
pub mod message;
pub mod model;
pub mod node;
pub mod reducers;
pub mod runtimes;
pub mod state;
pub mod telemetry;
pub mod tools;
pub mod types;
pub mod utils;
