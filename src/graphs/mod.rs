//! Graph construction: builder, edges, and compilation into an [`App`].
//!
//! [`App`]: crate::app::App

mod builder;
mod compilation;
mod edges;

pub use builder::GraphBuilder;
pub use compilation::GraphCompileError;
pub use edges::{ConditionalEdge, EdgePredicate};
