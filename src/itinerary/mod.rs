//! Themed travel-route research workflow.
//!
//! The shipped domain graph: search for candidate routes matching a
//! theme, pick one, research each leg's distance through external
//! lookup tools, and accumulate the researched steps until the
//! itinerary is covered.

mod fields;
mod graph;
mod nodes;
mod routing;

pub use fields::{
    FICTIONAL, ITINERARY, REFERENCES, ROUTE, ROUTE_IDEA, STEPS, THEME, Reference, RouteStep,
    Theme, field_policies, initial_state, itinerary_of, references_of, route_of, steps_of,
    theme_of,
};
pub use graph::{route_graph, NODE_FIND_STEP, NODE_PICK_ROUTE, NODE_ROUTE_SEARCH, NODE_ROUTE_TOOL, NODE_STEP_TOOL, NODE_SUMMARIZE};
pub use nodes::{FindStep, PickRoute, RouteSearch, Summarize};
pub use routing::decide_next;
