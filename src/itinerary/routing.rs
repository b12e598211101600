//! Routing policy for the route workflow.

use super::fields::{itinerary_of, steps_of};
use super::graph::{NODE_FIND_STEP, NODE_PICK_ROUTE, NODE_STEP_TOOL};
use crate::state::StateSnapshot;

/// Decide where to go after a summarize step.
///
/// Pending tool calls are always answered first; then the workflow picks
/// a route if none is laid out, researches the next leg while valid
/// steps lag behind the itinerary, and terminates once every leg is
/// covered.
pub fn decide_next(snapshot: StateSnapshot) -> String {
    if snapshot
        .last_message()
        .is_some_and(|m| m.has_pending_tool_calls())
    {
        return NODE_STEP_TOOL.to_string();
    }
    let itinerary = itinerary_of(&snapshot);
    if itinerary.is_empty() {
        return NODE_PICK_ROUTE.to_string();
    }
    let valid_steps = steps_of(&snapshot)
        .iter()
        .filter(|s| s.is_valid())
        .count();
    if valid_steps < itinerary.len() {
        return NODE_FIND_STEP.to_string();
    }
    "End".to_string()
}
