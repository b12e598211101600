//! Wiring of the route workflow graph.

use std::sync::Arc;

use super::fields::field_policies;
use super::nodes::{FindStep, PickRoute, RouteSearch, Summarize};
use super::routing::decide_next;
use crate::app::App;
use crate::graphs::{GraphBuilder, GraphCompileError};
use crate::model::ModelClient;
use crate::runtimes::RuntimeConfig;
use crate::tools::{ToolNode, ToolRegistry};
use crate::types::NodeKind;

pub const NODE_ROUTE_SEARCH: &str = "route_search";
pub const NODE_ROUTE_TOOL: &str = "search_for_route_tool";
pub const NODE_PICK_ROUTE: &str = "pick_route";
pub const NODE_FIND_STEP: &str = "find_step";
pub const NODE_STEP_TOOL: &str = "search_for_step_distances_tool";
pub const NODE_SUMMARIZE: &str = "summarize";

/// Build the full route-research graph.
///
/// Topology: search for candidate routes, answer the search tool calls,
/// pick a route, then loop find-step → distance tools → summarize until
/// the routing policy sees every itinerary leg covered. Two tool nodes
/// share one registry so each sits at a fixed place in the loop.
pub fn route_graph(
    model: Arc<dyn ModelClient>,
    tools: ToolRegistry,
    runtime_config: RuntimeConfig,
) -> Result<App, GraphCompileError> {
    let custom = |name: &str| NodeKind::Custom(name.to_string());

    GraphBuilder::new()
        .add_node(custom(NODE_ROUTE_SEARCH), RouteSearch::new(model.clone()))
        .add_node(custom(NODE_ROUTE_TOOL), ToolNode::new(tools.clone()))
        .add_node(custom(NODE_PICK_ROUTE), PickRoute::new(model.clone()))
        .add_node(custom(NODE_FIND_STEP), FindStep::new(model.clone()))
        .add_node(custom(NODE_STEP_TOOL), ToolNode::new(tools))
        .add_node(custom(NODE_SUMMARIZE), Summarize::new(model))
        .add_edge(NodeKind::Start, custom(NODE_ROUTE_SEARCH))
        .add_edge(custom(NODE_ROUTE_SEARCH), custom(NODE_ROUTE_TOOL))
        .add_edge(custom(NODE_ROUTE_TOOL), custom(NODE_PICK_ROUTE))
        .add_edge(custom(NODE_PICK_ROUTE), custom(NODE_FIND_STEP))
        .add_edge(custom(NODE_FIND_STEP), custom(NODE_STEP_TOOL))
        .add_edge(custom(NODE_STEP_TOOL), custom(NODE_SUMMARIZE))
        .add_conditional_edge(
            custom(NODE_SUMMARIZE),
            vec![
                custom(NODE_STEP_TOOL),
                custom(NODE_PICK_ROUTE),
                custom(NODE_FIND_STEP),
                NodeKind::End,
            ],
            Arc::new(decide_next),
        )
        .with_field_policies(field_policies())
        .with_runtime_config(runtime_config)
        .compile()
}
