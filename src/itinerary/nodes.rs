//! Model-facing nodes of the route workflow.
//!
//! Every node is a thin prompt-and-parse layer over [`ModelClient`]; the
//! graph owns sequencing, and tool execution happens in the shared
//! [`ToolNode`](crate::tools::ToolNode).

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::fields::{
    self, ITINERARY, REFERENCES, ROUTE, Reference, RouteStep, STEPS, Theme,
};
use crate::model::{ModelClient, ModelError, ModelResponse, ResponseFormat, strip_code_fence};
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;
use crate::utils::collections::{new_extra_map, new_extra_map_with_capacity};

fn background(theme: &Theme, snapshot: &StateSnapshot) -> String {
    let research: String = snapshot
        .messages
        .iter()
        .map(|m| format!("{}: {}\n", m.role, m.content))
        .collect();
    format!(
        "You are a researcher whose job is to find the itineraries for famous routes, \
         fiction or non-fiction, with an emphasis on places people would love to go but \
         might not know about. Routes are tailored to a theme. The theme for this route \
         is \"{}\": {}.\n\nHere is all the research so far.\n~~~\n{}~~~",
        theme.name, theme.description, research
    )
}

fn provider_error(source: ModelError) -> NodeError {
    NodeError::Provider {
        provider: "model",
        message: source.to_string(),
    }
}

fn missing_theme() -> NodeError {
    NodeError::MissingInput { what: "theme" }
}

/// Searches for candidate routes matching the theme.
///
/// When the model's reply already names the caller's route idea, the
/// idea is promoted directly to the chosen route; otherwise the reply
/// (possibly carrying tool calls) joins the research log.
pub struct RouteSearch {
    model: Arc<dyn ModelClient>,
}

impl RouteSearch {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Node for RouteSearch {
    #[instrument(skip(self, snapshot, ctx), fields(step = ctx.step))]
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let theme = fields::theme_of(&snapshot).ok_or_else(missing_theme)?;
        let route_idea = snapshot
            .extra
            .get(fields::ROUTE_IDEA)
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();

        let prompt = format!(
            "{}\n\nIf we already have a route idea, search for more information on it; \
             otherwise determine the route that fits this theme. Route idea: \"{}\".",
            background(&theme, &snapshot),
            route_idea
        );
        let mut messages = snapshot.messages.clone();
        messages.push(Message::system(&prompt));

        let response = self
            .model
            .complete(&messages, ResponseFormat::Text)
            .await
            .map_err(provider_error)?;

        if let ModelResponse::Content(content) = &response
            && !route_idea.is_empty()
            && content.to_lowercase().contains(&route_idea.to_lowercase())
        {
            ctx.emit("route_search", "route idea confirmed as route");
            let mut extra = new_extra_map();
            extra.insert(ROUTE.into(), json!(route_idea));
            return Ok(NodePartial::new().with_extra(extra));
        }

        Ok(NodePartial::new().with_messages(vec![response.into_message()]))
    }
}

/// Structured reply expected from the route-picking turn.
#[derive(Debug, Deserialize)]
struct PickedRoute {
    route: String,
    #[serde(default)]
    references: Vec<Reference>,
    /// Leg descriptions, each starting where the previous ended.
    itinerary: Vec<String>,
}

/// Picks one route from the search results and lays out its itinerary.
pub struct PickRoute {
    model: Arc<dyn ModelClient>,
}

impl PickRoute {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Node for PickRoute {
    #[instrument(skip(self, snapshot, ctx), fields(step = ctx.step))]
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let theme = fields::theme_of(&snapshot).ok_or_else(missing_theme)?;
        let prompt = format!(
            "{}\n\nCreate a route from the research. The route name should be terse and \
             make no reference to the theme; use a well-known route name when one exists, \
             otherwise name the start and end. Every itinerary step must be a single \
             place, at least 5 steps. Reply with a JSON object: \
             {{\"route\": string, \"references\": [{{\"name\": string, \"link\": string}}], \
             \"itinerary\": [string]}}.",
            background(&theme, &snapshot)
        );
        let mut messages = snapshot.messages.clone();
        messages.push(Message::system(&prompt));

        let content = self
            .model
            .complete(&messages, ResponseFormat::Json)
            .await
            .and_then(ModelResponse::into_content)
            .map_err(provider_error)?;
        let picked: PickedRoute = serde_json::from_str(strip_code_fence(&content))?;
        ctx.emit("pick_route", format!("picked route: {}", picked.route));

        let mut extra = new_extra_map_with_capacity(3);
        extra.insert(ROUTE.into(), json!(picked.route));
        extra.insert(REFERENCES.into(), json!(picked.references));
        extra.insert(ITINERARY.into(), json!(picked.itinerary));
        Ok(NodePartial::new().with_extra(extra))
    }
}

/// Researches the next leg of the route, usually by requesting distance
/// lookups from the tools.
pub struct FindStep {
    model: Arc<dyn ModelClient>,
}

impl FindStep {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Node for FindStep {
    #[instrument(skip(self, snapshot, ctx), fields(step = ctx.step))]
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let theme = fields::theme_of(&snapshot).ok_or_else(missing_theme)?;
        let route = fields::route_of(&snapshot);
        let itinerary = fields::itinerary_of(&snapshot);
        let steps = fields::steps_of(&snapshot);

        let prompt = format!(
            "{}\n\nThis is your itinerary for the route \"{route}\":\n{}\n\nSo far you \
             have {} researched steps:\n{}\nAdd more steps to complete the route. Find \
             the distance on foot to the next step if possible, by car, train or boat \
             otherwise. The distance must be in kilometers.",
            background(&theme, &snapshot),
            itinerary.join("\n"),
            steps.len(),
            steps
                .iter()
                .map(|s| format!("{} ({} km)\n", s.name, s.distance))
                .collect::<String>(),
        );
        let mut messages = snapshot.messages.clone();
        messages.push(Message::system(&prompt));

        let response = self
            .model
            .complete(&messages, ResponseFormat::Text)
            .await
            .map_err(provider_error)?;
        ctx.emit("find_step", "requested next-leg research");
        Ok(NodePartial::new().with_messages(vec![response.into_message()]))
    }
}

/// Distills the latest research into the next [`RouteStep`].
pub struct Summarize {
    model: Arc<dyn ModelClient>,
}

impl Summarize {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Node for Summarize {
    #[instrument(skip(self, snapshot, ctx), fields(step = ctx.step))]
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let theme = fields::theme_of(&snapshot).ok_or_else(missing_theme)?;
        let route = fields::route_of(&snapshot);
        let itinerary = fields::itinerary_of(&snapshot);
        let steps = fields::steps_of(&snapshot);

        // The next uncovered leg, by position; a distance of -1 means
        // the distance is unknown.
        let next_leg = itinerary.get(steps.len()).cloned().unwrap_or_default();
        let next_information = if next_leg.is_empty() {
            String::new()
        } else {
            format!("We need to find {next_leg}.")
        };

        let prompt = format!(
            "{}\n\nThe chosen route is \"{route}\". The itinerary:\n{}\nResearched steps \
             so far:\n{}\n{next_information}\nBased on the most recent information, add \
             the next step with its distance in kilometers; make an educated guess if \
             the research is inconclusive. Reply with a JSON object: \
             {{\"name\": string, \"distance\": number}}.",
            background(&theme, &snapshot),
            itinerary.join("\n"),
            steps
                .iter()
                .map(|s| format!("{} ({} km)\n", s.name, s.distance))
                .collect::<String>(),
        );
        let mut messages = snapshot.messages.clone();
        messages.push(Message::system(&prompt));

        let content = self
            .model
            .complete(&messages, ResponseFormat::Json)
            .await
            .and_then(ModelResponse::into_content)
            .map_err(provider_error)?;
        let step: RouteStep = serde_json::from_str(strip_code_fence(&content))?;
        ctx.emit("summarize", format!("found step: {}", step.name));

        // STEPS uses the append strategy, so only the new step is emitted.
        let mut extra = new_extra_map();
        extra.insert(STEPS.into(), json!([step]));
        Ok(NodePartial::new().with_extra(extra))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCall;

    struct Scripted(ModelResponse);

    #[async_trait]
    impl ModelClient for Scripted {
        async fn complete(
            &self,
            _messages: &[Message],
            _format: ResponseFormat,
        ) -> Result<ModelResponse, ModelError> {
            Ok(self.0.clone())
        }
    }

    fn ctx() -> NodeContext {
        NodeContext {
            node_id: "test".into(),
            step: 1,
            session_id: "s".into(),
        }
    }

    fn themed_snapshot() -> StateSnapshot {
        fields::initial_state(
            &Theme {
                name: "Winter Wonderland".into(),
                description: "A snowy landscape...".into(),
            },
            Some("The Silk Road"),
            false,
        )
        .snapshot()
    }

    #[tokio::test]
    async fn route_search_promotes_confirmed_idea() {
        let node = RouteSearch::new(Arc::new(Scripted(ModelResponse::Content(
            "The silk road is a famous route from China to Europe.".into(),
        ))));
        let partial = node.run(themed_snapshot(), ctx()).await.unwrap();
        let extra = partial.extra.unwrap();
        assert_eq!(extra.get(ROUTE), Some(&json!("The Silk Road")));
        assert!(partial.messages.is_none());
    }

    #[tokio::test]
    async fn route_search_appends_tool_call_turns() {
        let call = ToolCall::new("c1", "popular_route_search", json!({"query": "winter"}));
        let node = RouteSearch::new(Arc::new(Scripted(ModelResponse::ToolCalls(vec![call]))));
        let partial = node.run(themed_snapshot(), ctx()).await.unwrap();
        let messages = partial.messages.unwrap();
        assert!(messages[0].has_pending_tool_calls());
    }

    #[tokio::test]
    async fn pick_route_parses_fenced_json() {
        let reply = "```json\n{\"route\": \"The Silk Road\", \"references\": [], \
                     \"itinerary\": [\"Xi'an -> Samarkand\"]}\n```";
        let node = PickRoute::new(Arc::new(Scripted(ModelResponse::Content(reply.into()))));
        let partial = node.run(themed_snapshot(), ctx()).await.unwrap();
        let extra = partial.extra.unwrap();
        assert_eq!(extra.get(ROUTE), Some(&json!("The Silk Road")));
        assert_eq!(
            extra.get(ITINERARY),
            Some(&json!(["Xi'an -> Samarkand"]))
        );
    }

    #[tokio::test]
    async fn pick_route_rejects_tool_call_replies() {
        let call = ToolCall::new("c1", "popular_route_search", json!({}));
        let node = PickRoute::new(Arc::new(Scripted(ModelResponse::ToolCalls(vec![call]))));
        let err = node.run(themed_snapshot(), ctx()).await.unwrap_err();
        assert!(matches!(err, NodeError::Provider { provider: "model", .. }));
    }

    #[tokio::test]
    async fn summarize_emits_single_new_step() {
        let node = Summarize::new(Arc::new(Scripted(ModelResponse::Content(
            "{\"name\": \"Samarkand\", \"distance\": 1100.5}".into(),
        ))));
        let partial = node.run(themed_snapshot(), ctx()).await.unwrap();
        let extra = partial.extra.unwrap();
        assert_eq!(
            extra.get(STEPS),
            Some(&json!([{"name": "Samarkand", "distance": 1100.5}]))
        );
    }

    #[tokio::test]
    async fn nodes_require_a_theme() {
        let node = FindStep::new(Arc::new(Scripted(ModelResponse::Content("x".into()))));
        let err = node
            .run(crate::state::VersionedState::empty().snapshot(), ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::MissingInput { what: "theme" }));
    }
}
