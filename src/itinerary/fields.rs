//! Typed domain state: field names, merge policies, and accessors.
//!
//! The extras channel is stringly keyed; this module is the single place
//! that knows which fields the route workflow uses and how each one
//! merges.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::reducers::{FieldPolicies, FieldPolicy, Keep, MergeStrategy};
use crate::state::{StateSnapshot, VersionedState};

/// Caller-provided theme steering the research.
pub const THEME: &str = "theme";
/// Optional route idea seeding the search.
pub const ROUTE_IDEA: &str = "route_idea";
/// Whether fictional routes are acceptable.
pub const FICTIONAL: &str = "fictional";
/// Chosen route name.
pub const ROUTE: &str = "route";
/// Sources consulted while picking the route.
pub const REFERENCES: &str = "references";
/// Ordered leg descriptions ("A -> B") of the chosen route.
pub const ITINERARY: &str = "itinerary";
/// Researched steps with distances, one per covered leg.
pub const STEPS: &str = "steps";

/// A route theme: the tailored experience the research is steered by.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub description: String,
}

/// A researched leg of the route. Distance is in kilometers; `-1.0`
/// marks an unknown distance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub name: String,
    pub distance: f64,
}

impl RouteStep {
    /// A step counts toward the itinerary only when it is named and its
    /// distance was actually resolved.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && self.distance.is_finite()
    }
}

/// A source consulted during route selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub link: String,
}

/// Merge policies for every field the route workflow writes.
///
/// Researched steps accumulate (each summarize step appends one), and
/// references dedupe by name keeping the newest link; everything else
/// is last-write-wins.
#[must_use]
pub fn field_policies() -> FieldPolicies {
    FieldPolicies::new()
        .with_field(THEME, FieldPolicy::overwrite(Value::Null))
        .with_field(ROUTE_IDEA, FieldPolicy::overwrite(json!("")))
        .with_field(FICTIONAL, FieldPolicy::overwrite(json!(false)))
        .with_field(ROUTE, FieldPolicy::overwrite(json!("")))
        .with_field(ITINERARY, FieldPolicy::overwrite(json!([])))
        .with_field(STEPS, FieldPolicy::new(json!([]), MergeStrategy::Append))
        .with_field(
            REFERENCES,
            FieldPolicy::new(
                json!([]),
                MergeStrategy::AppendDedupeByKey {
                    key: "name".into(),
                    keep: Keep::Last,
                },
            ),
        )
}

/// Seed state for a route invocation.
pub fn initial_state(theme: &Theme, route_idea: Option<&str>, fictional: bool) -> VersionedState {
    let mut builder = VersionedState::builder()
        .with_user_message(&format!(
            "Research a themed travel route for the theme \"{}\".",
            theme.name
        ))
        .with_extra(THEME, json!(theme))
        .with_extra(FICTIONAL, json!(fictional));
    if let Some(idea) = route_idea {
        builder = builder.with_extra(ROUTE_IDEA, json!(idea));
    }
    builder.build()
}

pub fn theme_of(snapshot: &StateSnapshot) -> Option<Theme> {
    snapshot
        .extra
        .get(THEME)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

pub fn route_of(snapshot: &StateSnapshot) -> String {
    snapshot
        .extra
        .get(ROUTE)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub fn itinerary_of(snapshot: &StateSnapshot) -> Vec<String> {
    snapshot
        .extra
        .get(ITINERARY)
        .and_then(Value::as_array)
        .map(|legs| {
            legs.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Researched steps, dropping any entry that fails to parse.
pub fn steps_of(snapshot: &StateSnapshot) -> Vec<RouteStep> {
    snapshot
        .extra
        .get(STEPS)
        .and_then(Value::as_array)
        .map(|steps| {
            steps
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

pub fn references_of(snapshot: &StateSnapshot) -> Vec<Reference> {
    snapshot
        .extra
        .get(REFERENCES)
        .and_then(Value::as_array)
        .map(|refs| {
            refs.iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winter() -> Theme {
        Theme {
            name: "Winter Wonderland".into(),
            description: "A snowy landscape...".into(),
        }
    }

    #[test]
    fn initial_state_seeds_theme_and_idea() {
        let state = initial_state(&winter(), Some("The Silk Road"), false);
        let snap = state.snapshot();
        assert_eq!(theme_of(&snap).unwrap().name, "Winter Wonderland");
        assert_eq!(snap.extra.get(ROUTE_IDEA), Some(&json!("The Silk Road")));
        assert_eq!(snap.extra.get(FICTIONAL), Some(&json!(false)));
        assert_eq!(snap.messages.len(), 1);
    }

    #[test]
    fn typed_accessors_tolerate_missing_fields() {
        let snap = VersionedState::empty().snapshot();
        assert!(theme_of(&snap).is_none());
        assert!(route_of(&snap).is_empty());
        assert!(itinerary_of(&snap).is_empty());
        assert!(steps_of(&snap).is_empty());
    }

    #[test]
    fn invalid_steps_are_filtered_on_read() {
        let state = VersionedState::builder()
            .with_extra(
                STEPS,
                json!([
                    {"name": "Xi'an", "distance": 0.0},
                    {"name": "Samarkand"},
                    "not a step"
                ]),
            )
            .build();
        let steps = steps_of(&state.snapshot());
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name, "Xi'an");
    }
}
