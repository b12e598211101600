//! Pure per-field merge strategies.
//!
//! Every named field in the extras channel is declared with a default and
//! a [`MergeStrategy`]. Strategies are plain functions over
//! `(current, patch)` with no external state, so replaying a patch
//! sequence is deterministic.

use rustc_hash::FxHashMap;
use serde_json::Value;

/// Which occurrence survives when deduplicating by key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keep {
    First,
    Last,
}

/// Declarative merge strategy for a single extras field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeStrategy {
    /// The patch replaces the current value.
    Overwrite,
    /// The patch (an array) is concatenated onto the current array.
    Append,
    /// Concatenate, then keep one occurrence per value of `key` (an
    /// object property of each element).
    AppendDedupeByKey { key: String, keep: Keep },
    /// Concatenate, then retain only the newest `cap` elements.
    AppendCapped { cap: usize },
}

impl MergeStrategy {
    /// Merge `patch` into `current`, total for any JSON value.
    ///
    /// Non-array inputs to the append strategies are treated as empty
    /// sequences rather than failing: reduce must be total.
    #[must_use]
    pub fn merge(&self, current: Option<&Value>, patch: &Value) -> Value {
        match self {
            MergeStrategy::Overwrite => patch.clone(),
            MergeStrategy::Append => Value::Array(concat(current, patch)),
            MergeStrategy::AppendDedupeByKey { key, keep } => {
                Value::Array(dedupe_by_key(concat(current, patch), key, *keep))
            }
            MergeStrategy::AppendCapped { cap } => {
                let mut items = concat(current, patch);
                if items.len() > *cap {
                    items.drain(..items.len() - *cap);
                }
                Value::Array(items)
            }
        }
    }
}

fn as_items(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
        None => Vec::new(),
    }
}

fn concat(current: Option<&Value>, patch: &Value) -> Vec<Value> {
    let mut items = as_items(current);
    items.extend(as_items(Some(patch)));
    items
}

fn dedupe_by_key(items: Vec<Value>, key: &str, keep: Keep) -> Vec<Value> {
    let key_of = |item: &Value| -> Option<String> {
        item.get(key).map(|k| k.to_string())
    };
    match keep {
        Keep::First => {
            let mut seen: FxHashMap<String, ()> = FxHashMap::default();
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match key_of(&item) {
                    Some(k) => {
                        if seen.insert(k, ()).is_none() {
                            out.push(item);
                        }
                    }
                    // Keyless elements are never deduplicated.
                    None => out.push(item),
                }
            }
            out
        }
        Keep::Last => {
            let mut last_index: FxHashMap<String, usize> = FxHashMap::default();
            for (i, item) in items.iter().enumerate() {
                if let Some(k) = key_of(item) {
                    last_index.insert(k, i);
                }
            }
            items
                .into_iter()
                .enumerate()
                .filter(|(i, item)| match key_of(item) {
                    Some(k) => last_index.get(&k) == Some(i),
                    None => true,
                })
                .map(|(_, item)| item)
                .collect()
        }
    }
}

/// Declared default and merge strategy for one field.
#[derive(Clone, Debug)]
pub struct FieldPolicy {
    pub default: Value,
    pub strategy: MergeStrategy,
}

impl FieldPolicy {
    #[must_use]
    pub fn new(default: Value, strategy: MergeStrategy) -> Self {
        Self { default, strategy }
    }

    /// Shorthand for the most common policy.
    #[must_use]
    pub fn overwrite(default: Value) -> Self {
        Self::new(default, MergeStrategy::Overwrite)
    }
}

/// What to do with a patch field that has no declared policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownFieldPolicy {
    /// Drop the field silently (the source system's behavior).
    #[default]
    Ignore,
    /// Fail the merge with a reducer error.
    Reject,
}

/// Registry of per-field policies for the extras channel.
#[derive(Clone, Debug, Default)]
pub struct FieldPolicies {
    fields: FxHashMap<String, FieldPolicy>,
}

impl FieldPolicies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, policy: FieldPolicy) -> &mut Self {
        self.fields.insert(name.into(), policy);
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, policy: FieldPolicy) -> Self {
        self.declare(name, policy);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldPolicy> {
        self.fields.get(name)
    }

    /// The declared default for a field, `Null` when undeclared.
    #[must_use]
    pub fn default_value(&self, name: &str) -> Value {
        self.fields
            .get(name)
            .map(|p| p.default.clone())
            .unwrap_or(Value::Null)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
