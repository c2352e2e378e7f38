//! The structured query language consumed by ticket stores.
//!
//! A [`Filter`] maps store field paths to match [`Condition`]s; the
//! condition enum doubles as the operator allow-list — anything outside it
//! cannot be expressed, so no arbitrary-evaluation operator ever reaches a
//! store.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Conditions
// =============================================================================

/// A match condition on a single field path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Exact equality.
    Eq(Value),
    /// Inequality.
    Ne(Value),
    /// Membership in a value set.
    In(Vec<Value>),
    /// Greater than or equal. Numbers compare numerically, strings
    /// lexicographically (RFC 3339 timestamps sort correctly as strings).
    Gte(Value),
    /// Less than or equal.
    Lte(Value),
    /// Case-insensitive substring match on string fields.
    Contains(String),
}

impl Condition {
    /// Evaluate this condition against a field value.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Condition::Eq(expected) => loose_eq(value, expected),
            Condition::Ne(expected) => !loose_eq(value, expected),
            Condition::In(set) => set.iter().any(|v| loose_eq(value, v)),
            Condition::Gte(bound) => {
                matches!(compare(value, bound), Some(Ordering::Greater | Ordering::Equal))
            }
            Condition::Lte(bound) => {
                matches!(compare(value, bound), Some(Ordering::Less | Ordering::Equal))
            }
            Condition::Contains(needle) => value
                .as_str()
                .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
        }
    }
}

/// Equality that tolerates number-representation differences (1 vs 1.0).
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering between two field values, if they are comparable.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return Some(x.cmp(y));
    }
    None
}

// =============================================================================
// Filter
// =============================================================================

/// A conjunction of field conditions. Empty matches everything.
///
/// `BTreeMap` keeps the field order deterministic, which keeps logs and
/// explanations stable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter(pub BTreeMap<String, Condition>);

impl Filter {
    /// An empty filter matching every record.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a single-condition filter.
    pub fn field(path: impl Into<String>, condition: Condition) -> Self {
        let mut map = BTreeMap::new();
        map.insert(path.into(), condition);
        Self(map)
    }

    /// Add a condition, consuming self (builder style).
    pub fn and(mut self, path: impl Into<String>, condition: Condition) -> Self {
        self.0.insert(path.into(), condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Evaluate the filter against a JSON document.
    ///
    /// All conditions must match. Dotted paths descend into nested objects;
    /// a path segment hitting an array matches if any element matches the
    /// remainder of the path.
    pub fn matches(&self, doc: &Value) -> bool {
        self.0
            .iter()
            .all(|(path, cond)| path_matches(doc, path, cond))
    }
}

/// Walk a dotted path and test the condition at its end.
fn path_matches(doc: &Value, path: &str, cond: &Condition) -> bool {
    fn walk(value: &Value, segments: &[&str], cond: &Condition) -> bool {
        match (value, segments) {
            (v, []) => cond.matches(v),
            (Value::Array(items), _) => items.iter().any(|item| walk(item, segments, cond)),
            (Value::Object(map), [head, rest @ ..]) => {
                map.get(*head).is_some_and(|v| walk(v, rest, cond))
            }
            _ => false,
        }
    }
    let segments: Vec<&str> = path.split('.').collect();
    walk(doc, &segments, cond)
}

/// Read the value at a dotted path, if present (first array element wins).
pub fn path_value<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        loop {
            match current {
                Value::Array(items) => current = items.first()?,
                _ => break,
            }
        }
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

// =============================================================================
// Options
// =============================================================================

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Sort specification for a query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    /// Store field path to sort on.
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }
}

/// Execution options for a query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Maximum number of records to return. Always bounded by the caller.
    pub limit: usize,
    #[serde(default)]
    pub sort: Option<Sort>,
    /// Restrict returned fields to these top-level names.
    #[serde(default)]
    pub projection: Option<Vec<String>>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: 50,
            sort: None,
            projection: None,
        }
    }
}

impl QueryOptions {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
