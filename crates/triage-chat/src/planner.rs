//! Query planning: free text to a structured, bounded query plan.
//!
//! An ordered table of predicate patterns, first match wins; anything
//! unmatched falls through to a safe default plan. The planner always
//! returns a valid plan and never errors — free-text-to-filter translation
//! beyond the pattern table is deliberately out of scope.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use triage_core::schema::Concept;
use triage_store::{Condition, Filter, QueryOptions, Sort};

// =============================================================================
// Patterns (compiled once, reused across calls)
// =============================================================================

static ID_LISTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:ticket[\s-]+(?:numbers?|ids?)|(?:numbers?|ids?)\s+only)\b").unwrap()
});

static ALL_TICKETS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:all|every)\b.{0,20}\btickets?\b").unwrap());

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

static OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:open|new|pending|unresolved|outstanding)\b").unwrap()
});

static CLOSED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:closed|resolved|solved|completed)\b").unwrap());

// =============================================================================
// QueryPlan
// =============================================================================

/// A structured, bounded description of one store query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub filter: Filter,
    pub options: QueryOptions,
    /// Human-readable description of what the plan fetches.
    pub explanation: String,
}

impl QueryPlan {
    /// Whether this plan projects down to ticket numbers only.
    pub fn is_id_listing(&self) -> bool {
        self.options
            .projection
            .as_ref()
            .is_some_and(|p| p == &vec!["number".to_string()])
    }
}

// =============================================================================
// QueryPlanner
// =============================================================================

/// Builds query plans from routing instructions and the original text.
pub struct QueryPlanner {
    /// Limit applied when no pattern specifies one.
    pub default_limit: usize,
    /// Hard cap on every plan's limit.
    pub max_limit: usize,
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new(50, 1000)
    }
}

impl QueryPlanner {
    pub fn new(default_limit: usize, max_limit: usize) -> Self {
        Self {
            default_limit,
            max_limit,
        }
    }

    /// Build a plan from the router's instruction and the user's free text.
    ///
    /// First matching pattern wins; no match yields the default listing.
    pub fn plan(&self, instruction: &str, free_text: &str) -> QueryPlan {
        let haystack = format!("{} {}", instruction, free_text);

        if ID_LISTING_RE.is_match(&haystack) {
            return QueryPlan {
                filter: Filter::empty(),
                options: QueryOptions {
                    limit: self.clamp(500),
                    sort: Some(Sort::desc(created_path())),
                    projection: Some(vec!["number".to_string()]),
                },
                explanation: "ticket numbers only, newest first".to_string(),
            };
        }

        if ALL_TICKETS_RE.is_match(&haystack) {
            return QueryPlan {
                filter: Filter::empty(),
                options: QueryOptions {
                    limit: self.clamp(100),
                    sort: Some(Sort::desc(created_path())),
                    projection: None,
                },
                explanation: "all tickets, newest first".to_string(),
            };
        }

        if let Some(email) = EMAIL_RE.find(&haystack) {
            let email = email.as_str().to_string();
            return QueryPlan {
                filter: Filter::field(customer_path(), Condition::Eq(json!(email.clone()))),
                options: QueryOptions {
                    limit: self.clamp(self.default_limit),
                    sort: Some(Sort::desc(created_path())),
                    projection: None,
                },
                explanation: format!("tickets for customer {}", email),
            };
        }

        if OPEN_RE.is_match(&haystack) {
            return QueryPlan {
                filter: Filter::field(
                    status_path(),
                    Condition::In(vec![json!("new"), json!("open"), json!("pending")]),
                ),
                options: QueryOptions {
                    limit: self.clamp(self.default_limit),
                    sort: Some(Sort::desc(created_path())),
                    projection: None,
                },
                explanation: "tickets that still need attention".to_string(),
            };
        }

        if CLOSED_RE.is_match(&haystack) {
            return QueryPlan {
                filter: Filter::field(status_path(), Condition::Eq(json!("closed"))),
                options: QueryOptions {
                    limit: self.clamp(self.default_limit),
                    sort: Some(Sort::desc(created_path())),
                    projection: None,
                },
                explanation: "closed tickets".to_string(),
            };
        }

        self.default_plan()
    }

    /// The fallback listing: everything, newest first, default limit.
    pub fn default_plan(&self) -> QueryPlan {
        QueryPlan {
            filter: Filter::empty(),
            options: QueryOptions {
                limit: self.clamp(self.default_limit),
                sort: Some(Sort::desc(created_path())),
                projection: None,
            },
            explanation: "recent tickets".to_string(),
        }
    }

    /// Lookup plan for specific ticket numbers (used by the summarize path).
    pub fn ticket_lookup(&self, numbers: &[String]) -> QueryPlan {
        let values = numbers.iter().map(|n| json!(n)).collect::<Vec<_>>();
        let condition = if values.len() == 1 {
            Condition::Eq(values.into_iter().next().unwrap_or(json!("")))
        } else {
            Condition::In(values)
        };
        QueryPlan {
            filter: Filter::field(number_path(), condition),
            options: QueryOptions {
                limit: self.clamp(numbers.len().max(1)),
                sort: None,
                projection: None,
            },
            explanation: format!("ticket lookup: {}", numbers.join(", ")),
        }
    }

    fn clamp(&self, limit: usize) -> usize {
        limit.min(self.max_limit)
    }
}

fn created_path() -> &'static str {
    Concept::Created.store_path().unwrap_or("created_at")
}

fn customer_path() -> &'static str {
    Concept::Customer.store_path().unwrap_or("customer")
}

fn status_path() -> &'static str {
    Concept::Status.store_path().unwrap_or("state")
}

fn number_path() -> &'static str {
    Concept::Number.store_path().unwrap_or("number")
}

// =============================================================================
// Tests
// =============================================================================
