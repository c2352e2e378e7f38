//! Decision, result-set, and turn-record types for the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use triage_core::schema::Concept;
use triage_core::types::Ticket;

use crate::planner::QueryPlan;

// =============================================================================
// Decisions
// =============================================================================

/// What the intent router decided to do with a message.
///
/// A tagged union: each variant carries exactly the payload its handler
/// needs, so no handler ever probes optional fields that may not apply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Reply conversationally with the given text.
    Chat { reply: String },
    /// Explain a schema concept.
    Explain { concept: Concept },
    /// Plan and execute a data query from the instruction.
    Query { instruction: String },
    /// Reveal more of the session's cached result set, resuming at `offset`.
    ContinueQuery { offset: usize },
    /// Summarize the ticket(s) the instruction references.
    Summarize { instruction: String },
    /// Routing itself failed; apologize with this message.
    Error { message: String },
}

impl Action {
    /// Short action name for logs and interaction records.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Chat { .. } => "chat",
            Action::Explain { .. } => "explain",
            Action::Query { .. } => "query",
            Action::ContinueQuery { .. } => "continue_query",
            Action::Summarize { .. } => "summarize",
            Action::Error { .. } => "error",
        }
    }
}

/// The intent router's output: an action plus an informational confidence.
///
/// Confidence is logged but never branched on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub confidence: f32,
}

impl Decision {
    pub fn new(action: Action, confidence: f32) -> Self {
        Self { action, confidence }
    }
}

// =============================================================================
// Results
// =============================================================================

/// The outcome of one query execution, cached in the session for
/// continuations until replaced by a newer query or evicted with the
/// session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Records in the order the store returned them.
    pub records: Vec<Ticket>,
    /// The plan that produced them.
    pub plan: QueryPlan,
    /// Pagination cursor: how many records have been shown so far.
    pub offset: usize,
}

impl ResultSet {
    pub fn new(records: Vec<Ticket>, plan: QueryPlan) -> Self {
        Self {
            records,
            plan,
            offset: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// Turn records
// =============================================================================

/// Immutable record of one completed turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Interaction {
    pub input: String,
    /// Resolved action name (see [`Action::name`]).
    pub action: String,
    pub response: String,
    /// The plan executed this turn, if any.
    pub plan: Option<QueryPlan>,
    pub result_count: usize,
    pub success: bool,
    pub at: DateTime<Utc>,
}

/// The orchestrator's response envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub response: String,
    pub session_id: String,
    pub result_count: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_store::{Filter, QueryOptions};

    fn plan() -> QueryPlan {
        QueryPlan {
            filter: Filter::empty(),
            options: QueryOptions::default(),
            explanation: "all tickets".to_string(),
        }
    }

    #[test]
    fn test_action_names() {
        assert_eq!(Action::Chat { reply: "hi".into() }.name(), "chat");
        assert_eq!(
            Action::Explain {
                concept: Concept::Status
            }
            .name(),
            "explain"
        );
        assert_eq!(
            Action::Query {
                instruction: "x".into()
            }
            .name(),
            "query"
        );
        assert_eq!(Action::ContinueQuery { offset: 20 }.name(), "continue_query");
        assert_eq!(
            Action::Summarize {
                instruction: "x".into()
            }
            .name(),
            "summarize"
        );
        assert_eq!(
            Action::Error {
                message: "x".into()
            }
            .name(),
            "error"
        );
    }

    #[test]
    fn test_action_serde_tagged() {
        let action = Action::ContinueQuery { offset: 20 };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("\"action\":\"continue_query\""));
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(action, back);
    }

    #[test]
    fn test_result_set_starts_at_offset_zero() {
        let set = ResultSet::new(vec![], plan());
        assert_eq!(set.offset, 0);
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_chat_outcome_serializes_without_error_field() {
        let outcome = ChatOutcome {
            response: "done".into(),
            session_id: "default".into(),
            result_count: 3,
            success: true,
            error: None,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(!json.contains("error"));
    }
}
