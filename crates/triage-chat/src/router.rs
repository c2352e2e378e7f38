//! Intent classification.
//!
//! An ordered list of predicate rules, first match wins; the language model
//! is the last resort, and its failures land in a deterministic heuristic.
//! Every path yields a valid [`Decision`] — the router never surfaces an
//! error to the orchestrator.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use triage_core::schema::Concept;
use triage_llm::{ClassifyContext, LanguageModel, RawDecision, TurnContext};

use crate::session::{PendingClarification, Session};
use crate::types::{Action, Decision};

// =============================================================================
// Pattern sets (compiled once, reused across calls)
// =============================================================================

static CONTINUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:see\s+more|show\s+more|more|continue|next|more\s+results?|keep\s+going|go\s+on)\s*[.!?]?\s*$",
    )
    .unwrap()
});

static EXPLAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:what\s+is|what's|what\s+are|explain|describe)\b").unwrap()
});

static SUMMARIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsummar(?:y|ize|ise|ies)\b").unwrap());

static TICKET_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{8,20}\b").unwrap());

static REFERENCE_PRONOUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:it|that|this|last\s+one)\b").unwrap());

static DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:list|show|find|get|display|all|tickets?|customers?|email)\b").unwrap()
});

static ID_LISTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:ticket[\s-]+(?:numbers?|ids?)|(?:numbers?|ids?)\s+only)\b").unwrap()
});

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

static OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:open|new|pending|unresolved|outstanding)\b").unwrap()
});

static CLOSED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:closed|resolved|solved|completed)\b").unwrap());

/// Exact-match greetings (after trimming and lowercasing).
static GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "hi there",
    "hello there",
    "good morning",
    "good afternoon",
    "good evening",
    "howdy",
];

const HELP_REPLY: &str = "I can list, filter, and summarize support tickets. Try 'list all \
                          tickets', 'show open tickets', or 'summarize ticket <number>'. What \
                          would you like to see?";

const GREETING_REPLY: &str = "Hello! I can help you explore support tickets — listing, \
                              filtering by customer or status, and summarizing single tickets. \
                              What would you like to see?";

const NO_RESULTS_TO_CONTINUE: &str = "There are no previous results to continue from. Ask for a \
                                      listing first, e.g. 'list all tickets'.";

// =============================================================================
// IntentRouter
// =============================================================================

/// Classifies incoming messages into decisions.
pub struct IntentRouter {
    llm: Arc<dyn LanguageModel>,
    /// Resume point used when a continuation arrives with no recorded offset.
    default_resume_offset: usize,
}

impl IntentRouter {
    pub fn new(llm: Arc<dyn LanguageModel>, default_resume_offset: usize) -> Self {
        Self {
            llm,
            default_resume_offset,
        }
    }

    /// Classify a message in the context of its session.
    ///
    /// Mutates only the session's clarification state: set when the
    /// heuristic falls back to help text, cleared whenever a rule or the
    /// model resolves the intent.
    pub async fn classify(&self, text: &str, session: &mut Session) -> Decision {
        let decision = self.classify_inner(text, session).await;

        match &decision.action {
            Action::Chat { reply } if reply == HELP_REPLY => {
                session.clarification = Some(PendingClarification {
                    original: text.to_string(),
                    question: HELP_REPLY.to_string(),
                });
            }
            _ => session.clarification = None,
        }

        debug!(
            action = decision.action.name(),
            confidence = decision.confidence,
            "Message classified"
        );
        decision
    }

    async fn classify_inner(&self, text: &str, session: &Session) -> Decision {
        let trimmed = text.trim();

        // 1. Continuation: only meaningful with cached results.
        if CONTINUE_RE.is_match(trimmed) {
            let cached = session
                .context
                .last_results
                .as_ref()
                .is_some_and(|r| !r.is_empty());
            if cached {
                let offset = session
                    .context
                    .offset
                    .unwrap_or(self.default_resume_offset);
                return Decision::new(Action::ContinueQuery { offset }, 0.95);
            }
            return Decision::new(
                Action::Chat {
                    reply: NO_RESULTS_TO_CONTINUE.to_string(),
                },
                0.9,
            );
        }

        // 2. Field/structure explanation.
        if EXPLAIN_RE.is_match(trimmed) {
            if let Some(concept) = find_concept(trimmed) {
                return Decision::new(Action::Explain { concept }, 0.9);
            }
        }

        // 3. Greeting.
        let normalized = trimmed
            .trim_end_matches(['!', '.', '?'])
            .trim()
            .to_lowercase();
        if GREETINGS.contains(&normalized.as_str()) {
            return Decision::new(
                Action::Chat {
                    reply: GREETING_REPLY.to_string(),
                },
                1.0,
            );
        }

        // 4. Summarization with a ticket reference (explicit or via context).
        if SUMMARIZE_RE.is_match(trimmed) {
            if TICKET_NUMBER_RE.is_match(trimmed) {
                return Decision::new(
                    Action::Summarize {
                        instruction: trimmed.to_string(),
                    },
                    0.9,
                );
            }
            if REFERENCE_PRONOUN_RE.is_match(trimmed) {
                if let Some(ref number) = session.context.last_ticket {
                    return Decision::new(
                        Action::Summarize {
                            instruction: format!("{} {}", trimmed, number),
                        },
                        0.8,
                    );
                }
            }
        }

        // 5. Data request.
        if DATA_RE.is_match(trimmed) {
            return Decision::new(
                Action::Query {
                    instruction: derive_instruction(trimmed),
                },
                0.8,
            );
        }

        // 6. Language-model fallback, then deterministic heuristic.
        let context = self.build_context(trimmed, session);
        match self.llm.classify(&context).await {
            Ok(raw) => match self.parse_raw(raw, trimmed, session) {
                Some(decision) => decision,
                None => {
                    warn!("Language model returned unknown action, using heuristic");
                    heuristic(trimmed)
                }
            },
            Err(e) => {
                warn!(error = %e, "Language model classification failed, using heuristic");
                heuristic(trimmed)
            }
        }
    }

    fn build_context(&self, text: &str, session: &Session) -> ClassifyContext {
        ClassifyContext {
            message: text.to_string(),
            recent_turns: session
                .recent_turns(3)
                .map(|i| TurnContext {
                    input: i.input.clone(),
                    action: i.action.clone(),
                    response: i.response.clone(),
                })
                .collect(),
            last_ticket: session.context.last_ticket.clone(),
            last_customer: session.context.last_customer.clone(),
        }
    }

    /// Map a model's loosely-shaped decision to a typed one.
    fn parse_raw(&self, raw: RawDecision, text: &str, session: &Session) -> Option<Decision> {
        let confidence = raw.confidence.clamp(0.0, 1.0);
        let action = match raw.action.to_lowercase().as_str() {
            "chat" => Action::Chat {
                reply: if raw.instruction.is_empty() {
                    HELP_REPLY.to_string()
                } else {
                    raw.instruction
                },
            },
            "explain" => Action::Explain {
                concept: find_concept(&raw.instruction)
                    .or_else(|| find_concept(text))
                    .unwrap_or(Concept::Structure),
            },
            "query" => Action::Query {
                instruction: if raw.instruction.is_empty() {
                    "list recent tickets".to_string()
                } else {
                    raw.instruction
                },
            },
            "continue_query" | "continuequery" | "continue" => {
                let cached = session
                    .context
                    .last_results
                    .as_ref()
                    .is_some_and(|r| !r.is_empty());
                if cached {
                    Action::ContinueQuery {
                        offset: session
                            .context
                            .offset
                            .unwrap_or(self.default_resume_offset),
                    }
                } else {
                    Action::Chat {
                        reply: NO_RESULTS_TO_CONTINUE.to_string(),
                    }
                }
            }
            "summarize" => Action::Summarize {
                instruction: if raw.instruction.is_empty() {
                    text.to_string()
                } else {
                    raw.instruction
                },
            },
            "error" => Action::Error {
                message: raw.instruction,
            },
            _ => return None,
        };
        Some(Decision::new(action, confidence))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// All ticket-number references in a text, in order of appearance.
pub(crate) fn extract_ticket_numbers(text: &str) -> Vec<String> {
    TICKET_NUMBER_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// First word in the text that resolves to a schema concept.
fn find_concept(text: &str) -> Option<Concept> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .find_map(Concept::lookup)
}

/// Keyword table mapping a data request to a planner instruction.
fn derive_instruction(text: &str) -> String {
    if ID_LISTING_RE.is_match(text) {
        return "ticket-id listing".to_string();
    }
    if let Some(email) = EMAIL_RE.find(text) {
        return format!("tickets for customer {}", email.as_str());
    }
    if OPEN_RE.is_match(text) {
        return "list open tickets".to_string();
    }
    if CLOSED_RE.is_match(text) {
        return "list closed tickets".to_string();
    }
    if text.to_lowercase().contains("all") {
        return "list all tickets".to_string();
    }
    "list recent tickets".to_string()
}

/// Deterministic last resort when the model is unavailable or unparseable.
fn heuristic(text: &str) -> Decision {
    if DATA_RE.is_match(text) {
        return Decision::new(
            Action::Query {
                instruction: "list recent tickets".to_string(),
            },
            0.4,
        );
    }
    if EXPLAIN_RE.is_match(text) {
        return Decision::new(
            Action::Explain {
                concept: find_concept(text).unwrap_or(Concept::Structure),
            },
            0.4,
        );
    }
    Decision::new(
        Action::Chat {
            reply: HELP_REPLY.to_string(),
        },
        0.3,
    )
}

// =============================================================================
// Tests
// =============================================================================
