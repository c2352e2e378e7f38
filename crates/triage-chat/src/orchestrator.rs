//! Top-level request coordinator.
//!
//! Wires the router, planner, executor, paginator, and summarizer together
//! behind one `handle` operation, updates the session after every turn, and
//! converts every downstream failure into an apologetic response — a single
//! request can never crash the process or surface a raw error.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use triage_core::config::ChatConfig;
use triage_core::schema::Concept;
use triage_core::types::Ticket;
use triage_llm::LanguageModel;
use triage_store::{Condition, TicketStore};

use crate::error::ChatError;
use crate::executor::QueryExecutor;
use crate::paginator::Paginator;
use crate::planner::{QueryPlan, QueryPlanner};
use crate::router::{self, IntentRouter};
use crate::session::{Session, SessionStore};
use crate::summarizer::TicketSummarizer;
use crate::types::{Action, ChatOutcome, Decision, Interaction};

const APOLOGY: &str = "Sorry, something went wrong while handling that request. Please try \
                       again.";

const STORE_DOWN: &str = "I couldn't reach the ticket store just now. Please try again in a \
                          moment.";

/// What one dispatched action produced.
struct Turn {
    response: String,
    result_count: usize,
    plan: Option<QueryPlan>,
    success: bool,
}

impl Turn {
    fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            result_count: 0,
            plan: None,
            success: true,
        }
    }
}

/// The conversational engine's front door.
pub struct Orchestrator {
    sessions: Arc<SessionStore>,
    store: Arc<dyn TicketStore>,
    router: IntentRouter,
    planner: QueryPlanner,
    executor: QueryExecutor,
    paginator: Paginator,
    summarizer: TicketSummarizer,
}

impl Orchestrator {
    pub fn new(
        sessions: Arc<SessionStore>,
        store: Arc<dyn TicketStore>,
        llm: Arc<dyn LanguageModel>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            sessions,
            store: Arc::clone(&store),
            router: IntentRouter::new(Arc::clone(&llm), config.default_resume_offset),
            planner: QueryPlanner::new(config.default_limit, config.max_limit),
            executor: QueryExecutor::new(store, config.max_retries),
            paginator: Paginator::new(config.page_size, config.id_page_size),
            summarizer: TicketSummarizer::new(llm),
        }
    }

    /// Handle one message for one session.
    ///
    /// Turns within a session serialize on the session's mutex; distinct
    /// sessions proceed concurrently. This method never returns an error:
    /// failures become apologetic outcomes with `success = false`.
    pub async fn handle(&self, session_id: &str, text: &str) -> ChatOutcome {
        let handle = self.sessions.entry(session_id);
        let mut session = handle.lock().await;

        let decision = self.router.classify(text, &mut session).await;
        info!(
            session_id,
            action = decision.action.name(),
            confidence = decision.confidence,
            "Handling message"
        );

        let turn = match self.dispatch(&decision, text, &mut session).await {
            Ok(turn) => turn,
            Err(e) => {
                error!(session_id, error = %e, "Turn failed");
                Turn {
                    response: APOLOGY.to_string(),
                    result_count: 0,
                    plan: None,
                    success: false,
                }
            }
        };

        let now = self.sessions.now();
        session.record(Interaction {
            input: text.to_string(),
            action: decision.action.name().to_string(),
            response: turn.response.clone(),
            plan: turn.plan,
            result_count: turn.result_count,
            success: turn.success,
            at: now,
        });
        session.last_activity = now;

        ChatOutcome {
            response: turn.response,
            session_id: session.id.clone(),
            result_count: turn.result_count,
            success: turn.success,
            error: (!turn.success).then(|| "request failed".to_string()),
        }
    }

    async fn dispatch(
        &self,
        decision: &Decision,
        text: &str,
        session: &mut Session,
    ) -> Result<Turn, ChatError> {
        match &decision.action {
            Action::Chat { reply } => Ok(Turn::text(reply.clone())),
            Action::Explain { concept } => Ok(Turn::text(explain(*concept))),
            Action::Query { instruction } => self.run_query(instruction, text, session).await,
            Action::ContinueQuery { offset } => Ok(self.continue_query(*offset, session)),
            Action::Summarize { instruction } => self.summarize(instruction, session).await,
            Action::Error { message } => {
                error!(message = %message, "Router reported an error decision");
                Ok(Turn {
                    response: APOLOGY.to_string(),
                    result_count: 0,
                    plan: None,
                    success: false,
                })
            }
        }
    }

    // -----------------------------------------------------------------
    // Query path
    // -----------------------------------------------------------------

    async fn run_query(
        &self,
        instruction: &str,
        text: &str,
        session: &mut Session,
    ) -> Result<Turn, ChatError> {
        let plan = self.planner.plan(instruction, text);
        debug!(explanation = %plan.explanation, "Plan built");

        let execution = self.executor.execute(&plan).await;
        if !execution.success {
            return Ok(Turn {
                response: STORE_DOWN.to_string(),
                result_count: 0,
                plan: Some(plan),
                success: false,
            });
        }

        let mut set = execution.set;
        let page_size = self.paginator.page_size_for(&set.plan);
        let page = self.paginator.page(&set.records, 0, page_size);
        let response = self.paginator.render(&page, &set.plan);
        let result_count = set.len();
        let next_offset = page.next_offset;

        self.remember_entities(session, &set.plan, &set.records);
        let executed_plan = set.plan.clone();
        set.offset = next_offset;
        session.context.last_plan = Some(executed_plan.clone());
        session.context.last_results = Some(set);
        session.context.offset = Some(next_offset);

        Ok(Turn {
            response,
            result_count,
            plan: Some(executed_plan),
            success: true,
        })
    }

    fn continue_query(&self, offset: usize, session: &mut Session) -> Turn {
        // The router screens for missing results, but defend here too.
        let Some(set) = session.context.last_results.as_mut() else {
            return Turn::text(self.paginator.nothing_to_continue());
        };
        if set.is_empty() {
            return Turn::text(self.paginator.nothing_to_continue());
        }

        let page_size = self.paginator.page_size_for(&set.plan);
        let page = self.paginator.page(&set.records, offset, page_size);
        let response = self.paginator.render(&page, &set.plan);
        let result_count = page.slice.len();
        let next_offset = page.next_offset;

        set.offset = next_offset;
        session.context.offset = Some(next_offset);

        Turn {
            response,
            result_count,
            plan: None,
            success: true,
        }
    }

    // -----------------------------------------------------------------
    // Summarize path
    // -----------------------------------------------------------------

    async fn summarize(
        &self,
        instruction: &str,
        session: &mut Session,
    ) -> Result<Turn, ChatError> {
        let numbers = router::extract_ticket_numbers(instruction);
        if numbers.is_empty() {
            return Ok(Turn::text(
                "Please tell me which ticket to summarize, e.g. 'summarize ticket \
                 2025010610000001'.",
            ));
        }

        // Lookups bypass the correction loop: simplifying the number filter
        // would fetch unrelated tickets.
        let plan = self.planner.ticket_lookup(&numbers);
        let records = self.store.find(&plan.filter, &plan.options).await?;

        if records.is_empty() {
            return Ok(Turn {
                response: format!(
                    "I couldn't find a ticket numbered {}. Double-check the number, or ask \
                     for 'all tickets' to browse.",
                    numbers.join(", ")
                ),
                result_count: 0,
                plan: Some(plan),
                success: true,
            });
        }

        let summary = self.summarizer.summarize(&records).await;
        self.remember_entities(session, &plan, &records);

        Ok(Turn {
            response: summary,
            result_count: records.len(),
            plan: Some(plan),
            success: true,
        })
    }

    // -----------------------------------------------------------------
    // Context bookkeeping
    // -----------------------------------------------------------------

    /// Opportunistically remember entities the turn surfaced.
    fn remember_entities(&self, session: &mut Session, plan: &QueryPlan, records: &[Ticket]) {
        if let Some(customer) = filter_string(plan, Concept::Customer) {
            session.context.last_customer = Some(customer);
        }
        if let Some(queue) = filter_string(plan, Concept::Queue) {
            session.context.last_queue = Some(queue);
        }
        if let [single] = records {
            session.context.last_ticket = Some(single.number.clone());
            session.context.last_customer = Some(single.customer.clone());
            session.context.last_queue = Some(single.queue.clone());
        }
    }
}

/// An equality-filtered string value for a concept's path, if the plan has
/// one.
fn filter_string(plan: &QueryPlan, concept: Concept) -> Option<String> {
    let path = concept.store_path()?;
    match plan.filter.0.get(path)? {
        Condition::Eq(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Response text for an explain decision.
fn explain(concept: Concept) -> String {
    match concept {
        Concept::Structure => {
            let fields = triage_core::schema::ALL_CONCEPTS
                .iter()
                .map(|c| format!("- {}: {}", c.name(), c.describe()))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{}\n\nThe fields are:\n{}", concept.describe(), fields)
        }
        other => format!("{}: {}", capitalize(other.name()), other.describe()),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

// =============================================================================
// Tests
// =============================================================================
