//! Conversational engine for Triage.
//!
//! The request-orchestration core: intent routing, query planning with a
//! retry/correction loop, paginated result assembly with continuation
//! state, per-session conversational memory, and ticket summarization.
//! The orchestrator wires the components together and never lets a single
//! request's failure escape as an error.

pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod paginator;
pub mod planner;
pub mod router;
pub mod session;
pub mod summarizer;
pub mod types;

pub use error::ChatError;
pub use executor::{Execution, QueryExecutor};
pub use orchestrator::Orchestrator;
pub use paginator::Paginator;
pub use planner::{QueryPlan, QueryPlanner};
pub use router::IntentRouter;
pub use session::{Clock, Session, SessionContext, SessionStore, SessionView, SystemClock};
pub use summarizer::TicketSummarizer;
pub use types::{Action, ChatOutcome, Decision, Interaction, ResultSet};
