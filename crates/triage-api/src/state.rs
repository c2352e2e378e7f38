//! Application state shared across all route handlers.
//!
//! AppState holds references to the engine and shared resources. It is
//! passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use triage_chat::{Clock, Orchestrator, SessionStore, SystemClock};
use triage_core::TriageConfig;
use triage_llm::LanguageModel;
use triage_store::TicketStore;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<TriageConfig>,
    /// The conversational engine.
    pub orchestrator: Arc<Orchestrator>,
    /// Session store, exposed for inspection and clearing.
    pub sessions: Arc<SessionStore>,
    /// Ticket store, exposed for the health probe.
    pub store: Arc<dyn TicketStore>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState wiring the engine from its collaborators.
    pub fn new(
        config: TriageConfig,
        store: Arc<dyn TicketStore>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(
            Arc::new(SystemClock) as Arc<dyn Clock>,
            config.chat.session_expiry_minutes,
            config.chat.history_capacity,
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&sessions),
            Arc::clone(&store),
            llm,
            &config.chat,
        ));
        Self {
            config: Arc::new(config),
            orchestrator,
            sessions,
            store,
            start_time: Instant::now(),
        }
    }
}
