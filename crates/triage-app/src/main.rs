//! Triage application binary - composition root.
//!
//! Ties together all Triage crates into a single executable:
//! 1. Parse CLI arguments and resolve the configuration
//! 2. Initialize tracing
//! 3. Build the in-memory ticket store (optionally loading a fixture file)
//! 4. Construct the engine and application state
//! 5. Spawn the periodic session sweep
//! 6. Start the axum REST API server

mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use triage_api::{start_server, AppState};
use triage_core::TriageConfig;
use triage_llm::UnavailableLanguageModel;
use triage_store::{MemoryTicketStore, TicketStore};

use crate::cli::CliArgs;

/// Run the session sweep on its configured interval.
async fn sweep_loop(state: AppState) {
    let minutes = state.config.chat.sweep_interval_minutes.max(1);
    let mut interval =
        tokio::time::interval(tokio::time::Duration::from_secs(u64::from(minutes) * 60));
    // The first tick fires immediately; skip it so a fresh start does not
    // sweep an empty store.
    interval.tick().await;

    tracing::info!(interval_minutes = minutes, "Session sweep scheduled");

    loop {
        interval.tick().await;
        let evicted = state.sessions.sweep();
        if evicted > 0 {
            tracing::info!(evicted, "Evicted idle sessions");
        }
    }
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // Resolve configuration: flags > env > file > defaults.
    let config_path = args.resolve_config_path();
    let mut config = TriageConfig::load_or_default(&config_path);
    config.general.port = args.resolve_port(config.general.port);
    config.general.log_level = args.resolve_log_level(&config.general.log_level);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.general.log_level.clone())),
        )
        .init();

    tracing::info!(port = config.general.port, "Triage starting");

    // Build the ticket store, loading fixtures when configured.
    let store: Arc<dyn TicketStore> =
        match args.resolve_ticket_file(&config.general.ticket_file) {
            Some(path) => match MemoryTicketStore::from_json_file(&path) {
                Ok(store) => {
                    tracing::info!(path = %path.display(), "Ticket file loaded");
                    Arc::new(store)
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to load ticket file, starting empty"
                    );
                    Arc::new(MemoryTicketStore::new())
                }
            },
            None => Arc::new(MemoryTicketStore::new()),
        };

    match store.count().await {
        Ok(count) => tracing::info!(tickets = count, "Store ready"),
        Err(e) => tracing::warn!(error = %e, "Store count failed"),
    }

    // No language model is wired in by default; the engine's deterministic
    // fallbacks answer instead.
    let state = AppState::new(config, store, Arc::new(UnavailableLanguageModel));

    tokio::spawn(sweep_loop(state.clone()));

    if let Err(e) = start_server(state).await {
        tracing::error!(error = %e, "Server exited with error");
        std::process::exit(1);
    }
}
