//! HTTP surface for Triage.
//!
//! A thin transport shim over the conversational engine: one chat endpoint,
//! read-only session inspection, session clearing, and a health probe.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
