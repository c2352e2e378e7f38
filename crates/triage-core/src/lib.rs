//! Core domain types, configuration, and errors for Triage.
//!
//! Triage is a conversational assistant over a store of support-ticket
//! records. This crate holds everything the other crates share: the ticket
//! record model, the schema-path table mapping semantic field names to
//! store paths, the top-level error type, and the TOML configuration.

pub mod config;
pub mod error;
pub mod schema;
pub mod types;

pub use config::TriageConfig;
pub use error::{Result, TriageError};
pub use schema::Concept;
pub use types::{Attachment, Priority, SenderRole, Ticket, TicketMessage, TicketState};
