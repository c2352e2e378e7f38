//! The `TicketStore` trait the engine consumes.

use async_trait::async_trait;

use triage_core::types::Ticket;
use triage_core::TriageError;

use crate::filter::{Filter, QueryOptions};

/// Errors a ticket store may return.
///
/// The engine treats every store call as fallible: queries can be rejected
/// for malformed clauses, and the backend can be unreachable.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("invalid projection: {0}")]
    InvalidProjection(String),
    #[error("invalid sort: {0}")]
    InvalidSort(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for TriageError {
    fn from(err: StoreError) -> Self {
        TriageError::Store(err.to_string())
    }
}

/// A queryable store of ticket records.
///
/// Implementations must return an ordered, finite sequence and must not
/// require the caller to hold any lock across the call.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Find tickets matching `filter`, honoring `options`.
    ///
    /// Rejects queries whose filter paths, sort field, or projection fields
    /// are not part of the known schema.
    async fn find(&self, filter: &Filter, options: &QueryOptions)
        -> Result<Vec<Ticket>, StoreError>;

    /// Total number of records in the store.
    async fn count(&self) -> Result<usize, StoreError>;
}
