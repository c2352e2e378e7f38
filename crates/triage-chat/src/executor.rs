//! Query execution with retry-and-correction semantics.
//!
//! Every execution terminates in either a (possibly empty) result set or an
//! explicit failure marker — never an error. On store rejection the plan is
//! simplified one clause at a time; when corrections run out, an ultimate
//! fallback fetches a small unsorted listing.

use std::sync::Arc;

use tracing::{debug, warn};

use triage_store::{Filter, QueryOptions, TicketStore};

use crate::planner::QueryPlan;
use crate::types::ResultSet;

/// Result limit for the ultimate fallback plan.
const FALLBACK_LIMIT: usize = 20;

/// Outcome of one execution attempt chain.
#[derive(Clone, Debug)]
pub struct Execution {
    pub set: ResultSet,
    /// False only when even the ultimate fallback failed. Callers must treat
    /// that as terminal and not retry.
    pub success: bool,
    /// True when the records came from a corrected or fallback plan rather
    /// than the requested one.
    pub degraded: bool,
}

/// Executes query plans against the ticket store.
pub struct QueryExecutor {
    store: Arc<dyn TicketStore>,
    max_retries: usize,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn TicketStore>, max_retries: usize) -> Self {
        Self { store, max_retries }
    }

    /// Execute a plan, correcting it on failure.
    ///
    /// Corrections strip the most likely failing clause first: projection,
    /// then the whole filter. The ultimate fallback has no sort guarantees
    /// beyond insertion order.
    pub async fn execute(&self, plan: &QueryPlan) -> Execution {
        match self.store.find(&plan.filter, &plan.options).await {
            Ok(records) => {
                debug!(
                    count = records.len(),
                    explanation = %plan.explanation,
                    "Query executed"
                );
                return Execution {
                    set: ResultSet::new(records, plan.clone()),
                    success: true,
                    degraded: false,
                };
            }
            Err(e) => {
                warn!(error = %e, explanation = %plan.explanation, "Query rejected, correcting");
            }
        }

        for corrected in self.corrections(plan).into_iter().take(self.max_retries) {
            match self
                .store
                .find(&corrected.filter, &corrected.options)
                .await
            {
                Ok(records) => {
                    debug!(
                        count = records.len(),
                        explanation = %corrected.explanation,
                        "Corrected query executed"
                    );
                    return Execution {
                        set: ResultSet::new(records, corrected),
                        success: true,
                        degraded: true,
                    };
                }
                Err(e) => {
                    warn!(error = %e, explanation = %corrected.explanation, "Correction rejected");
                }
            }
        }

        let fallback = Self::fallback_plan();
        match self.store.find(&fallback.filter, &fallback.options).await {
            Ok(records) => {
                warn!(count = records.len(), "Fell back to unfiltered listing");
                Execution {
                    set: ResultSet::new(records, fallback),
                    success: true,
                    degraded: true,
                }
            }
            Err(e) => {
                warn!(error = %e, "Ultimate fallback failed; store unreachable");
                Execution {
                    set: ResultSet::new(Vec::new(), fallback),
                    success: false,
                    degraded: true,
                }
            }
        }
    }

    /// Progressive simplifications of a failing plan, most conservative
    /// first.
    fn corrections(&self, plan: &QueryPlan) -> Vec<QueryPlan> {
        let mut corrections = Vec::new();

        if plan.options.projection.is_some() {
            let mut corrected = plan.clone();
            corrected.options.projection = None;
            corrected.explanation = format!("{} (projection removed)", plan.explanation);
            corrections.push(corrected);
        }

        if !plan.filter.is_empty() {
            let mut corrected = plan.clone();
            corrected.filter = Filter::empty();
            corrected.options.projection = None;
            corrected.explanation = format!("{} (filter simplified)", plan.explanation);
            corrections.push(corrected);
        }

        corrections
    }

    fn fallback_plan() -> QueryPlan {
        QueryPlan {
            filter: Filter::empty(),
            options: QueryOptions {
                limit: FALLBACK_LIMIT,
                sort: None,
                projection: None,
            },
            explanation: "fallback listing".to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use triage_core::types::{Priority, Ticket, TicketState};
    use triage_store::{Condition, MemoryTicketStore, Sort, StoreError};
    use uuid::Uuid;

    fn ticket(number: &str) -> Ticket {
        let created = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        Ticket {
            id: Uuid::new_v4(),
            number: number.to_string(),
            title: format!("Ticket {}", number),
            customer: "a@example.com".to_string(),
            state: TicketState::Open,
            priority: Priority::Normal,
            queue: "Support".to_string(),
            created_at: created,
            updated_at: created,
            closed_at: None,
            messages: vec![],
            attachments: vec![],
        }
    }

    fn plan_with(
        filter: Filter,
        projection: Option<Vec<String>>,
        sort: Option<Sort>,
    ) -> QueryPlan {
        QueryPlan {
            filter,
            options: QueryOptions {
                limit: 50,
                sort,
                projection,
            },
            explanation: "test plan".to_string(),
        }
    }

    /// Store that rejects any query carrying a non-empty filter.
    struct FilterRejectingStore {
        inner: MemoryTicketStore,
    }

    #[async_trait]
    impl TicketStore for FilterRejectingStore {
        async fn find(
            &self,
            filter: &Filter,
            options: &QueryOptions,
        ) -> Result<Vec<Ticket>, StoreError> {
            if !filter.is_empty() {
                return Err(StoreError::InvalidFilter("rejected".to_string()));
            }
            self.inner.find(filter, options).await
        }

        async fn count(&self) -> Result<usize, StoreError> {
            self.inner.count().await
        }
    }

    /// Store that always fails.
    struct DeadStore;

    #[async_trait]
    impl TicketStore for DeadStore {
        async fn find(
            &self,
            _filter: &Filter,
            _options: &QueryOptions,
        ) -> Result<Vec<Ticket>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn count(&self) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    // ---- Happy path ----

    #[tokio::test]
    async fn test_successful_execution() {
        let store = Arc::new(MemoryTicketStore::with_tickets(vec![
            ticket("T1"),
            ticket("T2"),
        ]));
        let executor = QueryExecutor::new(store, 3);
        let result = executor
            .execute(&plan_with(Filter::empty(), None, None))
            .await;
        assert!(result.success);
        assert!(!result.degraded);
        assert_eq!(result.set.len(), 2);
        assert_eq!(result.set.offset, 0);
    }

    // ---- Correction: bad projection stripped first ----

    #[tokio::test]
    async fn test_bad_projection_corrected() {
        let store = Arc::new(MemoryTicketStore::with_tickets(vec![ticket("T1")]));
        let executor = QueryExecutor::new(store, 3);
        let plan = plan_with(
            Filter::empty(),
            Some(vec!["not_a_field".to_string()]),
            None,
        );
        let result = executor.execute(&plan).await;
        assert!(result.success);
        assert!(result.degraded);
        assert_eq!(result.set.len(), 1);
        assert!(result.set.plan.options.projection.is_none());
    }

    // ---- Correction: filter simplified to empty ----

    #[tokio::test]
    async fn test_rejected_filter_falls_back_to_empty() {
        let store = Arc::new(FilterRejectingStore {
            inner: MemoryTicketStore::with_tickets(vec![ticket("T1"), ticket("T2")]),
        });
        let executor = QueryExecutor::new(store, 3);
        let plan = plan_with(
            Filter::field("state", Condition::Eq(serde_json::json!("open"))),
            None,
            None,
        );
        let result = executor.execute(&plan).await;
        assert!(result.success);
        assert!(result.degraded);
        assert_eq!(result.set.len(), 2);
        assert!(result.set.plan.filter.is_empty());
    }

    // ---- Correction order: projection first, then filter ----

    #[tokio::test]
    async fn test_bad_filter_and_projection_both_corrected() {
        let store = Arc::new(MemoryTicketStore::with_tickets(vec![ticket("T1")]));
        let executor = QueryExecutor::new(store, 3);
        let plan = plan_with(
            Filter::field("bogus_path", Condition::Eq(serde_json::json!("x"))),
            Some(vec!["bogus_field".to_string()]),
            None,
        );
        let result = executor.execute(&plan).await;
        // Dropping the projection alone still leaves the bad filter; the
        // second correction (empty filter) succeeds.
        assert!(result.success);
        assert!(result.degraded);
        assert!(result.set.plan.filter.is_empty());
    }

    // ---- Zero retries go straight to the fallback ----

    #[tokio::test]
    async fn test_zero_retries_uses_fallback() {
        let store = Arc::new(MemoryTicketStore::with_tickets(vec![ticket("T1")]));
        let executor = QueryExecutor::new(store, 0);
        let plan = plan_with(
            Filter::field("bogus_path", Condition::Eq(serde_json::json!("x"))),
            None,
            None,
        );
        let result = executor.execute(&plan).await;
        assert!(result.success);
        assert!(result.degraded);
        assert_eq!(result.set.plan.options.limit, FALLBACK_LIMIT);
    }

    // ---- Ultimate fallback properties ----

    #[tokio::test]
    async fn test_fallback_limit_is_twenty() {
        let tickets: Vec<Ticket> = (0..30).map(|i| ticket(&format!("T{}", i))).collect();
        let store = Arc::new(FilterRejectingStore {
            inner: MemoryTicketStore::with_tickets(tickets),
        });
        // One retry only: the projection correction is skipped (no
        // projection), the filter simplification is the single correction.
        let executor = QueryExecutor::new(store, 1);
        let plan = plan_with(
            Filter::field("state", Condition::Eq(serde_json::json!("open"))),
            None,
            Some(Sort::desc("bogus_sort_field")),
        );
        // The empty-filter correction still carries the bad sort, so it is
        // rejected too; the fallback (no sort) succeeds with limit 20.
        let result = executor.execute(&plan).await;
        assert!(result.success);
        assert_eq!(result.set.len(), 20);
        assert_eq!(result.set.plan.options.limit, FALLBACK_LIMIT);
        assert!(result.set.plan.options.sort.is_none());
    }

    // ---- Store completely unreachable ----

    #[tokio::test]
    async fn test_dead_store_returns_explicit_failure() {
        let executor = QueryExecutor::new(Arc::new(DeadStore), 3);
        let result = executor
            .execute(&plan_with(Filter::empty(), None, None))
            .await;
        assert!(!result.success);
        assert!(result.degraded);
        assert!(result.set.is_empty());
    }
}
