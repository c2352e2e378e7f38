//! In-memory reference implementation of [`TicketStore`].
//!
//! Records are matched as JSON documents against the schema paths in
//! `triage_core::schema`. Queries naming unknown paths are rejected, which
//! is the failure mode the engine's retry-and-simplify loop recovers from.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use triage_core::schema::Concept;
use triage_core::types::Ticket;

use crate::filter::{self, path_value, Filter, QueryOptions, SortOrder};
use crate::store::{StoreError, TicketStore};

/// In-memory ticket store.
///
/// Holds records behind a briefly-held `RwLock`; `find` clones matches out,
/// so no lock is held across awaits. Projection is validated against the
/// schema here and applied by the caller at render time — the typed API
/// always returns whole records.
#[derive(Debug)]
pub struct MemoryTicketStore {
    tickets: RwLock<Vec<Ticket>>,
}

impl MemoryTicketStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            tickets: RwLock::new(Vec::new()),
        }
    }

    /// Create a store pre-loaded with records.
    pub fn with_tickets(tickets: Vec<Ticket>) -> Self {
        Self {
            tickets: RwLock::new(tickets),
        }
    }

    /// Load records from a JSON file containing an array of tickets.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Unavailable(format!("read {}: {}", path.display(), e)))?;
        let tickets: Vec<Ticket> = serde_json::from_str(&content)
            .map_err(|e| StoreError::Unavailable(format!("parse {}: {}", path.display(), e)))?;
        debug!(count = tickets.len(), "Loaded tickets from file");
        Ok(Self::with_tickets(tickets))
    }

    /// Insert a record (used by fixtures and tests).
    pub fn insert(&self, ticket: Ticket) {
        let mut tickets = self.tickets.write().unwrap_or_else(|e| e.into_inner());
        tickets.push(ticket);
    }

    /// Validate a query against the known schema.
    fn validate(filter: &Filter, options: &QueryOptions) -> Result<(), StoreError> {
        let known: Vec<&str> = Concept::known_paths().collect();

        for path in filter.0.keys() {
            if !known.contains(&path.as_str()) {
                return Err(StoreError::InvalidFilter(format!(
                    "unknown field path '{}'",
                    path
                )));
            }
        }

        if let Some(ref sort) = options.sort {
            if !known.contains(&sort.field.as_str()) {
                return Err(StoreError::InvalidSort(format!(
                    "unknown sort field '{}'",
                    sort.field
                )));
            }
        }

        if let Some(ref projection) = options.projection {
            for field in projection {
                // Only top-level fields are projectable.
                if !known.contains(&field.as_str()) || field.contains('.') {
                    return Err(StoreError::InvalidProjection(format!(
                        "field '{}' is not projectable",
                        field
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for MemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn find(
        &self,
        filter: &Filter,
        options: &QueryOptions,
    ) -> Result<Vec<Ticket>, StoreError> {
        Self::validate(filter, options)?;

        let matched: Vec<(Ticket, Value)> = {
            let tickets = self.tickets.read().unwrap_or_else(|e| e.into_inner());
            tickets
                .iter()
                .filter_map(|t| {
                    let doc = serde_json::to_value(t).ok()?;
                    filter.matches(&doc).then(|| (t.clone(), doc))
                })
                .collect()
        };

        let mut matched = matched;
        if let Some(ref sort) = options.sort {
            // Vec::sort_by is stable: ties keep insertion order, so repeated
            // identical queries return identical orderings.
            matched.sort_by(|(_, a), (_, b)| {
                let ord = match (path_value(a, &sort.field), path_value(b, &sort.field)) {
                    (Some(x), Some(y)) => filter::compare(x, y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match sort.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        matched.truncate(options.limit);
        debug!(
            matched = matched.len(),
            limit = options.limit,
            "Memory store find"
        );
        Ok(matched.into_iter().map(|(t, _)| t).collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let tickets = self.tickets.read().unwrap_or_else(|e| e.into_inner());
        Ok(tickets.len())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use triage_core::types::{Priority, SenderRole, TicketMessage, TicketState};
    use uuid::Uuid;

    use crate::filter::{Condition, Sort};

    fn ticket(number: &str, state: TicketState, customer: &str, day: u32) -> Ticket {
        let created = Utc.with_ymd_and_hms(2025, 1, day, 9, 0, 0).unwrap();
        Ticket {
            id: Uuid::new_v4(),
            number: number.to_string(),
            title: format!("Ticket {}", number),
            customer: customer.to_string(),
            state,
            priority: Priority::Normal,
            queue: "Support".to_string(),
            created_at: created,
            updated_at: created,
            closed_at: None,
            messages: vec![TicketMessage {
                sender: SenderRole::Customer,
                body: format!("Problem report {}", number),
                created_at: created,
                internal: false,
            }],
            attachments: vec![],
        }
    }

    fn seeded_store() -> MemoryTicketStore {
        MemoryTicketStore::with_tickets(vec![
            ticket("T1", TicketState::Open, "alice@example.com", 1),
            ticket("T2", TicketState::Closed, "bob@example.com", 2),
            ticket("T3", TicketState::New, "alice@example.com", 3),
            ticket("T4", TicketState::Pending, "carol@example.com", 4),
        ])
    }

    // ---- Basic finds ----

    #[tokio::test]
    async fn test_empty_filter_returns_all() {
        let store = seeded_store();
        let results = store
            .find(&Filter::empty(), &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 4);
    }

    #[tokio::test]
    async fn test_state_equality_filter() {
        let store = seeded_store();
        let f = Filter::field("state", Condition::Eq(json!("open")));
        let results = store.find(&f, &QueryOptions::default()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].number, "T1");
    }

    #[tokio::test]
    async fn test_state_in_filter() {
        let store = seeded_store();
        let f = Filter::field(
            "state",
            Condition::In(vec![json!("new"), json!("open"), json!("pending")]),
        );
        let results = store.find(&f, &QueryOptions::default()).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_customer_filter() {
        let store = seeded_store();
        let f = Filter::field("customer", Condition::Eq(json!("alice@example.com")));
        let results = store.find(&f, &QueryOptions::default()).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_message_body_contains() {
        let store = seeded_store();
        let f = Filter::field("messages.body", Condition::Contains("report T2".to_string()));
        let results = store.find(&f, &QueryOptions::default()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].number, "T2");
    }

    // ---- Sorting and limits ----

    #[tokio::test]
    async fn test_sort_created_desc() {
        let store = seeded_store();
        let opts = QueryOptions {
            sort: Some(Sort::desc("created_at")),
            ..QueryOptions::default()
        };
        let results = store.find(&Filter::empty(), &opts).await.unwrap();
        let numbers: Vec<_> = results.iter().map(|t| t.number.as_str()).collect();
        assert_eq!(numbers, vec!["T4", "T3", "T2", "T1"]);
    }

    #[tokio::test]
    async fn test_sort_is_stable_across_calls() {
        let store = seeded_store();
        let opts = QueryOptions {
            sort: Some(Sort::desc("created_at")),
            ..QueryOptions::default()
        };
        let first = store.find(&Filter::empty(), &opts).await.unwrap();
        let second = store.find(&Filter::empty(), &opts).await.unwrap();
        let a: Vec<_> = first.iter().map(|t| t.number.clone()).collect();
        let b: Vec<_> = second.iter().map(|t| t.number.clone()).collect();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_limit_truncates() {
        let store = seeded_store();
        let opts = QueryOptions::with_limit(2);
        let results = store.find(&Filter::empty(), &opts).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_limit_zero_returns_nothing() {
        let store = seeded_store();
        let opts = QueryOptions::with_limit(0);
        let results = store.find(&Filter::empty(), &opts).await.unwrap();
        assert!(results.is_empty());
    }

    // ---- Validation / rejection ----

    #[tokio::test]
    async fn test_unknown_filter_path_rejected() {
        let store = seeded_store();
        let f = Filter::field("secret_field", Condition::Eq(json!("x")));
        let err = store.find(&f, &QueryOptions::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn test_unknown_sort_field_rejected() {
        let store = seeded_store();
        let opts = QueryOptions {
            sort: Some(Sort::desc("bogus")),
            ..QueryOptions::default()
        };
        let err = store.find(&Filter::empty(), &opts).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidSort(_)));
    }

    #[tokio::test]
    async fn test_unknown_projection_field_rejected() {
        let store = seeded_store();
        let opts = QueryOptions {
            projection: Some(vec!["bogus".to_string()]),
            ..QueryOptions::default()
        };
        let err = store.find(&Filter::empty(), &opts).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidProjection(_)));
    }

    #[tokio::test]
    async fn test_nested_projection_rejected() {
        let store = seeded_store();
        let opts = QueryOptions {
            projection: Some(vec!["messages.body".to_string()]),
            ..QueryOptions::default()
        };
        let err = store.find(&Filter::empty(), &opts).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidProjection(_)));
    }

    #[tokio::test]
    async fn test_valid_projection_accepted() {
        let store = seeded_store();
        let opts = QueryOptions {
            projection: Some(vec!["number".to_string()]),
            ..QueryOptions::default()
        };
        let results = store.find(&Filter::empty(), &opts).await.unwrap();
        assert_eq!(results.len(), 4);
    }

    // ---- Misc ----

    #[tokio::test]
    async fn test_count() {
        let store = seeded_store();
        assert_eq!(store.count().await.unwrap(), 4);
        assert_eq!(MemoryTicketStore::new().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert() {
        let store = MemoryTicketStore::new();
        store.insert(ticket("T9", TicketState::Open, "x@example.com", 9));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.json");
        let tickets = vec![ticket("T1", TicketState::Open, "a@example.com", 1)];
        std::fs::write(&path, serde_json::to_string(&tickets).unwrap()).unwrap();

        let store = MemoryTicketStore::from_json_file(&path).unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_from_json_file_missing() {
        let err = MemoryTicketStore::from_json_file(Path::new("/nonexistent/tickets.json"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
