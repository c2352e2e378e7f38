//! Per-session conversational memory.
//!
//! Sessions are keyed by a caller-supplied opaque id, created lazily,
//! mutated only by the orchestrator, and evicted by an explicit [`sweep`]
//! driven by a scheduler. The clock is injected so expiry is deterministic
//! under test.
//!
//! [`sweep`]: SessionStore::sweep

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::planner::QueryPlan;
use crate::types::{Interaction, ResultSet};

// =============================================================================
// Clock
// =============================================================================

/// Time source for session bookkeeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// Session state
// =============================================================================

/// Last-known entities and cached results carried between turns.
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    pub last_customer: Option<String>,
    pub last_ticket: Option<String>,
    pub last_queue: Option<String>,
    /// The most recently executed plan.
    pub last_plan: Option<QueryPlan>,
    /// The most recent result set, held until replaced or evicted.
    pub last_results: Option<ResultSet>,
    /// Pagination cursor into `last_results`. `None` until a page is shown.
    pub offset: Option<usize>,
}

/// A clarification question the assistant asked and is waiting on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingClarification {
    /// The message that could not be resolved.
    pub original: String,
    /// The question asked back to the caller.
    pub question: String,
}

/// One conversation's state.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    /// Ring buffer of past turns, oldest first.
    pub history: VecDeque<Interaction>,
    pub context: SessionContext,
    pub clarification: Option<PendingClarification>,
    pub last_activity: DateTime<Utc>,
    history_capacity: usize,
}

impl Session {
    pub(crate) fn new(id: String, now: DateTime<Utc>, history_capacity: usize) -> Self {
        Self {
            id,
            history: VecDeque::with_capacity(history_capacity),
            context: SessionContext::default(),
            clarification: None,
            last_activity: now,
            history_capacity,
        }
    }

    /// Append a turn, evicting the oldest when over capacity.
    pub fn record(&mut self, interaction: Interaction) {
        self.history.push_back(interaction);
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
    }

    /// The last 3 turns, oldest first, for the classifier's context.
    pub fn recent_turns(&self, count: usize) -> impl Iterator<Item = &Interaction> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip)
    }
}

/// Read-only projection of a session for diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub id: String,
    pub history_len: usize,
    pub last_activity: DateTime<Utc>,
    pub has_cached_results: bool,
    pub last_action: Option<String>,
}

// =============================================================================
// SessionStore
// =============================================================================

/// Owner of all session state.
///
/// Entries are independently keyed: each session lives behind its own async
/// mutex, so turns within one session serialize while distinct sessions
/// proceed concurrently. The outer map lock is only ever held for map
/// operations, never across a turn.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    clock: Arc<dyn Clock>,
    expiry: Duration,
    history_capacity: usize,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>, expiry_minutes: u32, history_capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            expiry: Duration::minutes(i64::from(expiry_minutes)),
            history_capacity,
        }
    }

    /// Current time from the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Get the session for `id`, creating it lazily.
    ///
    /// The caller locks the returned handle for the duration of a turn.
    pub fn entry(&self, id: &str) -> Arc<Mutex<Session>> {
        {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            if let Some(session) = sessions.get(id) {
                return Arc::clone(session);
            }
        }

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(sessions.entry(id.to_string()).or_insert_with(|| {
            debug!(session_id = id, "Session created");
            Arc::new(Mutex::new(Session::new(
                id.to_string(),
                self.clock.now(),
                self.history_capacity,
            )))
        }))
    }

    /// Read-only projection of a session; `None` if it does not exist.
    pub async fn inspect(&self, id: &str) -> Option<SessionView> {
        let handle = {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            sessions.get(id).map(Arc::clone)?
        };
        let session = handle.lock().await;
        Some(SessionView {
            id: session.id.clone(),
            history_len: session.history.len(),
            last_activity: session.last_activity,
            has_cached_results: session
                .context
                .last_results
                .as_ref()
                .is_some_and(|r| !r.is_empty()),
            last_action: session.history.back().map(|i| i.action.clone()),
        })
    }

    /// Delete a session immediately. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let removed = sessions.remove(id).is_some();
        if removed {
            debug!(session_id = id, "Session removed");
        }
        removed
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict sessions inactive longer than the expiry window.
    ///
    /// Safe to run beside active request handling: sessions currently
    /// mid-turn hold their mutex and are skipped (`try_lock`), and expiry is
    /// re-checked under the write lock before removal.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();

        let candidates: Vec<String> = {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            sessions
                .iter()
                .filter_map(|(id, handle)| {
                    let session = handle.try_lock().ok()?;
                    (now - session.last_activity > self.expiry).then(|| id.clone())
                })
                .collect()
        };

        if candidates.is_empty() {
            debug!("Session sweep found nothing to evict");
            return 0;
        }

        let mut evicted = 0;
        {
            let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
            for id in candidates {
                let still_expired = sessions.get(&id).is_some_and(|handle| {
                    handle
                        .try_lock()
                        .map(|s| now - s.last_activity > self.expiry)
                        .unwrap_or(false)
                });
                if still_expired {
                    sessions.remove(&id);
                    evicted += 1;
                }
            }
        }

        info!(evicted, "Session sweep complete");
        evicted
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Test clock that only moves when told to.
    struct ManualClock {
        now: StdMutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: StdMutex::new(start),
            }
        }

        fn advance(&self, minutes: i64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::minutes(minutes);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn interaction(input: &str) -> Interaction {
        Interaction {
            input: input.to_string(),
            action: "chat".to_string(),
            response: "ok".to_string(),
            plan: None,
            result_count: 0,
            success: true,
            at: Utc::now(),
        }
    }

    fn make_store() -> (Arc<ManualClock>, SessionStore) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = SessionStore::new(Arc::clone(&clock) as Arc<dyn Clock>, 120, 10);
        (clock, store)
    }

    // ---- Entry / lazy creation ----

    #[tokio::test]
    async fn test_entry_creates_lazily() {
        let (_, store) = make_store();
        assert!(store.is_empty());
        let _handle = store.entry("default");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_entry_returns_same_session() {
        let (_, store) = make_store();
        let a = store.entry("s1");
        {
            let mut session = a.lock().await;
            session.record(interaction("hello"));
        }
        let b = store.entry("s1");
        assert_eq!(b.lock().await.history.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_ids_distinct_sessions() {
        let (_, store) = make_store();
        store.entry("a");
        store.entry("b");
        assert_eq!(store.len(), 2);
    }

    // ---- Ring buffer ----

    #[tokio::test]
    async fn test_history_never_exceeds_capacity() {
        let (_, store) = make_store();
        let handle = store.entry("s1");
        let mut session = handle.lock().await;
        for i in 0..25 {
            session.record(interaction(&format!("turn {}", i)));
        }
        assert_eq!(session.history.len(), 10);
        // Oldest evicted first.
        assert_eq!(session.history.front().unwrap().input, "turn 15");
        assert_eq!(session.history.back().unwrap().input, "turn 24");
    }

    #[tokio::test]
    async fn test_recent_turns_returns_last_three() {
        let (_, store) = make_store();
        let handle = store.entry("s1");
        let mut session = handle.lock().await;
        for i in 0..5 {
            session.record(interaction(&format!("turn {}", i)));
        }
        let recent: Vec<_> = session.recent_turns(3).map(|i| i.input.clone()).collect();
        assert_eq!(recent, vec!["turn 2", "turn 3", "turn 4"]);
    }

    #[tokio::test]
    async fn test_recent_turns_short_history() {
        let (_, store) = make_store();
        let handle = store.entry("s1");
        let mut session = handle.lock().await;
        session.record(interaction("only"));
        let recent: Vec<_> = session.recent_turns(3).collect();
        assert_eq!(recent.len(), 1);
    }

    // ---- Inspection ----

    #[tokio::test]
    async fn test_inspect_missing_session() {
        let (_, store) = make_store();
        assert!(store.inspect("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_inspect_projects_state() {
        let (_, store) = make_store();
        let handle = store.entry("s1");
        {
            let mut session = handle.lock().await;
            session.record(interaction("hello"));
        }
        let view = store.inspect("s1").await.unwrap();
        assert_eq!(view.id, "s1");
        assert_eq!(view.history_len, 1);
        assert!(!view.has_cached_results);
        assert_eq!(view.last_action.as_deref(), Some("chat"));
    }

    // ---- Removal ----

    #[tokio::test]
    async fn test_remove_existing() {
        let (_, store) = make_store();
        store.entry("s1");
        assert!(store.remove("s1"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing() {
        let (_, store) = make_store();
        assert!(!store.remove("ghost"));
    }

    // ---- Sweep ----

    #[tokio::test]
    async fn test_sweep_evicts_expired() {
        let (clock, store) = make_store();
        store.entry("old");
        clock.advance(121);
        assert_eq!(store.sweep(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_keeps_active() {
        let (clock, store) = make_store();
        store.entry("old");
        clock.advance(121);
        store.entry("fresh");
        {
            // Touch the fresh session so its last_activity is current.
            let handle = store.entry("fresh");
            let mut session = handle.lock().await;
            session.last_activity = clock.now();
        }
        assert_eq!(store.sweep(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.inspect("fresh").await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_exact_boundary_not_evicted() {
        let (clock, store) = make_store();
        store.entry("edge");
        clock.advance(120); // exactly at the window: > is strict
        assert_eq!(store.sweep(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_skips_locked_sessions() {
        let (clock, store) = make_store();
        let handle = store.entry("busy");
        clock.advance(200);
        let _guard = handle.lock().await; // mid-turn
        assert_eq!(store.sweep(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_empty_store() {
        let (_, store) = make_store();
        assert_eq!(store.sweep(), 0);
    }

    // ---- Concurrency ----

    #[tokio::test]
    async fn test_concurrent_entry_same_id() {
        let (_, store) = make_store();
        let store = Arc::new(store);
        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let handle = store.entry("shared");
                let mut session = handle.lock().await;
                session.record(interaction("concurrent"));
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.len(), 1);
        let view = store.inspect("shared").await.unwrap();
        assert_eq!(view.history_len, 10);
    }
}
