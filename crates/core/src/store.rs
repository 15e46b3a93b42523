//! Concurrent in-memory session store.
//!
//! The outer map lock is only held to look up or insert a session; each
//! session sits behind its own mutex, so updates to one job never wait on
//! another. Readers always receive an owned [`Session`] clone.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;

use crate::error::CoreError;
use crate::request::ScrapeRequest;
use crate::session::{Outcome, ProgressEntry, Session, SessionStatus};
use crate::types::{SessionId, Timestamp};

const ENTITY: &str = "Session";

type SessionCell = Arc<Mutex<Session>>;

/// Owner of every [`Session`]. Share it as `Arc<SessionStore>`.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionCell>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new `Running` session and return its identifier.
    pub fn create(&self, request: ScrapeRequest) -> SessionId {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        loop {
            let id = uuid::Uuid::now_v7();
            if let Entry::Vacant(slot) = sessions.entry(id) {
                slot.insert(Arc::new(Mutex::new(Session::new(id, request, Utc::now()))));
                return id;
            }
        }
    }

    /// Snapshot of a session, or `None` if the id is unknown.
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        let cell = self.cell(id)?;
        let session = lock(&cell);
        Some(session.clone())
    }

    /// Append one progress line to a running session.
    ///
    /// Fails with [`CoreError::Conflict`] once the session is terminal.
    pub fn append_progress(
        &self,
        id: &SessionId,
        message: impl Into<String>,
    ) -> Result<(), CoreError> {
        let cell = self.require(id)?;
        let mut session = lock(&cell);
        if session.status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "session {id} is already {}",
                session.status.as_str()
            )));
        }
        session.progress.push(ProgressEntry {
            timestamp: Utc::now(),
            message: message.into(),
        });
        Ok(())
    }

    /// Move a running session to its terminal state.
    ///
    /// A second call on the same session is rejected and leaves the first
    /// outcome untouched.
    pub fn finalize(&self, id: &SessionId, outcome: Outcome) -> Result<SessionStatus, CoreError> {
        let cell = self.require(id)?;
        let mut session = lock(&cell);
        if session.status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "session {id} was already finalized as {}",
                session.status.as_str()
            )));
        }
        let status = outcome.status();
        match outcome {
            Outcome::Completed(result) => session.result = Some(result),
            Outcome::Failed(detail) => session.error = Some(detail),
        }
        session.status = status;
        session.finished_at = Some(Utc::now());
        Ok(status)
    }

    /// Number of stored sessions, terminal or not.
    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    /// Number of sessions still `Running`.
    pub fn running_count(&self) -> usize {
        self.cells()
            .iter()
            .filter(|cell| lock(cell).status == SessionStatus::Running)
            .count()
    }

    /// Drop terminal sessions that finished before `cutoff`.
    ///
    /// Running sessions are never evicted. Returns how many were removed.
    pub fn purge_finished_before(&self, cutoff: Timestamp) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, cell| {
            let session = lock(cell);
            !matches!(session.finished_at, Some(finished) if finished < cutoff)
        });
        before - sessions.len()
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<SessionId, SessionCell>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn cells(&self) -> Vec<SessionCell> {
        self.read_map().values().cloned().collect()
    }

    fn cell(&self, id: &SessionId) -> Option<SessionCell> {
        self.read_map().get(id).cloned()
    }

    fn require(&self, id: &SessionId) -> Result<SessionCell, CoreError> {
        self.cell(id).ok_or_else(|| CoreError::NotFound {
            entity: ENTITY,
            id: id.to_string(),
        })
    }
}

/// Session mutations are single assignments, so a poisoned lock still
/// guards a consistent record.
fn lock(cell: &SessionCell) -> MutexGuard<'_, Session> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::request::SubmitScrape;

    fn request(url: &str) -> ScrapeRequest {
        SubmitScrape::for_url(url).normalize().unwrap()
    }

    #[test]
    fn create_starts_running_with_empty_progress() {
        let store = SessionStore::new();
        let id = store.create(request("https://example.com"));

        let session = store.get(&id).unwrap();
        assert_eq!(session.id, id);
        assert_eq!(session.status, SessionStatus::Running);
        assert!(session.progress.is_empty());
        assert!(session.result.is_none());
        assert!(session.error.is_none());
        assert!(session.finished_at.is_none());
    }

    #[test]
    fn get_unknown_id_is_none() {
        let store = SessionStore::new();
        assert!(store.get(&uuid::Uuid::now_v7()).is_none());
    }

    #[test]
    fn ids_are_time_ordered() {
        let store = SessionStore::new();
        let first = store.create(request("https://a.example"));
        let second = store.create(request("https://b.example"));
        assert!(first < second);
    }

    #[test]
    fn snapshots_do_not_alias_store_state() {
        let store = SessionStore::new();
        let id = store.create(request("https://example.com"));
        store.append_progress(&id, "[*] one").unwrap();

        let snapshot = store.get(&id).unwrap();
        store.append_progress(&id, "[*] two").unwrap();

        assert_eq!(snapshot.progress.len(), 1);
        assert_eq!(store.get(&id).unwrap().progress.len(), 2);
    }

    #[test]
    fn progress_is_appended_in_order() {
        let store = SessionStore::new();
        let id = store.create(request("https://example.com"));
        store.append_progress(&id, "[*] step1").unwrap();
        store.append_progress(&id, "[+] done").unwrap();

        let messages: Vec<String> = store
            .get(&id)
            .unwrap()
            .progress
            .into_iter()
            .map(|p| p.message)
            .collect();
        assert_eq!(messages, ["[*] step1", "[+] done"]);
    }

    #[test]
    fn finalize_completed_sets_result_once() {
        let store = SessionStore::new();
        let id = store.create(request("https://example.com"));

        let status = store
            .finalize(&id, Outcome::Completed(json!({"homepage": []})))
            .unwrap();
        assert_eq!(status, SessionStatus::Completed);

        let second = store.finalize(&id, Outcome::Failed("late".into()));
        assert_matches!(second, Err(CoreError::Conflict(_)));

        let session = store.get(&id).unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.result, Some(json!({"homepage": []})));
        assert!(session.error.is_none());
        assert!(session.finished_at.is_some());
    }

    #[test]
    fn progress_is_frozen_after_finalize() {
        let store = SessionStore::new();
        let id = store.create(request("https://example.com"));
        store.append_progress(&id, "[*] before").unwrap();
        store.finalize(&id, Outcome::Failed("boom".into())).unwrap();

        assert_matches!(
            store.append_progress(&id, "[*] after"),
            Err(CoreError::Conflict(_))
        );
        let session = store.get(&id).unwrap();
        assert_eq!(session.progress.len(), 1);
        assert_eq!(session.error.as_deref(), Some("boom"));
    }

    #[test]
    fn mutations_on_unknown_id_are_not_found() {
        let store = SessionStore::new();
        let id = uuid::Uuid::now_v7();
        assert_matches!(
            store.append_progress(&id, "[*] x"),
            Err(CoreError::NotFound { entity: "Session", .. })
        );
        assert_matches!(
            store.finalize(&id, Outcome::Failed("x".into())),
            Err(CoreError::NotFound { .. })
        );
    }

    #[test]
    fn concurrent_creates_yield_unique_ids() {
        let store = Arc::new(SessionStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..50)
                        .map(|i| store.create(request(&format!("https://{t}-{i}.example"))))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<SessionId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(ids.len(), 400);
        assert_eq!(store.len(), 400);
    }

    #[test]
    fn running_count_excludes_terminal_sessions() {
        let store = SessionStore::new();
        let a = store.create(request("https://a.example"));
        let _b = store.create(request("https://b.example"));
        store.finalize(&a, Outcome::Failed("x".into())).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.running_count(), 1);
    }

    #[test]
    fn purge_only_removes_old_terminal_sessions() {
        let store = SessionStore::new();
        let done = store.create(request("https://a.example"));
        let running = store.create(request("https://b.example"));
        store
            .finalize(&done, Outcome::Completed(json!({"homepage": []})))
            .unwrap();

        assert_eq!(store.purge_finished_before(Utc::now() - chrono::Duration::hours(1)), 0);
        assert_eq!(store.purge_finished_before(Utc::now() + chrono::Duration::seconds(1)), 1);

        assert!(store.get(&done).is_none());
        assert!(store.get(&running).is_some());
    }
}
