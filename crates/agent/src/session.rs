//! In-memory session store.
//!
//! Sessions are keyed by id and fully independent; the store's lock brackets
//! each turn, so a session observes its turns one at a time and a turn never
//! sees a half-applied record. Losing the process loses the sessions, which
//! is the intended durability for an interview this short.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Mutex;

use chrono::Utc;
use cotiza_core::domain::question::QuestionKey;
use cotiza_core::domain::record::QuotationRecord;
use cotiza_core::flows::FlowState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One client's interview: flow position, answered keys and the record
/// built so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntakeSession {
    pub state: FlowState,
    pub answered: BTreeSet<QuestionKey>,
    pub record: QuotationRecord,
}

impl IntakeSession {
    pub fn new() -> Self {
        Self {
            state: FlowState::Idle,
            answered: BTreeSet::new(),
            record: QuotationRecord::new(Utc::now()),
        }
    }
}

impl Default for IntakeSession {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, IntakeSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> SessionId {
        let id = SessionId::generate();
        self.lock().insert(id.clone(), IntakeSession::new());
        id
    }

    /// Runs `operate` with exclusive access to one session. Returns `None`
    /// when the id is unknown.
    pub fn with_session<T>(
        &self,
        id: &SessionId,
        operate: impl FnOnce(&mut IntakeSession) -> T,
    ) -> Option<T> {
        let mut sessions = self.lock();
        sessions.get_mut(id).map(operate)
    }

    pub fn snapshot(&self, id: &SessionId) -> Option<IntakeSession> {
        self.lock().get(id).cloned()
    }

    pub fn remove(&self, id: &SessionId) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, IntakeSession>> {
        // A poisoned lock means a panic mid-turn; the map itself is still
        // structurally sound, so keep serving the other sessions.
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use cotiza_core::flows::FlowState;

    use super::SessionStore;

    #[test]
    fn created_sessions_start_idle_and_empty() {
        let store = SessionStore::new();
        let id = store.create();

        let session = store.snapshot(&id).expect("session exists");
        assert_eq!(session.state, FlowState::Idle);
        assert!(session.answered.is_empty());
        assert!(session.record.client_name.is_none());
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new();
        let first = store.create();
        let second = store.create();

        store.with_session(&first, |session| {
            session.record.client_name = Some("Laura".to_string());
        });

        let untouched = store.snapshot(&second).expect("second session exists");
        assert!(untouched.record.client_name.is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn removal_forgets_the_session() {
        let store = SessionStore::new();
        let id = store.create();

        assert!(store.remove(&id));
        assert!(!store.remove(&id));
        assert!(store.snapshot(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_ids_yield_none() {
        let store = SessionStore::new();
        assert!(store.with_session(&super::SessionId::from("missing"), |_| ()).is_none());
    }
}
