use crate::models::UserId;
use crate::session::{Progress, Session};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub type SessionSlot = Arc<Mutex<Session>>;

/// At most one session per user. Each session sits behind its own mutex so
/// answers for one user are applied one at a time while other users proceed.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<UserId, SessionSlot>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `session`, replacing any session the user already had. The
    /// slot is locked before it becomes visible, so no answer can reach it
    /// until the caller drops the guard.
    pub async fn create(&self, session: Session) -> (SessionSlot, OwnedMutexGuard<Session>) {
        let user_id = session.user_id();
        let slot = Arc::new(Mutex::new(session));
        let guard = slot.clone().lock_owned().await;
        self.sessions.insert(user_id, slot.clone());
        (slot, guard)
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.sessions.contains_key(&user_id)
    }

    pub fn get(&self, user_id: UserId) -> Option<SessionSlot> {
        self.sessions.get(&user_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, user_id: UserId) {
        self.sessions.remove(&user_id);
    }

    /// Removes the entry only if it is still `slot`; a newer session for the
    /// same user is left alone.
    pub fn remove_if_current(&self, user_id: UserId, slot: &SessionSlot) -> bool {
        self.sessions
            .remove_if(&user_id, |_, existing| Arc::ptr_eq(existing, slot))
            .is_some()
    }

    pub fn is_current(&self, user_id: UserId, slot: &SessionSlot) -> bool {
        self.sessions
            .get(&user_id)
            .map(|entry| Arc::ptr_eq(entry.value(), slot))
            .unwrap_or(false)
    }

    pub async fn progress(&self, user_id: UserId) -> Option<Progress> {
        let slot = self.get(user_id)?;
        let guard = slot.lock().await;
        Some(guard.progress())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
