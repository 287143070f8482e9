use std::sync::Arc;

use parking_lot::Mutex;

use super::{Namespaces, Session};

/// Single slot holding the active session, if any.
///
/// Clones share the slot. Every mutation completes under one lock and the
/// lock is never held across an await, so readers never see a torn session.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    slot: Arc<Mutex<Option<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current session.
    pub fn get(&self) -> Option<Session> {
        self.slot.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }

    pub fn topic(&self) -> Option<String> {
        self.slot.lock().as_ref().map(|s| s.topic.clone())
    }

    /// Replace the slot, superseding any previous session.
    pub fn set(&self, session: Session) {
        *self.slot.lock() = Some(session);
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    /// Apply new namespaces (and expiry, when given) if `topic` is current.
    /// Returns the updated session.
    pub fn update_if_topic(
        &self,
        topic: &str,
        namespaces: Namespaces,
        expiry: Option<i64>,
    ) -> Option<Session> {
        let mut slot = self.slot.lock();
        let session = slot.as_mut().filter(|s| s.topic == topic)?;
        session.namespaces = namespaces;
        if expiry.is_some() {
            session.expiry = expiry;
        }
        Some(session.clone())
    }

    /// Empty the slot if `topic` is current. Returns whether it was cleared.
    pub fn clear_if_topic(&self, topic: &str) -> bool {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|s| s.topic == topic) {
            *slot = None;
            true
        } else {
            false
        }
    }
}
