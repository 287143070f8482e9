//! Reconciles relay push events into the session store.

use crate::events::{EventHub, SessionEvent};
use crate::session::SessionStore;
use crate::transport::{PushEvent, PushHandler, Transport};

/// Applies `session_update` / `session_delete` / `session_expire` pushes.
///
/// Events naming a topic other than the active session's are ignored.
#[derive(Debug, Clone)]
pub struct EventRelay {
    store: SessionStore,
    events: EventHub,
}

impl EventRelay {
    pub fn new(store: SessionStore, events: EventHub) -> Self {
        Self { store, events }
    }

    /// Register this relay as a push handler on `transport`.
    pub fn attach(&self, transport: &dyn Transport) {
        let relay = self.clone();
        let handler: PushHandler = std::sync::Arc::new(move |event| relay.handle(event));
        transport.on(handler);
    }

    pub fn handle(&self, event: PushEvent) {
        match event {
            PushEvent::SessionUpdate {
                topic,
                namespaces,
                expiry,
            } => match self.store.update_if_topic(&topic, namespaces, expiry) {
                Some(session) => {
                    tracing::info!(%topic, "session updated by wallet");
                    self.events.emit(SessionEvent::SessionUpdated(session));
                }
                None => tracing::debug!(%topic, "ignoring session_update for unknown topic"),
            },
            PushEvent::SessionDelete { topic } => {
                if self.store.clear_if_topic(&topic) {
                    tracing::info!(%topic, "session deleted by wallet");
                    self.events.emit(SessionEvent::Disconnected);
                } else {
                    tracing::debug!(%topic, "ignoring session_delete for unknown topic");
                }
            }
            PushEvent::SessionExpire { topic } => {
                if self.store.clear_if_topic(&topic) {
                    tracing::info!(%topic, "session expired");
                    self.events.emit(SessionEvent::SessionExpired);
                } else {
                    tracing::debug!(%topic, "ignoring session_expire for unknown topic");
                }
            }
        }
    }
}
