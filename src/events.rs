//! Session observers.
//!
//! Handlers are stored in an [`IndexMap`] keyed by [`HandlerId`] so dispatch
//! follows registration order and removal is O(1). Dispatch is synchronous:
//! `emit` returns after every handler has run.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::session::Session;

/// Notification published by the session core.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A pairing URI is ready to be scanned or deep-linked
    QrReady(String),
    Connected(Session),
    SessionUpdated(Session),
    Disconnected,
    SessionExpired,
    Error(Error),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::QrReady(_) => "qr_ready",
            Self::Connected(_) => "connected",
            Self::SessionUpdated(_) => "session_updated",
            Self::Disconnected => "disconnected",
            Self::SessionExpired => "session_expired",
            Self::Error(_) => "error",
        }
    }
}

pub type HandlerId = u64;

pub type EventHandler = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

type HandlerMap = Mutex<IndexMap<HandlerId, EventHandler>>;

/// Observer registry shared by the lifecycle controller, bridge and relay.
#[derive(Clone, Default)]
pub struct EventHub {
    handlers: Arc<HandlerMap>,
    next_id: Arc<AtomicU64>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`; it stays registered until the returned
    /// [`Subscription`] is dropped or [`EventHub::clear`] runs.
    #[must_use = "dropping the subscription unregisters the handler"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.handlers.lock().insert(id, Arc::new(handler));
        Subscription {
            id,
            handlers: Some(Arc::downgrade(&self.handlers)),
        }
    }

    /// Forward every event into an unbounded channel.
    pub fn channel(&self) -> (Subscription, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        (subscription, rx)
    }

    /// Deliver `event` to every handler in registration order.
    pub fn emit(&self, event: SessionEvent) {
        // Snapshot so handlers may (un)subscribe without deadlocking.
        let handlers: Vec<EventHandler> = self.handlers.lock().values().cloned().collect();
        tracing::trace!(event = event.name(), handlers = handlers.len(), "dispatching");
        for handler in handlers {
            handler(&event);
        }
    }

    /// Release every registration.
    pub fn clear(&self) {
        self.handlers.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("handlers", &self.len())
            .finish()
    }
}

/// RAII handle that unregisters its handler on drop.
///
/// Holds a weak reference, so dropping it after the hub is gone is a no-op.
pub struct Subscription {
    id: HandlerId,
    handlers: Option<Weak<HandlerMap>>,
}

impl Subscription {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Keep the handler registered for the hub's lifetime.
    pub fn detach(mut self) {
        self.handlers = None;
    }

    /// Explicitly unsubscribe. Equivalent to dropping.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(map) = self.handlers.take().and_then(|weak| weak.upgrade()) {
            map.lock().shift_remove(&self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(hub: &EventHub) -> (Subscription, Arc<Mutex<Vec<&'static str>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = hub.subscribe(move |event| sink.lock().push(event.name()));
        (sub, seen)
    }

    #[test]
    fn test_dispatch_in_order() {
        let hub = EventHub::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = order.clone();
        let _a = hub.subscribe(move |_| first.lock().push(1));
        let second = order.clone();
        let _b = hub.subscribe(move |_| second.lock().push(2));

        hub.emit(SessionEvent::Disconnected);
        hub.emit(SessionEvent::SessionExpired);

        assert_eq!(*order.lock(), vec![1, 2, 1, 2]);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = EventHub::new();
        let (sub, seen) = recorder(&hub);

        hub.emit(SessionEvent::Disconnected);
        drop(sub);
        hub.emit(SessionEvent::Disconnected);

        assert_eq!(*seen.lock(), vec!["disconnected"]);
        assert!(hub.is_empty());
    }

    #[test]
    fn test_clear_releases_detached_handlers() {
        let hub = EventHub::new();
        let (sub, seen) = recorder(&hub);
        sub.detach();

        hub.emit(SessionEvent::QrReady("wc:abc".into()));
        hub.clear();
        hub.emit(SessionEvent::QrReady("wc:abc".into()));

        assert_eq!(*seen.lock(), vec!["qr_ready"]);
    }

    #[test]
    fn test_handler_may_subscribe_during_dispatch() {
        let hub = EventHub::new();
        let inner = hub.clone();
        let _sub = hub.subscribe(move |_| inner.subscribe(|_| {}).detach());

        hub.emit(SessionEvent::Disconnected);
        assert_eq!(hub.len(), 2);
    }

    #[tokio::test]
    async fn test_channel_receives_events() {
        let hub = EventHub::new();
        let (_sub, mut rx) = hub.channel();

        hub.emit(SessionEvent::SessionExpired);
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::SessionExpired));
    }
}
