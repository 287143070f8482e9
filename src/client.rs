//! Lifecycle controller: initialize → connect → use → disconnect → cleanup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex, OnceCell};

use crate::bridge::{RequestBridge, TransportCell};
use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::events::{EventHub, SessionEvent, Subscription};
use crate::qr::{QrRenderer, TerminalQr};
use crate::relay::EventRelay;
use crate::session::{PairingProposal, Session, SessionStore};
use crate::transport::{
    DisconnectReason, PendingPairing, Transport, TransportConfig, TransportFactory,
};

/// Relay method name reported when a disconnect fails.
pub const SESSION_DELETE: &str = "wc_sessionDelete";

/// Externally observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    /// Transport exists, no session (also the state after a disconnect)
    Initialized,
    Connecting,
    Connected,
    /// `cleanup()` ran; no further operations are accepted
    Closed,
}

struct Inner {
    options: ClientOptions,
    factory: Arc<dyn TransportFactory>,
    renderer: Arc<dyn QrRenderer>,
    transport: TransportCell,
    store: SessionStore,
    events: EventHub,
    /// Held for the whole of a connect attempt
    connecting: Mutex<()>,
    /// Shared with every bridge handed out
    closed: Arc<AtomicBool>,
}

/// Pairs with a remote wallet and exposes the resulting session as a signer.
///
/// Cheap to clone; clones drive the same session.
#[derive(Clone)]
pub struct WalletClient {
    inner: Arc<Inner>,
}

impl WalletClient {
    /// Client that prints pairing QR codes to the terminal.
    pub fn new(options: ClientOptions, factory: Arc<dyn TransportFactory>) -> Self {
        Self::with_renderer(options, factory, Arc::new(TerminalQr))
    }

    pub fn with_renderer(
        options: ClientOptions,
        factory: Arc<dyn TransportFactory>,
        renderer: Arc<dyn QrRenderer>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                options,
                factory,
                renderer,
                transport: Arc::new(OnceCell::new()),
                store: SessionStore::new(),
                events: EventHub::new(),
                connecting: Mutex::new(()),
                closed: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    pub fn state(&self) -> ClientState {
        let inner = &self.inner;
        if inner.closed.load(Ordering::SeqCst) {
            ClientState::Closed
        } else if inner.connecting.try_lock().is_err() {
            ClientState::Connecting
        } else if !inner.store.is_empty() {
            ClientState::Connected
        } else if inner.transport.initialized() {
            ClientState::Initialized
        } else {
            ClientState::Uninitialized
        }
    }

    /// Create the relay transport if it does not exist yet.
    ///
    /// Concurrent callers share a single construction. A failure leaves the
    /// client uninitialized; calling again retries from scratch.
    pub async fn initialize(&self) -> Result<()> {
        self.ensure_open()?;
        self.transport().await.map(|_| ()).map_err(|err| self.fail(err))
    }

    /// Pair with a wallet and store the approved session.
    ///
    /// Emits `qr_ready` with the pairing URI, then `connected` once the wallet
    /// approves. Only one attempt may run at a time; a concurrent call fails
    /// with [`Error::ConnectionInProgress`]. A successful connect supersedes
    /// any session already held.
    pub async fn connect_wallet(&self) -> Result<Session> {
        self.ensure_open()?;
        let _attempt = self
            .inner
            .connecting
            .try_lock()
            .map_err(|_| self.fail(Error::ConnectionInProgress))?;

        let transport = self.transport().await.map_err(|err| self.fail(err))?;
        let session = self
            .pair(transport.as_ref())
            .await
            .map_err(|err| self.fail(err))?;

        if self.inner.closed.load(Ordering::SeqCst) {
            // Approved after cleanup(); release it on the wallet side.
            if let Err(err) = transport
                .disconnect(&session.topic, DisconnectReason::user_disconnected())
                .await
            {
                tracing::warn!(
                    topic = %session.topic,
                    error = %err,
                    "failed to release session approved after cleanup"
                );
            }
            return Err(Error::Closed);
        }
        self.inner.store.set(session.clone());
        tracing::info!(topic = %session.topic, "wallet connected");
        self.inner.events.emit(SessionEvent::Connected(session.clone()));
        Ok(session)
    }

    /// Ask the wallet to end the session, then forget it locally.
    ///
    /// No-op without a transport or session. On failure the session is kept.
    pub async fn disconnect_wallet(&self) -> Result<()> {
        let Some(transport) = self.inner.transport.get().cloned() else {
            return Ok(());
        };
        let Some(topic) = self.inner.store.topic() else {
            return Ok(());
        };

        transport
            .disconnect(&topic, DisconnectReason::user_disconnected())
            .await
            .map_err(|source| {
                self.fail(Error::RemoteRequest {
                    method: SESSION_DELETE.to_string(),
                    source,
                })
            })?;

        // A session_delete push may already have cleared it while we waited.
        if self.inner.store.clear_if_topic(&topic) {
            tracing::info!(%topic, "wallet disconnected");
            self.inner.events.emit(SessionEvent::Disconnected);
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        !self.inner.store.is_empty()
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.store.get()
    }

    /// Disconnect if connected and release every observer. Safe to repeat.
    pub async fn cleanup(&self) -> Result<()> {
        let result = if self.is_connected() {
            self.disconnect_wallet().await
        } else {
            Ok(())
        };
        self.inner.events.clear();
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("wallet client cleaned up");
        }
        result
    }

    /// Register a synchronous observer for every [`SessionEvent`].
    #[must_use = "dropping the subscription unregisters the handler"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(handler)
    }

    /// Receive every [`SessionEvent`] through a channel.
    pub fn events(&self) -> (Subscription, mpsc::UnboundedReceiver<SessionEvent>) {
        self.inner.events.channel()
    }

    pub fn event_hub(&self) -> &EventHub {
        &self.inner.events
    }

    /// Signing surface sharing this client's session.
    pub fn bridge(&self) -> RequestBridge {
        RequestBridge::new(
            self.inner.transport.clone(),
            self.inner.store.clone(),
            self.inner.events.clone(),
            self.inner.closed.clone(),
            self.inner.options.chain_id,
        )
    }

    pub async fn get_address(&self) -> Result<String> {
        self.ensure_open()?;
        self.bridge().get_address().await
    }

    pub async fn send_transaction(&self, tx: Value) -> Result<Value> {
        self.ensure_open()?;
        self.bridge().send_transaction(tx).await
    }

    pub async fn sign_message(&self, message: &str) -> Result<Value> {
        self.ensure_open()?;
        self.bridge().sign_message(message).await
    }

    pub async fn sign_transaction(&self, tx: Value) -> Result<Value> {
        self.ensure_open()?;
        self.bridge().sign_transaction(tx).await
    }

    pub async fn sign_typed_data(&self, address: &str, typed_data: &Value) -> Result<Value> {
        self.ensure_open()?;
        self.bridge().sign_typed_data(address, typed_data).await
    }

    async fn transport(&self) -> Result<Arc<dyn Transport>> {
        let inner = &self.inner;
        inner
            .transport
            .get_or_try_init(|| async {
                inner.options.validate().map_err(Error::Initialization)?;
                let config = TransportConfig {
                    project_id: inner.options.project_id.clone(),
                    metadata: inner.options.metadata.clone(),
                    relay_url: inner.options.relay_url.clone(),
                    log_target: inner.options.log_target.clone(),
                };
                let transport = inner
                    .factory
                    .init(config)
                    .await
                    .map_err(Error::Initialization)?;
                EventRelay::new(inner.store.clone(), inner.events.clone())
                    .attach(transport.as_ref());
                tracing::info!(app = %inner.options.metadata.name, "relay transport initialized");
                Ok::<_, Error>(transport)
            })
            .await
            .cloned()
    }

    async fn pair(&self, transport: &dyn Transport) -> Result<Session> {
        let proposal = PairingProposal::evm();
        let PendingPairing { uri, approval } =
            transport.connect(&proposal).await.map_err(Error::Pairing)?;

        if let Some(uri) = uri {
            if let Err(err) = self.inner.renderer.render(&uri) {
                tracing::warn!(error = %err, "failed to render pairing QR code");
            }
            self.inner.events.emit(SessionEvent::QrReady(uri));
        }

        tracing::info!("waiting for wallet approval");
        approval.await.map_err(Error::Pairing)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    /// Publish `err` to observers and hand it back for the caller.
    fn fail(&self, err: Error) -> Error {
        tracing::error!(error = %err, "wallet operation failed");
        self.inner.events.emit(SessionEvent::Error(err.clone()));
        err
    }
}

impl std::fmt::Debug for WalletClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletClient")
            .field("state", &self.state())
            .field("topic", &self.inner.store.topic())
            .finish()
    }
}
