//! In-crate doubles for the transport seam, shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{oneshot, OnceCell};

use crate::bridge::RequestBridge;
use crate::error::TransportError;
use crate::events::EventHub;
use crate::qr::QrRenderer;
use crate::session::{Namespace, Namespaces, PairingProposal, Session, SessionStore, EIP155};
use crate::transport::{
    DisconnectReason, PendingPairing, PushEvent, PushHandler, RpcRequest, Transport,
    TransportConfig, TransportFactory,
};

pub(crate) const ADDRESS: &str = "0x1111111111111111111111111111111111111111";

pub(crate) fn evm_session(topic: &str, address: &str) -> Session {
    Session::new(
        topic,
        Namespaces::from([(
            EIP155.to_string(),
            Namespace {
                accounts: vec![format!("eip155:1:{address}")],
                ..Default::default()
            },
        )]),
    )
}

enum Pairing {
    Approve(Session),
    Reject(TransportError),
    Pending(oneshot::Receiver<Result<Session, TransportError>>),
}

pub(crate) struct MockTransport {
    pairings: Mutex<VecDeque<Pairing>>,
    proposals: Mutex<Vec<PairingProposal>>,
    requests: Mutex<Vec<RpcRequest>>,
    response: Mutex<Result<Value, TransportError>>,
    disconnects: Mutex<Vec<(String, DisconnectReason)>>,
    disconnect_result: Mutex<Result<(), TransportError>>,
    handlers: Mutex<Vec<PushHandler>>,
    with_uri: Mutex<bool>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pairings: Mutex::new(VecDeque::new()),
            proposals: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            response: Mutex::new(Ok(json!("0xresult"))),
            disconnects: Mutex::new(Vec::new()),
            disconnect_result: Mutex::new(Ok(())),
            handlers: Mutex::new(Vec::new()),
            with_uri: Mutex::new(true),
        })
    }

    pub fn approve_next(&self, session: Session) {
        self.pairings.lock().push_back(Pairing::Approve(session));
    }

    pub fn reject_next(&self, err: TransportError) {
        self.pairings.lock().push_back(Pairing::Reject(err));
    }

    /// Queue a pairing whose approval resolves when the sender fires.
    pub fn pending_next(&self) -> oneshot::Sender<Result<Session, TransportError>> {
        let (tx, rx) = oneshot::channel();
        self.pairings.lock().push_back(Pairing::Pending(rx));
        tx
    }

    pub fn without_uri(&self) {
        *self.with_uri.lock() = false;
    }

    pub fn respond_with(&self, response: Result<Value, TransportError>) {
        *self.response.lock() = response;
    }

    pub fn fail_disconnect(&self, err: TransportError) {
        *self.disconnect_result.lock() = Err(err);
    }

    /// Deliver a push event to every registered handler, synchronously.
    pub fn push(&self, event: PushEvent) {
        let handlers = self.handlers.lock().clone();
        for handler in handlers {
            handler(event.clone());
        }
    }

    pub fn proposals(&self) -> Vec<PairingProposal> {
        self.proposals.lock().clone()
    }

    pub fn requests(&self) -> Vec<RpcRequest> {
        self.requests.lock().clone()
    }

    pub fn disconnects(&self) -> Vec<(String, DisconnectReason)> {
        self.disconnects.lock().clone()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, proposal: &PairingProposal) -> Result<PendingPairing, TransportError> {
        let index = {
            let mut proposals = self.proposals.lock();
            proposals.push(proposal.clone());
            proposals.len()
        };
        let uri = (*self.with_uri.lock()).then(|| format!("wc:mock{index}@2?relay-protocol=irn"));
        let pairing = self
            .pairings
            .lock()
            .pop_front()
            .ok_or_else(|| TransportError::Other("no pairing scripted".into()))?;
        Ok(match pairing {
            Pairing::Approve(session) => PendingPairing::new(uri, async move { Ok(session) }),
            Pairing::Reject(err) => PendingPairing::new(uri, async move { Err(err) }),
            Pairing::Pending(rx) => PendingPairing::new(uri, async move {
                rx.await
                    .unwrap_or_else(|_| Err(TransportError::Other("approval dropped".into())))
            }),
        })
    }

    async fn disconnect(&self, topic: &str, reason: DisconnectReason) -> Result<(), TransportError> {
        self.disconnects.lock().push((topic.to_string(), reason));
        self.disconnect_result.lock().clone()
    }

    async fn request(&self, request: RpcRequest) -> Result<Value, TransportError> {
        self.requests.lock().push(request);
        self.response.lock().clone()
    }

    fn on(&self, handler: PushHandler) {
        self.handlers.lock().push(handler);
    }
}

pub(crate) struct MockFactory {
    transport: Arc<MockTransport>,
    failure: Mutex<Option<TransportError>>,
    configs: Mutex<Vec<TransportConfig>>,
    inits: AtomicUsize,
}

impl MockFactory {
    pub fn new(transport: Arc<MockTransport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            failure: Mutex::new(None),
            configs: Mutex::new(Vec::new()),
            inits: AtomicUsize::new(0),
        })
    }

    /// Fail the next `init` with `err`.
    pub fn fail_next(&self, err: TransportError) {
        *self.failure.lock() = Some(err);
    }

    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn configs(&self) -> Vec<TransportConfig> {
        self.configs.lock().clone()
    }
}

#[async_trait]
impl TransportFactory for MockFactory {
    async fn init(&self, config: TransportConfig) -> Result<Arc<dyn Transport>, TransportError> {
        tokio::task::yield_now().await;
        self.inits.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure.lock().take() {
            return Err(err);
        }
        self.configs.lock().push(config);
        Ok(self.transport.clone())
    }
}

#[derive(Default)]
pub(crate) struct RecordingRenderer {
    pub uris: Mutex<Vec<String>>,
    pub fail: bool,
}

impl QrRenderer for RecordingRenderer {
    fn render(&self, uri: &str) -> anyhow::Result<()> {
        self.uris.lock().push(uri.to_string());
        if self.fail {
            anyhow::bail!("terminal too small");
        }
        Ok(())
    }
}

/// Bridge over `mock` with session `t1` holding [`ADDRESS`].
pub(crate) fn connected_bridge(
    mock: &Arc<MockTransport>,
    default_chain_id: u64,
) -> (RequestBridge, SessionStore, EventHub) {
    let cell = OnceCell::new();
    let transport: Arc<dyn Transport> = mock.clone();
    let _ = cell.set(transport);

    let store = SessionStore::new();
    store.set(evm_session("t1", ADDRESS));
    let events = EventHub::new();
    let bridge = RequestBridge::new(
        Arc::new(cell),
        store.clone(),
        events.clone(),
        Arc::new(AtomicBool::new(false)),
        default_chain_id,
    );
    (bridge, store, events)
}

/// Read-side chain double; receipts appear after `pending_polls` misses.
pub(crate) struct MockChain {
    pub chain_id: u64,
    pub rpc_url: url::Url,
    pending_polls: AtomicUsize,
    pub calls: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl crate::adapters::ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        self.calls.lock().push((method.to_string(), params.clone()));
        match method {
            "eth_getTransactionReceipt" => {
                let remaining = self.pending_polls.load(Ordering::SeqCst);
                if remaining > 0 {
                    self.pending_polls.store(remaining - 1, Ordering::SeqCst);
                    return Ok(Value::Null);
                }
                Ok(json!({"transactionHash": params[0], "status": "0x1"}))
            }
            "eth_getBalance" => Ok(json!("0xde0b6b3a7640000")),
            other => Err(TransportError::MethodNotSupported(other.to_string())),
        }
    }
}

#[derive(Default)]
pub(crate) struct MockChainFactory {
    /// Receipt polls answered with null before the receipt shows up
    pub pending_polls: usize,
    pub built: Mutex<Vec<Arc<MockChain>>>,
}

impl crate::adapters::ChainClientFactory for MockChainFactory {
    fn build(
        &self,
        chain_id: u64,
        rpc_url: &url::Url,
    ) -> Result<Arc<dyn crate::adapters::ChainClient>, TransportError> {
        let chain = Arc::new(MockChain {
            chain_id,
            rpc_url: rpc_url.clone(),
            pending_polls: AtomicUsize::new(self.pending_polls),
            calls: Mutex::new(Vec::new()),
        });
        self.built.lock().push(chain.clone());
        Ok(chain)
    }
}

/// Client over `mock`, already connected with session `t1` holding [`ADDRESS`].
pub(crate) async fn connected_client(
    mock: &Arc<MockTransport>,
    options: crate::config::ClientOptions,
) -> crate::WalletClient {
    let client = crate::WalletClient::with_renderer(
        options,
        MockFactory::new(mock.clone()),
        Arc::new(RecordingRenderer::default()),
    );
    mock.approve_next(evm_session("t1", ADDRESS));
    client.connect_wallet().await.unwrap();
    client
}
