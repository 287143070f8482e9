//! Translates signing operations into session-scoped remote calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::OnceCell;

use crate::error::{Error, Result};
use crate::events::{EventHub, SessionEvent};
use crate::session::proposal::{
    ETH_SEND_TRANSACTION, ETH_SIGN_TRANSACTION, ETH_SIGN_TYPED_DATA_V4, PERSONAL_SIGN,
};
use crate::session::{evm_chain, Session, SessionStore};
use crate::transport::{RpcRequest, Transport};

pub(crate) type TransportCell = Arc<OnceCell<Arc<dyn Transport>>>;

/// Signing surface over the active session.
///
/// Holds no session state of its own: each operation takes one snapshot of
/// the store and builds its call from that snapshot only. Clones share the
/// store, transport and observers with the client that created them.
#[derive(Clone)]
pub struct RequestBridge {
    transport: TransportCell,
    store: SessionStore,
    events: EventHub,
    /// Set once the owning client is cleaned up
    closed: Arc<AtomicBool>,
    default_chain_id: u64,
}

impl RequestBridge {
    pub(crate) fn new(
        transport: TransportCell,
        store: SessionStore,
        events: EventHub,
        closed: Arc<AtomicBool>,
        default_chain_id: u64,
    ) -> Self {
        Self {
            transport,
            store,
            events,
            closed,
            default_chain_id,
        }
    }

    pub fn default_chain_id(&self) -> u64 {
        self.default_chain_id
    }

    pub fn is_connected(&self) -> bool {
        !self.store.is_empty()
    }

    pub fn session(&self) -> Option<Session> {
        self.store.get()
    }

    /// Address of the session's first EVM account.
    pub async fn get_address(&self) -> Result<String> {
        let result = self.snapshot().and_then(|(session, _)| session.address());
        self.report("get_address", result)
    }

    /// `eth_sendTransaction` with `tx` as the sole parameter. Returns the
    /// wallet's answer (normally the transaction hash) untouched.
    pub async fn send_transaction(&self, tx: Value) -> Result<Value> {
        let chain_id = chain_id_of(&tx).unwrap_or(self.default_chain_id);
        self.call(ETH_SEND_TRANSACTION, json!([tx]), chain_id).await
    }

    /// `personal_sign` with `[message, address]` on the configured chain.
    pub async fn sign_message(&self, message: &str) -> Result<Value> {
        let result = async {
            let (session, transport) = self.snapshot()?;
            let address = session.address()?;
            self.dispatch(
                &session,
                transport,
                PERSONAL_SIGN,
                json!([message, address]),
                self.default_chain_id,
            )
            .await
        }
        .await;
        self.report(PERSONAL_SIGN, result)
    }

    /// `eth_signTransaction` with `tx` as the sole parameter.
    pub async fn sign_transaction(&self, tx: Value) -> Result<Value> {
        let chain_id = chain_id_of(&tx).unwrap_or(self.default_chain_id);
        self.call(ETH_SIGN_TRANSACTION, json!([tx]), chain_id).await
    }

    /// `eth_signTypedData_v4` with `[address, typed_data_json]`.
    pub async fn sign_typed_data(&self, address: &str, typed_data: &Value) -> Result<Value> {
        let encoded = match typed_data {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        };
        self.call(
            ETH_SIGN_TYPED_DATA_V4,
            json!([address, encoded]),
            self.default_chain_id,
        )
        .await
    }

    /// Arbitrary session-scoped call, for adapters exposing a raw provider.
    pub async fn request(&self, method: &str, params: Value, chain_id: u64) -> Result<Value> {
        self.call(method, params, chain_id).await
    }

    async fn call(&self, method: &str, params: Value, chain_id: u64) -> Result<Value> {
        let result = match self.snapshot() {
            Ok((session, transport)) => {
                self.dispatch(&session, transport, method, params, chain_id)
                    .await
            }
            Err(err) => Err(err),
        };
        self.report(method, result)
    }

    async fn dispatch(
        &self,
        session: &Session,
        transport: Arc<dyn Transport>,
        method: &str,
        params: Value,
        chain_id: u64,
    ) -> Result<Value> {
        let request = RpcRequest {
            topic: session.topic.clone(),
            chain_id: evm_chain(chain_id),
            method: method.to_string(),
            params,
        };
        tracing::debug!(topic = %request.topic, chain = %request.chain_id, method, "sending session request");
        transport
            .request(request)
            .await
            .map_err(|source| Error::remote(method, source))
    }

    fn snapshot(&self) -> Result<(Session, Arc<dyn Transport>)> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        let session = self.store.get().ok_or(Error::NotConnected)?;
        let transport = self.transport.get().cloned().ok_or(Error::NotConnected)?;
        Ok((session, transport))
    }

    fn report<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            tracing::error!(operation, error = %err, "session request failed");
            self.events.emit(SessionEvent::Error(err.clone()));
        }
        result
    }
}

impl std::fmt::Debug for RequestBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBridge")
            .field("topic", &self.store.topic())
            .field("default_chain_id", &self.default_chain_id)
            .finish()
    }
}

/// `chainId` of a transaction object given as a number, decimal or hex string.
pub fn chain_id_of(tx: &Value) -> Option<u64> {
    match tx.get("chainId")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => parse_quantity(s),
        _ => None,
    }
}

/// Parse a `0x`-prefixed hex or plain decimal quantity.
pub fn parse_quantity(raw: &str) -> Option<u64> {
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}
