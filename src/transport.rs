//! Relay transport seam
//!
//! The relay client that carries pairing and session traffic lives outside
//! this crate. Embedders implement [`TransportFactory`] and [`Transport`] for
//! their relay of choice; the session core only talks to these traits.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::AppMetadata;
use crate::error::TransportError;
use crate::session::{Namespaces, PairingProposal, Session};

/// Settings handed to [`TransportFactory::init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub project_id: String,
    pub metadata: AppMetadata,
    pub relay_url: Option<Url>,
    pub log_target: Option<String>,
}

/// Resolves once the wallet approves (or rejects) a pairing.
pub type ApprovalFuture =
    Pin<Box<dyn Future<Output = Result<Session, TransportError>> + Send + 'static>>;

/// Outcome of proposing a pairing: a URI for the wallet plus the pending approval.
pub struct PendingPairing {
    /// Absent when the transport reuses an existing pairing
    pub uri: Option<String>,
    pub approval: ApprovalFuture,
}

impl PendingPairing {
    pub fn new<F>(uri: Option<String>, approval: F) -> Self
    where
        F: Future<Output = Result<Session, TransportError>> + Send + 'static,
    {
        Self {
            uri,
            approval: Box::pin(approval),
        }
    }
}

impl fmt::Debug for PendingPairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingPairing")
            .field("uri", &self.uri)
            .finish_non_exhaustive()
    }
}

/// Remote procedure call scoped to a session and chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    pub topic: String,
    /// CAIP-2 chain scope, e.g. `eip155:1`
    pub chain_id: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// Machine-readable reason sent with a disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectReason {
    pub code: i64,
    pub message: String,
}

impl DisconnectReason {
    pub const USER_DISCONNECTED: i64 = 6000;

    pub fn user_disconnected() -> Self {
        Self {
            code: Self::USER_DISCONNECTED,
            message: "User disconnected".to_string(),
        }
    }
}

/// Session notifications pushed by the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    SessionUpdate {
        topic: String,
        namespaces: Namespaces,
        expiry: Option<i64>,
    },
    SessionDelete {
        topic: String,
    },
    SessionExpire {
        topic: String,
    },
}

impl PushEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionUpdate { .. } => "session_update",
            Self::SessionDelete { .. } => "session_delete",
            Self::SessionExpire { .. } => "session_expire",
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            Self::SessionUpdate { topic, .. }
            | Self::SessionDelete { topic }
            | Self::SessionExpire { topic } => topic,
        }
    }
}

/// Callback receiving push events in delivery order.
pub type PushHandler = Arc<dyn Fn(PushEvent) + Send + Sync>;

/// Live handle to the relay.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Propose a pairing; the returned approval resolves when the wallet answers.
    async fn connect(&self, proposal: &PairingProposal) -> Result<PendingPairing, TransportError>;

    async fn disconnect(&self, topic: &str, reason: DisconnectReason) -> Result<(), TransportError>;

    async fn request(&self, request: RpcRequest) -> Result<serde_json::Value, TransportError>;

    /// Register a push-event handler. Handlers must be invoked synchronously
    /// and in the order the relay delivered the events.
    fn on(&self, handler: PushHandler);
}

/// Builds a [`Transport`] from configuration.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn init(&self, config: TransportConfig) -> Result<Arc<dyn Transport>, TransportError>;
}
