//! Error taxonomy for the session core
//!
//! Every failure is both emitted on the `error` event and returned to the
//! caller, so `Error` is `Clone` and carries only owned, cloneable data.

use std::time::Duration;

/// EIP-1193 "Unsupported Method" provider error code.
pub const EIP1193_UNSUPPORTED_METHOD: i64 = 4200;
/// WalletConnect "unsupported methods" session error code.
pub const WC_UNSUPPORTED_METHODS: i64 = 5101;

/// Faults reported by the relay transport or a chain client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("relay unreachable: {0}")]
    Unreachable(String),

    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),

    #[error("rejected by peer ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("method `{0}` is not supported by the peer")]
    MethodNotSupported(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether the peer refused the call because it does not implement the method.
    pub fn is_unsupported_method(&self) -> bool {
        match self {
            Self::MethodNotSupported(_) => true,
            Self::Rejected { code, .. } => {
                *code == EIP1193_UNSUPPORTED_METHOD || *code == WC_UNSUPPORTED_METHODS
            }
            _ => false,
        }
    }
}

/// Errors surfaced by [`WalletClient`](crate::WalletClient) and the adapters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("failed to initialize relay transport: {0}")]
    Initialization(#[source] TransportError),

    #[error("pairing failed: {0}")]
    Pairing(#[source] TransportError),

    #[error("wallet not connected")]
    NotConnected,

    #[error("no accounts found in session for namespace `{0}`")]
    NoAccounts(String),

    #[error("remote request `{method}` failed: {source}")]
    RemoteRequest {
        method: String,
        #[source]
        source: TransportError,
    },

    #[error("wallet does not support `{0}`")]
    UnsupportedOperation(String),

    #[error("a wallet connection is already in progress")]
    ConnectionInProgress,

    #[error("client has been cleaned up")]
    Closed,

    #[error("malformed account id `{0}`")]
    InvalidAccount(String),

    #[error("chain client error: {0}")]
    ChainClient(String),

    #[error("timed out after {0:?} waiting for transaction {1}")]
    Timeout(Duration, String),
}

impl Error {
    /// Classify a failed remote call on `method`.
    pub fn remote(method: &str, source: TransportError) -> Self {
        if source.is_unsupported_method() {
            Self::UnsupportedOperation(method.to_string())
        } else {
            Self::RemoteRequest {
                method: method.to_string(),
                source,
            }
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
