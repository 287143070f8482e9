//! QR-code wallet pairing and remote signing.
//!
//! A [`WalletClient`] pairs with a mobile wallet over a relay transport,
//! shows the pairing URI as a terminal QR code, and then forwards signing
//! requests to the wallet for the life of the session. The relay itself is
//! supplied by the caller through [`TransportFactory`].
//!
//! ```ignore
//! let client = WalletClient::new(ClientOptions::new(project_id), factory);
//! let session = client.connect_wallet().await?;
//! let signature = client.sign_message("hello").await?;
//! client.cleanup().await?;
//! ```

pub mod adapters;
pub mod audit;
pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod qr;
pub mod relay;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_utils;

pub use adapters::{
    create_adapter, create_adapter_auto, Adapter, AdapterKind, ChainClient, ChainClientFactory,
    ChainClientRegistry, EthersSigner, ViemClient,
};
pub use audit::AuditLog;
pub use bridge::RequestBridge;
pub use client::{ClientState, WalletClient};
pub use config::{AppMetadata, ClientOptions, SupportedChain, SUPPORTED_CHAINS};
pub use error::{Error, Result, TransportError};
pub use events::{EventHub, SessionEvent, Subscription};
pub use qr::{NoQr, QrRenderer, TerminalQr};
pub use session::{AccountId, Namespace, Namespaces, PairingProposal, Session, SessionStore};
pub use transport::{
    DisconnectReason, PendingPairing, PushEvent, RpcRequest, Transport, TransportConfig,
    TransportFactory,
};
