//! Chain-library flavoured adapters over a shared [`WalletClient`] session.
//!
//! Adapters hold a [`RequestBridge`](crate::RequestBridge) and never keep
//! session state of their own; every call reads the live session. Read-side
//! calls go through a [`ChainClient`] built by a caller-supplied factory.

mod chain;
mod ethers;
mod viem;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use chain::{
    wait_for_receipt, ChainClient, ChainClientFactory, ChainContext, RECEIPT_POLL_INTERVAL,
    RECEIPT_TIMEOUT,
};
pub use ethers::{EthersSigner, PendingTransaction, TransactionRequest};
pub use viem::{TransactionParams, ViemClient};

use crate::client::WalletClient;
use crate::error::{Error, Result};

/// `0x`-prefixed hex quantity, as JSON-RPC expects.
pub(crate) fn quantity(value: u128) -> String {
    format!("{value:#x}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    Ethers,
    Viem,
}

impl AdapterKind {
    /// Order tried by [`create_adapter_auto`].
    pub const PREFERENCE: [AdapterKind; 2] = [AdapterKind::Ethers, AdapterKind::Viem];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ethers => "ethers",
            Self::Viem => "viem",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ethers" => Ok(Self::Ethers),
            "viem" => Ok(Self::Viem),
            other => Err(Error::ChainClient(format!("unknown adapter: {other}"))),
        }
    }
}

pub enum Adapter {
    Ethers(EthersSigner),
    Viem(ViemClient),
}

impl Adapter {
    pub fn kind(&self) -> AdapterKind {
        match self {
            Self::Ethers(_) => AdapterKind::Ethers,
            Self::Viem(_) => AdapterKind::Viem,
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Ethers(signer) => signer.chain_id(),
            Self::Viem(client) => client.chain_id(),
        }
    }

    pub fn switch_chain(&self, chain_id: u64) -> Result<()> {
        match self {
            Self::Ethers(signer) => signer.switch_chain(chain_id),
            Self::Viem(client) => client.switch_chain(chain_id),
        }
    }
}

/// Chain-client factories available to each adapter kind.
#[derive(Default, Clone)]
pub struct ChainClientRegistry {
    factories: HashMap<AdapterKind, Arc<dyn ChainClientFactory>>,
}

impl ChainClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, kind: AdapterKind, factory: Arc<dyn ChainClientFactory>) -> Self {
        self.factories.insert(kind, factory);
        self
    }

    pub fn get(&self, kind: AdapterKind) -> Option<Arc<dyn ChainClientFactory>> {
        self.factories.get(&kind).cloned()
    }
}

/// Build the adapter the caller asked for.
pub fn create_adapter(
    kind: AdapterKind,
    client: &WalletClient,
    registry: &ChainClientRegistry,
) -> Result<Adapter> {
    let factory = registry
        .get(kind)
        .ok_or_else(|| Error::ChainClient(format!("no chain client registered for {kind}")))?;
    let options = client.options();
    Ok(match kind {
        AdapterKind::Ethers => Adapter::Ethers(EthersSigner::new(client.bridge(), options, factory)),
        AdapterKind::Viem => Adapter::Viem(ViemClient::new(client.bridge(), options, factory)),
    })
}

/// First adapter in [`AdapterKind::PREFERENCE`] order that can be built.
pub fn create_adapter_auto(client: &WalletClient, registry: &ChainClientRegistry) -> Result<Adapter> {
    let mut last_error = None;
    for kind in AdapterKind::PREFERENCE {
        match create_adapter(kind, client, registry) {
            Ok(adapter) => {
                tracing::debug!(adapter = %kind, "adapter selected");
                return Ok(adapter);
            }
            Err(err) => last_error = Some(err),
        }
    }
    Err(last_error
        .unwrap_or_else(|| Error::ChainClient("no adapter available".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientOptions;
    use crate::test_utils::{MockChainFactory, MockFactory, MockTransport};

    fn client() -> WalletClient {
        WalletClient::new(
            ClientOptions::new("test"),
            MockFactory::new(MockTransport::new()),
        )
    }

    #[test]
    fn test_quantity() {
        assert_eq!(quantity(0), "0x0");
        assert_eq!(quantity(255), "0xff");
    }

    #[test]
    fn test_adapter_kind_parse() {
        assert_eq!("Ethers".parse::<AdapterKind>().unwrap(), AdapterKind::Ethers);
        assert_eq!("viem".parse::<AdapterKind>().unwrap(), AdapterKind::Viem);
        assert!("web3".parse::<AdapterKind>().is_err());
    }

    #[test]
    fn test_create_adapter_requires_factory() {
        let registry = ChainClientRegistry::new();
        let err = create_adapter(AdapterKind::Viem, &client(), &registry)
            .err()
            .unwrap();
        assert!(matches!(err, Error::ChainClient(_)));
    }

    #[test]
    fn test_auto_prefers_ethers() {
        let registry = ChainClientRegistry::new()
            .register(AdapterKind::Viem, Arc::new(MockChainFactory::default()))
            .register(AdapterKind::Ethers, Arc::new(MockChainFactory::default()));
        let adapter = create_adapter_auto(&client(), &registry).unwrap();
        assert_eq!(adapter.kind(), AdapterKind::Ethers);
    }

    #[test]
    fn test_auto_falls_back_to_viem() {
        let registry =
            ChainClientRegistry::new().register(AdapterKind::Viem, Arc::new(MockChainFactory::default()));
        let adapter = create_adapter_auto(&client(), &registry).unwrap();
        assert_eq!(adapter.kind(), AdapterKind::Viem);
        assert_eq!(adapter.chain_id(), 1);
    }

    #[test]
    fn test_auto_with_empty_registry_fails() {
        let result = create_adapter_auto(&client(), &ChainClientRegistry::new());
        assert!(matches!(result, Err(Error::ChainClient(_))));
    }
}
