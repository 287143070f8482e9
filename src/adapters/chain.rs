//! Read-only chain access for the adapters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use url::Url;

use crate::config::{default_rpc_url, ClientOptions};
use crate::error::{Error, Result, TransportError};

/// Receipt polling deadline used after a wallet accepts a transaction.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// JSON-RPC client for balance, receipt and contract-read calls.
///
/// Independent of the wallet session; never used for signing.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;

    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError>;

    async fn balance(&self, address: &str) -> Result<Value, TransportError> {
        self.request("eth_getBalance", json!([address, "latest"])).await
    }

    /// `None` while the transaction is still pending.
    async fn transaction_receipt(&self, hash: &str) -> Result<Option<Value>, TransportError> {
        let receipt = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        Ok((!receipt.is_null()).then_some(receipt))
    }
}

/// Builds a [`ChainClient`] for a chain id and endpoint.
pub trait ChainClientFactory: Send + Sync {
    fn build(&self, chain_id: u64, rpc_url: &Url) -> Result<Arc<dyn ChainClient>, TransportError>;
}

struct ActiveChain {
    chain_id: u64,
    client: Option<Arc<dyn ChainClient>>,
}

/// Active chain plus its lazily built read client.
pub struct ChainContext {
    factory: Arc<dyn ChainClientFactory>,
    configured_chain: u64,
    configured_rpc: Url,
    active: Mutex<ActiveChain>,
}

impl ChainContext {
    pub fn new(factory: Arc<dyn ChainClientFactory>, options: &ClientOptions) -> Self {
        Self {
            factory,
            configured_chain: options.chain_id,
            configured_rpc: options.rpc_url_for(options.chain_id),
            active: Mutex::new(ActiveChain {
                chain_id: options.chain_id,
                client: None,
            }),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.active.lock().chain_id
    }

    /// Endpoint for `chain_id`. A configured RPC override only applies to the
    /// configured chain; other chains use the public defaults.
    pub fn rpc_url(&self, chain_id: u64) -> Url {
        if chain_id == self.configured_chain {
            self.configured_rpc.clone()
        } else {
            default_rpc_url(chain_id)
        }
    }

    /// Read client for the active chain, built on first use.
    pub fn client(&self) -> Result<Arc<dyn ChainClient>> {
        let mut active = self.active.lock();
        if let Some(client) = &active.client {
            return Ok(client.clone());
        }
        let client = self.build(active.chain_id)?;
        active.client = Some(client.clone());
        Ok(client)
    }

    /// Read client for `chain_id`; a throwaway one when it is not the active chain.
    pub fn client_for(&self, chain_id: u64) -> Result<Arc<dyn ChainClient>> {
        if chain_id == self.chain_id() {
            self.client()
        } else {
            self.build(chain_id)
        }
    }

    /// Make `chain_id` active and rebuild its read client.
    ///
    /// On failure the previous chain stays active.
    pub fn switch_chain(&self, chain_id: u64) -> Result<()> {
        let client = self.build(chain_id)?;
        *self.active.lock() = ActiveChain {
            chain_id,
            client: Some(client),
        };
        tracing::info!(chain_id, "switched chain");
        Ok(())
    }

    /// Drop the cached client; the next read builds a fresh one.
    pub fn reset(&self) {
        self.active.lock().client = None;
    }

    fn build(&self, chain_id: u64) -> Result<Arc<dyn ChainClient>> {
        let rpc_url = self.rpc_url(chain_id);
        tracing::debug!(chain_id, %rpc_url, "building chain client");
        self.factory
            .build(chain_id, &rpc_url)
            .map_err(|e| Error::ChainClient(e.to_string()))
    }
}

/// Poll for a receipt until it appears or `timeout` elapses.
pub async fn wait_for_receipt(
    client: &dyn ChainClient,
    hash: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<Value> {
    let poll = async {
        loop {
            match client.transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => tracing::trace!(hash, "receipt not available yet"),
                Err(e) => return Err(Error::ChainClient(e.to_string())),
            }
            tokio::time::sleep(interval).await;
        }
    };
    tokio::time::timeout(timeout, poll)
        .await
        .map_err(|_| Error::Timeout(timeout, hash.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockChainFactory;

    fn context(options: &ClientOptions) -> (ChainContext, Arc<MockChainFactory>) {
        let factory = Arc::new(MockChainFactory::default());
        (ChainContext::new(factory.clone(), options), factory)
    }

    #[test]
    fn test_client_is_lazy_and_cached() {
        let (ctx, factory) = context(&ClientOptions::new("test"));
        assert!(factory.built.lock().is_empty());

        let a = ctx.client().unwrap();
        let b = ctx.client().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.built.lock().len(), 1);
    }

    #[test]
    fn test_switch_chain_rebuilds() {
        let options = ClientOptions::new("test")
            .with_rpc_url(Url::parse("http://localhost:8545").unwrap());
        let (ctx, factory) = context(&options);
        ctx.client().unwrap();

        ctx.switch_chain(8453).unwrap();
        assert_eq!(ctx.chain_id(), 8453);
        assert_eq!(ctx.client().unwrap().chain_id(), 8453);

        let built = factory.built.lock();
        assert_eq!(built.len(), 2);
        assert_eq!(built[0].rpc_url.as_str(), "http://localhost:8545/");
        assert_eq!(built[1].rpc_url.as_str(), "https://base.llamarpc.com/");
    }

    #[tokio::test]
    async fn test_wait_for_receipt_polls_until_present() {
        let factory = MockChainFactory {
            pending_polls: 2,
            ..Default::default()
        };
        let client = factory.build(1, &default_rpc_url(1)).unwrap();

        let receipt = wait_for_receipt(
            client.as_ref(),
            "0xabc",
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await
        .unwrap();
        assert_eq!(receipt["transactionHash"], "0xabc");
        assert_eq!(factory.built.lock()[0].calls.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_wait_for_receipt_times_out() {
        let factory = MockChainFactory {
            pending_polls: usize::MAX,
            ..Default::default()
        };
        let client = factory.build(1, &default_rpc_url(1)).unwrap();

        let err = wait_for_receipt(
            client.as_ref(),
            "0xabc",
            Duration::from_millis(20),
            Duration::from_millis(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Timeout(_, ref hash) if hash == "0xabc"));
    }
}
