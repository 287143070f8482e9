//! Viem-style wallet client: an EIP-1193 `request` surface plus typed helpers.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::chain::{
    wait_for_receipt, ChainClient, ChainClientFactory, ChainContext, RECEIPT_POLL_INTERVAL,
    RECEIPT_TIMEOUT,
};
use super::ethers::expect_string;
use super::quantity;
use crate::bridge::RequestBridge;
use crate::config::{supported_chain, ClientOptions, SupportedChain};
use crate::error::Result;

/// Parameters for [`ViemClient::send_transaction`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    /// Sender; the session account when unset
    pub account: Option<String>,
    pub to: Option<String>,
    pub value: Option<u128>,
    pub data: Option<String>,
    pub gas: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

pub struct ViemClient {
    bridge: RequestBridge,
    chain: ChainContext,
}

impl ViemClient {
    pub fn new(
        bridge: RequestBridge,
        options: &ClientOptions,
        factory: Arc<dyn ChainClientFactory>,
    ) -> Self {
        Self {
            bridge,
            chain: ChainContext::new(factory, options),
        }
    }

    /// Forward an arbitrary call to the wallet on the active chain.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.bridge.request(method, params, self.chain_id()).await
    }

    pub async fn account(&self) -> Result<String> {
        self.bridge.get_address().await
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id()
    }

    /// Known chain metadata for the active chain.
    pub fn chain(&self) -> Option<&'static SupportedChain> {
        supported_chain(self.chain_id())
    }

    pub fn public_client(&self) -> Result<Arc<dyn ChainClient>> {
        self.chain.client()
    }

    pub fn switch_chain(&self, chain_id: u64) -> Result<()> {
        self.chain.switch_chain(chain_id)
    }

    /// Returns the transaction hash.
    pub async fn send_transaction(&self, params: TransactionParams) -> Result<String> {
        let from = match params.account {
            Some(account) => account,
            None => self.account().await?,
        };
        let mut tx = serde_json::Map::new();
        tx.insert("from".into(), from.into());
        if let Some(to) = params.to {
            tx.insert("to".into(), to.into());
        }
        if let Some(value) = params.value {
            tx.insert("value".into(), quantity(value).into());
        }
        if let Some(data) = params.data {
            tx.insert("data".into(), data.into());
        }
        if let Some(gas) = params.gas {
            tx.insert("gas".into(), quantity(gas.into()).into());
        }
        if let Some(fee) = params.max_fee_per_gas {
            tx.insert("maxFeePerGas".into(), quantity(fee).into());
        }
        if let Some(tip) = params.max_priority_fee_per_gas {
            tx.insert("maxPriorityFeePerGas".into(), quantity(tip).into());
        }
        tx.insert("chainId".into(), self.chain_id().into());

        let hash = self.bridge.send_transaction(Value::Object(tx)).await?;
        expect_string("eth_sendTransaction", hash)
    }

    pub async fn sign_message(&self, message: &str) -> Result<String> {
        let signature = self.bridge.sign_message(message).await?;
        expect_string("personal_sign", signature)
    }

    pub async fn sign_typed_data(&self, typed_data: &Value) -> Result<String> {
        let account = self.account().await?;
        let signature = self.bridge.sign_typed_data(&account, typed_data).await?;
        expect_string("eth_signTypedData_v4", signature)
    }

    pub async fn wait_for_transaction_receipt(
        &self,
        hash: &str,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let client = self.chain.client()?;
        wait_for_receipt(
            client.as_ref(),
            hash,
            timeout.unwrap_or(RECEIPT_TIMEOUT),
            RECEIPT_POLL_INTERVAL,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::Error;
    use crate::test_utils::{connected_client, MockChainFactory, MockTransport, ADDRESS};

    async fn viem(options: ClientOptions) -> (ViemClient, Arc<MockTransport>) {
        let mock = MockTransport::new();
        let client = connected_client(&mock, options.clone()).await;
        let viem = ViemClient::new(
            client.bridge(),
            &options,
            Arc::new(MockChainFactory::default()),
        );
        (viem, mock)
    }

    #[tokio::test]
    async fn test_request_passthrough_uses_active_chain() {
        let (viem, mock) = viem(ClientOptions::new("test")).await;
        viem.switch_chain(137).unwrap();

        let result = viem.request("eth_chainId", json!([])).await.unwrap();
        assert_eq!(result, json!("0xresult"));

        let request = &mock.requests()[0];
        assert_eq!(request.method, "eth_chainId");
        assert_eq!(request.chain_id, "eip155:137");
    }

    #[tokio::test]
    async fn test_send_transaction_defaults_account() {
        let (viem, mock) = viem(ClientOptions::new("test").with_chain_id(8453)).await;
        mock.respond_with(Ok(json!("0xhash")));

        let hash = viem
            .send_transaction(TransactionParams {
                to: Some("0x2".into()),
                value: Some(16),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hash, "0xhash");

        let tx = &mock.requests()[0].params[0];
        assert_eq!(tx["from"], ADDRESS);
        assert_eq!(tx["value"], "0x10");
        assert_eq!(tx["chainId"], 8453);
        assert!(tx.get("data").is_none());
    }

    #[tokio::test]
    async fn test_chain_metadata() {
        let (viem, _mock) = viem(ClientOptions::new("test").with_chain_id(10)).await;
        assert_eq!(viem.chain().map(|c| c.name), Some("OP Mainnet"));

        viem.switch_chain(31337).unwrap();
        assert!(viem.chain().is_none());
    }

    #[tokio::test]
    async fn test_disconnected_account_fails() {
        let (viem, mock) = viem(ClientOptions::new("test")).await;
        mock.push(crate::transport::PushEvent::SessionDelete { topic: "t1".into() });

        assert!(matches!(viem.account().await, Err(Error::NotConnected)));
    }
}
