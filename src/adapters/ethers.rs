//! Ethers-style signer over a shared wallet session.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::chain::{
    wait_for_receipt, ChainClient, ChainClientFactory, ChainContext, RECEIPT_POLL_INTERVAL,
    RECEIPT_TIMEOUT,
};
use super::quantity;
use crate::bridge::RequestBridge;
use crate::config::ClientOptions;
use crate::error::{Error, Result};

/// Native transaction shape; numeric fields are encoded as hex quantities
/// before they reach the wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub to: Option<String>,
    pub value: Option<u128>,
    pub data: Option<String>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub nonce: Option<u64>,
    pub chain_id: Option<u64>,
}

impl TransactionRequest {
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn value(mut self, value: u128) -> Self {
        self.value = Some(value);
        self
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Wallet-facing transaction object.
    ///
    /// `value` defaults to `0x0` and `data` to `0x`; other unset fields are
    /// left out so the wallet fills them in.
    pub fn to_wire(&self, from: &str, chain_id: u64) -> Value {
        let mut tx = Map::new();
        tx.insert("from".into(), from.into());
        if let Some(to) = &self.to {
            tx.insert("to".into(), to.as_str().into());
        }
        tx.insert("value".into(), quantity(self.value.unwrap_or(0)).into());
        tx.insert(
            "data".into(),
            self.data.as_deref().unwrap_or("0x").into(),
        );

        let optional = [
            ("gas", self.gas_limit.map(u128::from)),
            ("gasPrice", self.gas_price),
            ("maxFeePerGas", self.max_fee_per_gas),
            ("maxPriorityFeePerGas", self.max_priority_fee_per_gas),
            ("nonce", self.nonce.map(u128::from)),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                tx.insert(key.into(), quantity(value).into());
            }
        }

        tx.insert("chainId".into(), self.chain_id.unwrap_or(chain_id).into());
        Value::Object(tx)
    }
}

/// A transaction the wallet accepted and broadcast.
pub struct PendingTransaction {
    pub hash: String,
    pub from: String,
    pub chain_id: u64,
    client: Arc<dyn ChainClient>,
}

impl PendingTransaction {
    /// Poll the chain until the receipt appears or `timeout` elapses
    /// (two minutes when `None`).
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<Value> {
        wait_for_receipt(
            self.client.as_ref(),
            &self.hash,
            timeout.unwrap_or(RECEIPT_TIMEOUT),
            RECEIPT_POLL_INTERVAL,
        )
        .await
    }
}

impl std::fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("hash", &self.hash)
            .field("from", &self.from)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

/// Signer that delegates every signature to the paired wallet.
pub struct EthersSigner {
    bridge: RequestBridge,
    chain: ChainContext,
}

impl EthersSigner {
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

    pub async fn get_address(&self) -> Result<String> {
        self.bridge.get_address().await
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id()
    }

    /// Read-only provider for the active chain.
    pub fn provider(&self) -> Result<Arc<dyn ChainClient>> {
        self.chain.client()
    }

    pub fn switch_chain(&self, chain_id: u64) -> Result<()> {
        self.chain.switch_chain(chain_id)
    }

    /// Sign raw bytes. Valid UTF-8 is sent as text, anything else as `0x` hex.
    pub async fn sign_message(&self, message: &[u8]) -> Result<String> {
        let encoded = match std::str::from_utf8(message) {
            Ok(text) => text.to_string(),
            Err(_) => format!("0x{}", hex::encode(message)),
        };
        let signature = self.bridge.sign_message(&encoded).await?;
        expect_string("personal_sign", signature)
    }

    pub async fn sign_transaction(&self, tx: &TransactionRequest) -> Result<String> {
        let from = self.bridge.get_address().await?;
        let signed = self
            .bridge
            .sign_transaction(tx.to_wire(&from, self.chain_id()))
            .await?;
        expect_string("eth_signTransaction", signed)
    }

    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<PendingTransaction> {
        let from = self.bridge.get_address().await?;
        let chain_id = tx.chain_id.unwrap_or_else(|| self.chain_id());
        let hash = self
            .bridge
            .send_transaction(tx.to_wire(&from, chain_id))
            .await?;
        let hash = expect_string("eth_sendTransaction", hash)?;
        tracing::info!(%hash, chain_id, "transaction sent");

        Ok(PendingTransaction {
            hash,
            from,
            chain_id,
            client: self.chain.client_for(chain_id)?,
        })
    }

    pub async fn sign_typed_data(&self, typed_data: &Value) -> Result<String> {
        let address = self.bridge.get_address().await?;
        let signature = self.bridge.sign_typed_data(&address, typed_data).await?;
        expect_string("eth_signTypedData_v4", signature)
    }
}

pub(super) fn expect_string(method: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(Error::ChainClient(format!(
            "{method} returned a non-string result: {other}"
        ))),
    }
}
