//! Session model
//!
//! A session is the topic-scoped authorization a wallet grants after pairing.
//! Accounts are CAIP-10 strings (`eip155:1:0xabc...`) grouped per namespace.

pub mod proposal;
pub mod store;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AppMetadata;
use crate::error::{Error, Result};

pub use proposal::PairingProposal;
pub use store::SessionStore;

/// Namespace of EVM chains.
pub const EIP155: &str = "eip155";

/// Namespace name → granted capabilities.
pub type Namespaces = BTreeMap<String, Namespace>;

/// Capabilities granted for one chain namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chains: Vec<String>,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Identifier scoping every remote call made under this session
    pub topic: String,
    #[serde(default)]
    pub namespaces: Namespaces,
    /// Unix timestamp (seconds) after which the relay expires the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    /// Wallet identity, when the peer advertised one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<AppMetadata>,
}

impl Session {
    pub fn new(topic: impl Into<String>, namespaces: Namespaces) -> Self {
        Self {
            topic: topic.into(),
            namespaces,
            expiry: None,
            peer: None,
        }
    }

    /// Accounts granted under `namespace`, empty when the namespace is absent.
    pub fn accounts(&self, namespace: &str) -> &[String] {
        self.namespaces
            .get(namespace)
            .map(|ns| ns.accounts.as_slice())
            .unwrap_or_default()
    }

    /// First account of `namespace`, parsed.
    pub fn primary_account(&self, namespace: &str) -> Result<AccountId> {
        let account = self
            .accounts(namespace)
            .first()
            .ok_or_else(|| Error::NoAccounts(namespace.to_string()))?;
        AccountId::parse(account)
    }

    /// Address of the first EVM account.
    pub fn address(&self) -> Result<String> {
        Ok(self.primary_account(EIP155)?.address)
    }
}

/// CAIP-10 account id: `<namespace>:<reference>:<address>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId {
    pub namespace: String,
    pub reference: String,
    pub address: String,
}

impl AccountId {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(ns), Some(reference), Some(address))
                if !ns.is_empty() && !reference.is_empty() && !address.is_empty() =>
            {
                Ok(Self {
                    namespace: ns.to_string(),
                    reference: reference.to_string(),
                    address: address.to_string(),
                })
            }
            _ => Err(Error::InvalidAccount(raw.to_string())),
        }
    }

    /// CAIP-2 chain id this account lives on.
    pub fn chain(&self) -> String {
        format!("{}:{}", self.namespace, self.reference)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.reference, self.address)
    }
}

/// CAIP-2 scope for an EVM chain id.
pub fn evm_chain(chain_id: u64) -> String {
    format!("{EIP155}:{chain_id}")
}
