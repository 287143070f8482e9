use std::collections::BTreeMap;

use serde::Serialize;

use super::{evm_chain, EIP155};
use crate::config::SUPPORTED_CHAINS;

pub const ETH_SEND_TRANSACTION: &str = "eth_sendTransaction";
pub const ETH_SIGN_TRANSACTION: &str = "eth_signTransaction";
pub const ETH_SIGN: &str = "eth_sign";
pub const PERSONAL_SIGN: &str = "personal_sign";
pub const ETH_SIGN_TYPED_DATA: &str = "eth_signTypedData";
pub const ETH_SIGN_TYPED_DATA_V4: &str = "eth_signTypedData_v4";

pub const CHAIN_CHANGED: &str = "chainChanged";
pub const ACCOUNTS_CHANGED: &str = "accountsChanged";

/// Methods every session is asked to grant.
pub const REQUIRED_METHODS: &[&str] = &[
    ETH_SEND_TRANSACTION,
    ETH_SIGN_TRANSACTION,
    ETH_SIGN,
    PERSONAL_SIGN,
    ETH_SIGN_TYPED_DATA,
    ETH_SIGN_TYPED_DATA_V4,
];

pub const REQUIRED_EVENTS: &[&str] = &[CHAIN_CHANGED, ACCOUNTS_CHANGED];

/// What a namespace must support for the wallet to accept the pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredNamespace {
    pub chains: Vec<String>,
    pub methods: Vec<String>,
    pub events: Vec<String>,
}

/// Capabilities requested when pairing. Built per connect attempt, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingProposal {
    pub required_namespaces: BTreeMap<String, RequiredNamespace>,
}

impl PairingProposal {
    /// The fixed EVM proposal covering every supported chain.
    pub fn evm() -> Self {
        let namespace = RequiredNamespace {
            chains: SUPPORTED_CHAINS.iter().map(|c| evm_chain(c.id)).collect(),
            methods: REQUIRED_METHODS.iter().map(|m| m.to_string()).collect(),
            events: REQUIRED_EVENTS.iter().map(|e| e.to_string()).collect(),
        };
        Self {
            required_namespaces: BTreeMap::from([(EIP155.to_string(), namespace)]),
        }
    }
}

impl Default for PairingProposal {
    fn default() -> Self {
        Self::evm()
    }
}
