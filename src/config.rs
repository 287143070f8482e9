//! Client options and app metadata
//!
//! Options are resolved once at construction and never mutated afterwards.
//! The CLI persists them as a JSON file so repeated runs share one identity.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TransportError;

pub const DEFAULT_APP_NAME: &str = "QR Sign";
pub const DEFAULT_APP_DESCRIPTION: &str = "QR-based wallet signing";
pub const DEFAULT_APP_URL: &str = "https://github.com/qrsign/qrsign";
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Identity shown to the wallet during pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub icons: Vec<String>,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: DEFAULT_APP_NAME.to_string(),
            description: DEFAULT_APP_DESCRIPTION.to_string(),
            url: DEFAULT_APP_URL.to_string(),
            icons: Vec::new(),
        }
    }
}

/// Construction-time configuration for a [`WalletClient`](crate::WalletClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOptions {
    /// Relay project identifier
    pub project_id: String,
    #[serde(default)]
    pub metadata: AppMetadata,
    /// Relay endpoint override; the transport picks its own default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_url: Option<Url>,
    /// Chain used when a request does not name one
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Read-side RPC endpoint override for the adapters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<Url>,
    /// Log target handed to the transport
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_target: Option<String>,
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

impl ClientOptions {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            metadata: AppMetadata::default(),
            relay_url: None,
            chain_id: DEFAULT_CHAIN_ID,
            rpc_url: None,
            log_target: None,
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_metadata(mut self, metadata: AppMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_relay_url(mut self, relay_url: Url) -> Self {
        self.relay_url = Some(relay_url);
        self
    }

    pub fn with_rpc_url(mut self, rpc_url: Url) -> Self {
        self.rpc_url = Some(rpc_url);
        self
    }

    /// Check the options before a transport is built from them.
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.project_id.trim().is_empty() {
            return Err(TransportError::InvalidConfig(
                "project id must not be empty".to_string(),
            ));
        }
        if let Some(relay) = &self.relay_url {
            if !matches!(relay.scheme(), "ws" | "wss") {
                return Err(TransportError::InvalidConfig(format!(
                    "relay url must use ws:// or wss://, got {relay}"
                )));
            }
        }
        Ok(())
    }

    /// RPC endpoint for `chain_id`: the configured override, else the public default.
    pub fn rpc_url_for(&self, chain_id: u64) -> Url {
        match &self.rpc_url {
            Some(url) => url.clone(),
            None => default_rpc_url(chain_id),
        }
    }

    /// Load options from disk, `None` when the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).context("Failed to read client config")?;
        let options: ClientOptions =
            serde_json::from_str(&content).context("Failed to parse client config")?;
        Ok(Some(options))
    }

    /// Save options to disk atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let tmp_path = path.with_extension("json.tmp");

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize client config")?;
        std::fs::write(&tmp_path, &content).context("Failed to write client config temp file")?;
        std::fs::rename(&tmp_path, path).context("Failed to atomically save client config")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }
}

/// A chain the pairing proposal asks the wallet for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedChain {
    pub id: u64,
    pub name: &'static str,
    pub rpc_url: &'static str,
}

pub const SUPPORTED_CHAINS: &[SupportedChain] = &[
    SupportedChain {
        id: 1,
        name: "Ethereum",
        rpc_url: "https://eth.llamarpc.com",
    },
    SupportedChain {
        id: 137,
        name: "Polygon",
        rpc_url: "https://polygon.llamarpc.com",
    },
    SupportedChain {
        id: 56,
        name: "BNB Smart Chain",
        rpc_url: "https://bsc.llamarpc.com",
    },
    SupportedChain {
        id: 42161,
        name: "Arbitrum One",
        rpc_url: "https://arbitrum.llamarpc.com",
    },
    SupportedChain {
        id: 10,
        name: "OP Mainnet",
        rpc_url: "https://optimism.llamarpc.com",
    },
    SupportedChain {
        id: 8453,
        name: "Base",
        rpc_url: "https://base.llamarpc.com",
    },
];

pub fn supported_chain(chain_id: u64) -> Option<&'static SupportedChain> {
    SUPPORTED_CHAINS.iter().find(|c| c.id == chain_id)
}

/// Public RPC endpoint for a chain; unknown chains fall back to mainnet.
pub fn default_rpc_url(chain_id: u64) -> Url {
    let raw = supported_chain(chain_id)
        .map(|c| c.rpc_url)
        .unwrap_or(SUPPORTED_CHAINS[0].rpc_url);
    Url::parse(raw).expect("static rpc urls are valid")
}
