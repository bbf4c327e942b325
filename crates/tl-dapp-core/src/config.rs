//! Deployment settings: target network, factory address, descriptor location.
//!
//! Layered as defaults, then an optional JSON file, then `TRUSTLAYER_*`
//! environment variables. Hosts apply their own flags last.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tl_types::{Address, AddressError, ChainId, TargetNetwork, parse_address};

pub const DEFAULT_FACTORY_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
pub const DEFAULT_ABI_DIR: &str = "abis";
pub const DEFAULT_RECEIPT_POLL_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid factory address: {0}")]
    InvalidFactory(#[from] AddressError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DappConfig {
    pub network: TargetNetwork,
    pub factory_address: String,
    pub abi_dir: String,
    pub receipt_poll_ms: u64,
}

impl Default for DappConfig {
    fn default() -> Self {
        Self {
            network: TargetNetwork::default(),
            factory_address: DEFAULT_FACTORY_ADDRESS.to_owned(),
            abi_dir: DEFAULT_ABI_DIR.to_owned(),
            receipt_poll_ms: DEFAULT_RECEIPT_POLL_MS,
        }
    }
}

impl DappConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Overlays `TRUSTLAYER_*` variables from the process environment.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.overlay(|key| std::env::var(key).ok())
    }

    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TRUSTLAYER_RPC_URL") {
            self.network.rpc_url = url;
        }
        if let Some(raw) = lookup("TRUSTLAYER_CHAIN_ID") {
            self.network.chain_id = parse_chain_id(&raw)?;
        }
        if let Some(address) = lookup("TRUSTLAYER_FACTORY_ADDRESS") {
            self.factory_address = address;
        }
        if let Some(dir) = lookup("TRUSTLAYER_ABI_DIR") {
            self.abi_dir = dir;
        }
        self.factory()?;
        Ok(self)
    }

    pub fn factory(&self) -> Result<Address, ConfigError> {
        Ok(parse_address(&self.factory_address)?)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }
}

/// Accepts decimal (`31337`) or hex (`0x7a69`).
pub fn parse_chain_id(raw: &str) -> Result<ChainId, ConfigError> {
    let trimmed = raw.trim();
    let parsed = if trimmed.starts_with("0x") {
        ChainId::from_hex(trimmed)
    } else {
        trimmed.parse().ok().map(ChainId)
    };
    parsed.ok_or_else(|| ConfigError::InvalidValue {
        key: "TRUSTLAYER_CHAIN_ID",
        value: raw.to_owned(),
    })
}
