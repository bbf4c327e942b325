//! Contract interface descriptors.
//!
//! Each descriptor loads independently: a broken token artifact only
//! disables token features.

use ethabi::Contract;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    Factory,
    Campaign,
    RewardToken,
}

impl ContractKind {
    pub const ALL: [ContractKind; 3] = [
        ContractKind::Factory,
        ContractKind::Campaign,
        ContractKind::RewardToken,
    ];

    pub fn descriptor_file(self) -> &'static str {
        match self {
            ContractKind::Factory => "TrustLayer.json",
            ContractKind::Campaign => "Campaign.json",
            ContractKind::RewardToken => "RewardToken.json",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractKind::Factory => "factory",
            ContractKind::Campaign => "campaign",
            ContractKind::RewardToken => "reward token",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("{kind} interface could not be loaded: {reason}")]
    Unavailable { kind: ContractKind, reason: String },
    #[error("{kind} interface is malformed: {reason}")]
    Malformed { kind: ContractKind, reason: String },
}

#[derive(Deserialize)]
struct Artifact {
    abi: Value,
}

/// Parses a `{ "abi": [...] }` artifact.
pub fn parse_descriptor(kind: ContractKind, bytes: &[u8]) -> Result<Contract, AbiError> {
    let malformed = |reason: String| AbiError::Malformed { kind, reason };

    let artifact: Artifact =
        serde_json::from_slice(bytes).map_err(|err| malformed(err.to_string()))?;
    if !artifact.abi.is_array() {
        return Err(malformed("`abi` must be an array".to_owned()));
    }

    let raw = serde_json::to_vec(&artifact.abi).map_err(|err| malformed(err.to_string()))?;
    Contract::load(raw.as_slice()).map_err(|err| malformed(err.to_string()))
}

#[derive(Clone)]
pub struct AbiSet {
    factory: Result<Rc<Contract>, AbiError>,
    campaign: Result<Rc<Contract>, AbiError>,
    token: Result<Rc<Contract>, AbiError>,
}

impl AbiSet {
    /// Loads every descriptor through `fetch`; failures are kept per contract.
    pub fn from_sources<F>(mut fetch: F) -> Self
    where
        F: FnMut(ContractKind) -> Result<Vec<u8>, String>,
    {
        let mut load = |kind: ContractKind| {
            let loaded = fetch(kind)
                .map_err(|reason| AbiError::Unavailable { kind, reason })
                .and_then(|bytes| parse_descriptor(kind, &bytes))
                .map(Rc::new);
            match &loaded {
                Ok(_) => info!("{} interface loaded", kind),
                Err(err) => error!("{}", err),
            }
            loaded
        };

        Self {
            factory: load(ContractKind::Factory),
            campaign: load(ContractKind::Campaign),
            token: load(ContractKind::RewardToken),
        }
    }

    pub fn load_dir(dir: &Path) -> Self {
        Self::from_sources(|kind| {
            let path = dir.join(kind.descriptor_file());
            std::fs::read(&path).map_err(|err| format!("{}: {err}", path.display()))
        })
    }

    pub fn get(&self, kind: ContractKind) -> Result<Rc<Contract>, AbiError> {
        match kind {
            ContractKind::Factory => self.factory.clone(),
            ContractKind::Campaign => self.campaign.clone(),
            ContractKind::RewardToken => self.token.clone(),
        }
    }

    pub fn is_available(&self, kind: ContractKind) -> bool {
        self.get(kind).is_ok()
    }
}
