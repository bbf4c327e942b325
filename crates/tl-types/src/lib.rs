//! Read projections of the crowdfunding contracts plus the wallet session model.
//!
//! Nothing in here is written back to the chain; every value is refreshed
//! by re-querying after a state-changing action.

pub mod amount;

pub use amount::{
    AmountError, ETHER_DECIMALS, clamp_percent, format_ether, format_ether_fixed, format_units,
    parse_ether, parse_units, ratio_percent, saturating_u64,
};
pub use ethabi::ethereum_types::{Address, H256, U256};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must be 40 hex characters, got {0}")]
    InvalidLength(usize),
    #[error("address is not valid hex: {0}")]
    InvalidHex(String),
}

pub fn parse_address(input: &str) -> Result<Address, AddressError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != 40 {
        return Err(AddressError::InvalidLength(digits.len()));
    }

    let bytes = hex::decode(digits).map_err(|err| AddressError::InvalidHex(err.to_string()))?;
    Ok(Address::from_slice(&bytes))
}

/// Full lowercase `0x` form.
pub fn address_hex(address: &Address) -> String {
    format!("{address:#x}")
}

/// `0x5fbd...0aa3`
pub fn short_address(address: &Address) -> String {
    let full = address_hex(address);
    format!("{}...{}", &full[..6], &full[38..])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
    pub fn to_hex(self) -> String {
        format!("{:#x}", self.0)
    }

    pub fn from_hex(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        u64::from_str_radix(digits, 16).ok().map(ChainId)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The network every write must happen on, plus what the wallet needs to register it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetNetwork {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub rpc_url: String,
    pub currency_name: String,
    pub currency_symbol: String,
    pub currency_decimals: u8,
}

impl Default for TargetNetwork {
    fn default() -> Self {
        Self {
            chain_id: ChainId(31337),
            chain_name: "Hardhat Localhost".to_owned(),
            rpc_url: "http://127.0.0.1:8545".to_owned(),
            currency_name: "ETH".to_owned(),
            currency_symbol: "ETH".to_owned(),
            currency_decimals: ETHER_DECIMALS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub connected: bool,
    pub address: Option<Address>,
    pub chain_id: Option<ChainId>,
}

impl Session {
    pub fn connected(address: Address, chain_id: ChainId) -> Self {
        Self {
            connected: true,
            address: Some(address),
            chain_id: Some(chain_id),
        }
    }

    pub fn is_on(&self, target: ChainId) -> bool {
        self.chain_id == Some(target)
    }

    /// A session can sign only while connected on the target network.
    pub fn is_writable_on(&self, target: ChainId) -> bool {
        self.connected && self.address.is_some() && self.is_on(target)
    }

    pub fn is_account(&self, account: &Address) -> bool {
        self.connected && self.address.as_ref() == Some(account)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignSummary {
    pub address: Address,
    pub goal: U256,
    pub raised: U256,
    pub balance: U256,
    pub deadline: u64,
    pub creator: Address,
    pub title: String,
    pub description: String,
}

impl CampaignSummary {
    /// Raw `raised / goal * 100`; may exceed 100.
    pub fn progress(&self) -> f64 {
        ratio_percent(self.raised, self.goal)
    }

    pub fn display_progress(&self) -> f64 {
        clamp_percent(self.progress())
    }

    /// Whole days until the deadline, rounded up. `None` when no deadline is set.
    pub fn days_left(&self, now_unix: u64) -> Option<u64> {
        if self.deadline == 0 {
            return None;
        }
        Some(self.deadline.saturating_sub(now_unix).div_ceil(SECONDS_PER_DAY))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub index: u64,
    pub description: String,
    pub amount: U256,
    pub approved_weight: U256,
    pub approved: bool,
    pub released: bool,
}

impl Milestone {
    pub fn approval_percent(&self, raised: U256) -> f64 {
        ratio_percent(self.approved_weight, raised)
    }

    pub fn decide(&self, viewer_is_creator: bool) -> (MilestoneStatus, MilestoneAction) {
        decide_milestone(self.released, self.approved, viewer_is_creator)
    }
}

/// Weight needed for approval as displayed. The contract enforces the real rule.
pub fn approval_threshold(raised: U256) -> U256 {
    raised / 2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Voting,
    Approved,
    Released,
}

impl MilestoneStatus {
    pub fn label(self) -> &'static str {
        match self {
            MilestoneStatus::Voting => "Voting",
            MilestoneStatus::Approved => "Approved",
            MilestoneStatus::Released => "Released",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneAction {
    None,
    Vote,
    Withdraw,
}

/// Evaluated top to bottom, first match wins.
pub fn decide_milestone(
    released: bool,
    approved: bool,
    viewer_is_creator: bool,
) -> (MilestoneStatus, MilestoneAction) {
    match (released, approved, viewer_is_creator) {
        (true, _, _) => (MilestoneStatus::Released, MilestoneAction::None),
        (false, true, true) => (MilestoneStatus::Approved, MilestoneAction::Withdraw),
        (false, true, false) => (MilestoneStatus::Approved, MilestoneAction::None),
        (false, false, _) => (MilestoneStatus::Voting, MilestoneAction::Vote),
    }
}
