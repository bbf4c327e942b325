//! Action Dispatcher pieces: input validation, progress phases, submission.
//!
//! Validation runs before anything touches the network. A failed submission
//! is never retried; the host keeps the form as it was.

use ethabi::Token;
use serde::Serialize;
use std::time::Duration;
use tl_chain_client::{Clock, ContractHandle, RpcTransport, TxReceipt, wait_for_receipt};
use tl_types::{Address, H256, SECONDS_PER_DAY, TargetNetwork, U256, parse_address, parse_ether};
use tracing::{error, info};

use crate::error::DappError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Contribute,
    Vote,
    CreateMilestone,
    Withdraw,
    CreateCampaign,
}

impl ActionKind {
    pub fn success_message(self) -> &'static str {
        match self {
            ActionKind::Contribute => "Contribution successful!",
            ActionKind::Vote => "Voted successfully!",
            ActionKind::CreateMilestone => "Milestone Created!",
            ActionKind::Withdraw => "Funds Released to Creator!",
            ActionKind::CreateCampaign => "Campaign Created Successfully!",
        }
    }

    pub fn refreshes_list(self) -> bool {
        matches!(self, ActionKind::Contribute | ActionKind::CreateCampaign)
    }

    pub fn refreshes_detail(self) -> bool {
        !matches!(self, ActionKind::CreateCampaign)
    }

    fn function(self) -> &'static str {
        match self {
            ActionKind::Contribute => "contribute",
            ActionKind::Vote => "vote",
            ActionKind::CreateMilestone => "createMilestone",
            ActionKind::Withdraw => "withdraw",
            ActionKind::CreateCampaign => "createCampaign",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPhase {
    /// Waiting on the wallet prompt.
    Signing,
    Submitted(H256),
    Confirmed(TxReceipt),
}

/// Receives progress so a host can show an in-flight indicator.
pub trait ActionObserver {
    fn on_phase(&self, kind: ActionKind, phase: &ActionPhase);
}

pub struct Quiet;

impl ActionObserver for Quiet {
    fn on_phase(&self, _kind: ActionKind, _phase: &ActionPhase) {}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignForm {
    pub title: String,
    pub description: String,
    pub goal_eth: String,
    pub duration_days: String,
}

pub(crate) struct ValidCampaign {
    pub title: String,
    pub description: String,
    pub goal: U256,
    pub duration_secs: u64,
}

impl CampaignForm {
    pub(crate) fn validate(&self) -> Result<ValidCampaign, DappError> {
        let fields = [
            &self.title,
            &self.description,
            &self.goal_eth,
            &self.duration_days,
        ];
        if fields.iter().any(|field| field.trim().is_empty()) {
            return Err(DappError::validation("Please fill all fields"));
        }
        Ok(ValidCampaign {
            title: self.title.trim().to_owned(),
            description: self.description.trim().to_owned(),
            goal: positive_amount(&self.goal_eth, "Goal")?,
            duration_secs: positive_days(&self.duration_days)? * SECONDS_PER_DAY,
        })
    }
}

pub(crate) fn campaign_address(input: &str) -> Result<Address, DappError> {
    parse_address(input).map_err(|err| DappError::validation(format!("Invalid campaign address: {err}")))
}

pub(crate) fn required_text(input: &str, message: &str) -> Result<String, DappError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DappError::validation(message));
    }
    Ok(trimmed.to_owned())
}

/// Ether amount that parses and is above zero.
pub(crate) fn positive_amount(input: &str, field: &str) -> Result<U256, DappError> {
    let wei = parse_ether(input).map_err(|err| DappError::validation(format!("{field}: {err}")))?;
    if wei.is_zero() {
        return Err(DappError::validation(format!("{field} must be greater than zero")));
    }
    Ok(wei)
}

pub(crate) fn positive_days(input: &str) -> Result<u64, DappError> {
    match input.trim().parse::<u64>() {
        Ok(days) if days > 0 => days
            .checked_mul(SECONDS_PER_DAY)
            .map(|_| days)
            .ok_or_else(|| DappError::validation("Duration is too long")),
        _ => Err(DappError::validation(
            "Duration must be a whole number of days greater than zero",
        )),
    }
}

pub(crate) fn uint_arg(value: impl Into<U256>) -> Token {
    Token::Uint(value.into())
}

/// What a write needs besides the contract handle.
pub(crate) struct Submitter<'a> {
    pub receipts: &'a dyn RpcTransport,
    pub clock: &'a dyn Clock,
    pub poll_interval: Duration,
    pub network: &'a TargetNetwork,
}

impl Submitter<'_> {
    /// Sends through the signing handle and waits for one confirmation.
    pub async fn submit(
        &self,
        kind: ActionKind,
        handle: &ContractHandle,
        args: &[Token],
        value: Option<U256>,
        observer: &dyn ActionObserver,
    ) -> Result<TxReceipt, DappError> {
        let fail = |err| {
            let err = DappError::transaction(err, self.network);
            error!("{} failed: {}", kind.function(), err);
            err
        };

        observer.on_phase(kind, &ActionPhase::Signing);
        let tx_hash = handle
            .send(kind.function(), args, value)
            .await
            .map_err(fail)?;
        observer.on_phase(kind, &ActionPhase::Submitted(tx_hash));

        let receipt = wait_for_receipt(self.receipts, self.clock, tx_hash, self.poll_interval)
            .await
            .map_err(fail)?;
        info!(
            "{} {:#x} included in block {:?}",
            kind.function(),
            tx_hash,
            receipt.block_number
        );
        observer.on_phase(kind, &ActionPhase::Confirmed(receipt.clone()));
        Ok(receipt)
    }
}
