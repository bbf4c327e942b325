//! User-facing error kinds. Every variant renders as a message fit for the page.

use thiserror::Error;
use tl_chain_client::{AbiError, CallError};
use tl_types::{ChainId, TargetNetwork};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DappError {
    #[error("No wallet found. Please install MetaMask or another browser wallet.")]
    NoWallet,
    #[error("Request was rejected in your wallet.")]
    UserRejected,
    #[error("Please switch to {expected_name} (chainId {expected}).")]
    WrongNetwork {
        expected: ChainId,
        expected_name: String,
        actual: Option<ChainId>,
    },
    #[error("{0}")]
    Validation(String),
    #[error("{context}: {message}")]
    ContractCall { context: String, message: String },
    #[error("{0}")]
    Transaction(String),
    #[error(transparent)]
    AbiUnavailable(#[from] AbiError),
}

impl DappError {
    pub fn validation(message: impl Into<String>) -> Self {
        DappError::Validation(message.into())
    }

    pub(crate) fn read(context: impl Into<String>, err: CallError) -> Self {
        let message = match err {
            CallError::Rpc(rpc) => rpc.detail(),
            other => other.to_string(),
        };
        DappError::ContractCall {
            context: context.into(),
            message,
        }
    }

    pub(crate) fn wrong_network(network: &TargetNetwork, actual: Option<ChainId>) -> Self {
        DappError::WrongNetwork {
            expected: network.chain_id,
            expected_name: network.chain_name.clone(),
            actual,
        }
    }

    /// Failed write, message normalized for display.
    pub(crate) fn transaction(err: CallError, network: &TargetNetwork) -> Self {
        let raw = match err {
            CallError::Rpc(rpc) => rpc.detail(),
            other => other.to_string(),
        };
        DappError::Transaction(normalize_error_message(&raw, network))
    }
}

/// Maps well-known provider and node messages to friendlier text.
pub fn normalize_error_message(raw: &str, network: &TargetNetwork) -> String {
    let lower = raw.to_lowercase();

    if lower.contains("user rejected") || lower.contains("denied") || lower.contains("rejected") {
        return "Transaction was rejected in your wallet.".to_owned();
    }
    if lower.contains("insufficient funds") {
        return "Insufficient funds for this transaction.".to_owned();
    }
    if lower.contains("wrong network") || lower.contains("chain id") || lower.contains("chainid") {
        return format!(
            "Please switch to {} (chainId {}).",
            network.chain_name, network.chain_id
        );
    }
    if let Some(reason) = revert_reason(raw) {
        return reason.to_owned();
    }
    raw.trim().to_owned()
}

fn revert_reason(raw: &str) -> Option<&str> {
    const HARDHAT: &str = "reverted with reason string '";
    const GETH: &str = "execution reverted: ";

    if let Some(start) = raw.find(HARDHAT) {
        let rest = &raw[start + HARDHAT.len()..];
        return rest.find('\'').map(|end| &rest[..end]);
    }
    raw.find(GETH)
        .map(|start| raw[start + GETH.len()..].trim())
        .filter(|reason| !reason.is_empty())
}
