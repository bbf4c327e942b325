//! Balances for the connected account.

use ethabi::Token;
use serde_json::json;
use tl_chain_client::{CallError, ContractKind, contract::parse_quantity};
use tl_types::{Address, U256, address_hex, format_ether_fixed, format_units, saturating_u64};
use tracing::{debug, warn};

use crate::bindings::Bindings;
use crate::decode;
use crate::error::DappError;
use crate::view::BalanceField;

/// Native balance to four decimals, e.g. `9999.9812 ETH`.
pub async fn eth_balance(bindings: &Bindings, account: Address) -> BalanceField {
    match fetch_eth_balance(bindings, account).await {
        Ok(wei) => BalanceField::Value(format!("{} ETH", format_ether_fixed(wei, 4))),
        Err(err) => {
            warn!("eth balance of {:#x}: {}", account, err);
            BalanceField::Error
        }
    }
}

async fn fetch_eth_balance(bindings: &Bindings, account: Address) -> Result<U256, CallError> {
    let raw = bindings
        .reader()
        .request("eth_getBalance", json!([address_hex(&account), "latest"]))
        .await?;
    let text = raw
        .as_str()
        .ok_or_else(|| CallError::Decode(format!("balance expected, got {raw}")))?;
    parse_quantity(text)
}

/// Reward token balance, or `NotDeployed` when the factory has no token yet.
pub async fn token_balance(bindings: &Bindings, factory: Address, account: Address) -> BalanceField {
    match fetch_token_balance(bindings, factory, account).await {
        Ok(Some(text)) => BalanceField::Value(text),
        Ok(None) => BalanceField::NotDeployed,
        Err(err) => {
            warn!("token balance of {:#x}: {}", account, err);
            BalanceField::Error
        }
    }
}

async fn fetch_token_balance(
    bindings: &Bindings,
    factory: Address,
    account: Address,
) -> Result<Option<String>, DappError> {
    let factory = bindings.bind(factory, ContractKind::Factory, false)?;
    let token = factory
        .call("token", &[])
        .await
        .map_err(|err| DappError::read("token", err))?;
    let token = decode::address("token", decode::single("token", token)?)?;
    debug!("reward token at {:#x}", token);
    if token.is_zero() {
        return Ok(None);
    }

    let handle = bindings.bind(token, ContractKind::RewardToken, false)?;
    let balance = handle
        .call("balanceOf", &[Token::Address(account)])
        .await
        .map_err(|err| DappError::read("balanceOf", err))?;
    let balance = decode::uint("balanceOf", decode::single("balanceOf", balance)?)?;
    let decimals = handle
        .call("decimals", &[])
        .await
        .map_err(|err| DappError::read("decimals", err))?;
    let decimals = saturating_u64(decode::uint("decimals", decode::single("decimals", decimals)?)?)
        .min(u64::from(u8::MAX)) as u8;
    let symbol = handle
        .call("symbol", &[])
        .await
        .map_err(|err| DappError::read("symbol", err))?;
    let symbol = decode::string("symbol", decode::single("symbol", symbol)?)?;

    let amount = format_units(balance, decimals).map_err(|err| DappError::ContractCall {
        context: "decimals".to_owned(),
        message: err.to_string(),
    })?;
    Ok(Some(format!("{amount} {symbol}")))
}
