//! Token to domain value conversions for contract call results.

use ethabi::Token;
use tl_types::{Address, CampaignSummary, Milestone, U256, saturating_u64};

use crate::error::DappError;

fn mismatch(field: &str, token: &Token) -> DappError {
    DappError::ContractCall {
        context: "decode".to_owned(),
        message: format!("{field}: unexpected value {token}"),
    }
}

pub(crate) fn uint(field: &str, token: Token) -> Result<U256, DappError> {
    match token {
        Token::Uint(value) => Ok(value),
        other => Err(mismatch(field, &other)),
    }
}

pub(crate) fn address(field: &str, token: Token) -> Result<Address, DappError> {
    match token {
        Token::Address(value) => Ok(value),
        other => Err(mismatch(field, &other)),
    }
}

pub(crate) fn string(field: &str, token: Token) -> Result<String, DappError> {
    match token {
        Token::String(value) => Ok(value),
        other => Err(mismatch(field, &other)),
    }
}

pub(crate) fn boolean(field: &str, token: Token) -> Result<bool, DappError> {
    match token {
        Token::Bool(value) => Ok(value),
        other => Err(mismatch(field, &other)),
    }
}

pub(crate) fn addresses(field: &str, token: Token) -> Result<Vec<Address>, DappError> {
    match token {
        Token::Array(items) => items.into_iter().map(|item| address(field, item)).collect(),
        other => Err(mismatch(field, &other)),
    }
}

pub(crate) fn single(field: &str, tokens: Vec<Token>) -> Result<Token, DappError> {
    tokens.into_iter().next().ok_or_else(|| DappError::ContractCall {
        context: "decode".to_owned(),
        message: format!("{field}: empty result"),
    })
}

/// `(goal, raised, balance, deadline, creator, title, description)`
pub(crate) fn summary(campaign: Address, tokens: Vec<Token>) -> Result<CampaignSummary, DappError> {
    let count = tokens.len();
    let [goal, raised, balance, deadline, creator, title, description]: [Token; 7] =
        tokens.try_into().map_err(|_| DappError::ContractCall {
            context: "decode".to_owned(),
            message: format!("getSummary: expected 7 fields, got {count}"),
        })?;

    Ok(CampaignSummary {
        address: campaign,
        goal: uint("goal", goal)?,
        raised: uint("raised", raised)?,
        balance: uint("balance", balance)?,
        deadline: saturating_u64(uint("deadline", deadline)?),
        creator: address("creator", creator)?,
        title: string("title", title)?,
        description: string("description", description)?,
    })
}

/// Milestone record by output name, falling back to declaration order
/// `(description, amount, isApproved, isReleased)`.
pub(crate) fn milestone(
    index: u64,
    fields: Vec<(String, Token)>,
    approved_weight: U256,
) -> Result<Milestone, DappError> {
    let named = |name: &str, position: usize| {
        fields
            .iter()
            .find(|(field, _)| field == name)
            .or_else(|| fields.get(position))
            .map(|(_, token)| token.clone())
            .ok_or_else(|| DappError::ContractCall {
                context: "decode".to_owned(),
                message: format!("milestones({index}): missing {name}"),
            })
    };

    Ok(Milestone {
        index,
        description: string("description", named("description", 0)?)?,
        amount: uint("amount", named("amount", 1)?)?,
        approved_weight,
        approved: boolean("isApproved", named("isApproved", 2)?)?,
        released: boolean("isReleased", named("isReleased", 3)?)?,
    })
}
