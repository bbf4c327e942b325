//! Campaign Detail Renderer: milestones in index order and the backer scan.

use ethabi::Token;
use std::collections::HashSet;
use tl_chain_client::ContractKind;
use tl_types::{Address, Milestone, U256, saturating_u64};

use crate::bindings::Bindings;
use crate::decode;
use crate::error::DappError;

/// Count, then record and weight per index, one request at a time.
pub async fn fetch_milestones(
    bindings: &Bindings,
    campaign: Address,
) -> Result<Vec<Milestone>, DappError> {
    let handle = bindings.bind(campaign, ContractKind::Campaign, false)?;

    let count = handle
        .call("getMilestonesCount", &[])
        .await
        .map_err(|err| DappError::read("getMilestonesCount", err))?;
    let count = saturating_u64(decode::uint(
        "getMilestonesCount",
        decode::single("getMilestonesCount", count)?,
    )?);

    // count comes from the chain, no pre-sizing
    let mut milestones = Vec::new();
    for index in 0..count {
        let id = [Token::Uint(U256::from(index))];
        let fields = handle
            .call_named("milestones", &id)
            .await
            .map_err(|err| DappError::read(format!("milestones({index})"), err))?;
        let weight = handle
            .call("approvalWeights", &id)
            .await
            .map_err(|err| DappError::read(format!("approvalWeights({index})"), err))?;
        let weight = decode::uint("approvalWeights", decode::single("approvalWeights", weight)?)?;

        milestones.push(decode::milestone(index, fields, weight)?);
    }
    Ok(milestones)
}

/// Distinct contributors across every `Contributed` event.
pub async fn count_backers(bindings: &Bindings, campaign: Address) -> Result<usize, DappError> {
    let handle = bindings.bind(campaign, ContractKind::Campaign, false)?;
    let logs = handle
        .logs("Contributed")
        .await
        .map_err(|err| DappError::read("Contributed logs", err))?;

    let backers: HashSet<Address> = logs
        .into_iter()
        .filter_map(|log| match log.params.into_iter().next()?.value {
            Token::Address(contributor) => Some(contributor),
            _ => None,
        })
        .collect();
    Ok(backers.len())
}
