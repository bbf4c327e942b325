//! Campaign List Renderer: factory enumeration plus one summary per campaign.

use futures::future::join_all;
use tl_chain_client::ContractKind;
use tl_types::{Address, CampaignSummary, short_address};
use tracing::{info, warn};

use crate::bindings::Bindings;
use crate::decode;
use crate::error::DappError;

/// Summaries in factory order, plus the campaigns whose summary failed.
#[derive(Debug, Clone, Default)]
pub struct CampaignListing {
    pub summaries: Vec<CampaignSummary>,
    pub skipped: Vec<Address>,
}

pub async fn deployed_campaigns(
    bindings: &Bindings,
    factory: Address,
) -> Result<Vec<Address>, DappError> {
    let handle = bindings.bind(factory, ContractKind::Factory, false)?;
    let tokens = handle
        .call("getDeployedCampaigns", &[])
        .await
        .map_err(|err| DappError::read("getDeployedCampaigns", err))?;
    decode::addresses("getDeployedCampaigns", decode::single("getDeployedCampaigns", tokens)?)
}

pub async fn fetch_summary(
    bindings: &Bindings,
    campaign: Address,
) -> Result<CampaignSummary, DappError> {
    let handle = bindings.bind(campaign, ContractKind::Campaign, false)?;
    let tokens = handle
        .call("getSummary", &[])
        .await
        .map_err(|err| DappError::read(format!("getSummary {}", short_address(&campaign)), err))?;
    decode::summary(campaign, tokens)
}

/// Fetches every summary concurrently. A failing campaign is logged and skipped.
/// A missing campaign descriptor fails the whole list.
pub async fn list_campaigns(
    bindings: &Bindings,
    factory: Address,
) -> Result<CampaignListing, DappError> {
    bindings.abis().get(ContractKind::Campaign)?;
    let addresses = deployed_campaigns(bindings, factory).await?;
    info!("factory lists {} campaigns", addresses.len());

    let results = join_all(
        addresses
            .iter()
            .map(|campaign| fetch_summary(bindings, *campaign)),
    )
    .await;

    let mut listing = CampaignListing::default();
    for (campaign, result) in addresses.into_iter().zip(results) {
        match result {
            Ok(summary) => listing.summaries.push(summary),
            Err(err) => {
                warn!("skipping campaign {:#x}: {}", campaign, err);
                listing.skipped.push(campaign);
            }
        }
    }
    Ok(listing)
}
