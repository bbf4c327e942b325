//! The one mutable structure: session plus campaign summary cache.
//!
//! Only the controller writes it, and never across a suspension point.

use tl_types::{Address, CampaignSummary, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Home,
    Campaign(Address),
    Dashboard,
}

#[derive(Debug, Clone, Default)]
pub struct DappState {
    pub session: Session,
    pub campaigns: Vec<CampaignSummary>,
    pub page: Page,
}

impl DappState {
    pub fn cached(&self, address: &Address) -> Option<&CampaignSummary> {
        self.campaigns.iter().find(|summary| &summary.address == address)
    }

    /// A list load overwrites the cache wholesale.
    pub fn replace_campaigns(&mut self, campaigns: Vec<CampaignSummary>) {
        self.campaigns = campaigns;
    }

    /// Stores a directly fetched summary, replacing any stale copy.
    pub fn remember(&mut self, summary: CampaignSummary) {
        match self
            .campaigns
            .iter_mut()
            .find(|cached| cached.address == summary.address)
        {
            Some(slot) => *slot = summary,
            None => self.campaigns.push(summary),
        }
    }

    pub fn forget(&mut self, address: &Address) {
        self.campaigns.retain(|summary| &summary.address != address);
    }

    pub fn created_by(&self, creator: &Address) -> Vec<CampaignSummary> {
        self.campaigns
            .iter()
            .filter(|summary| &summary.creator == creator)
            .cloned()
            .collect()
    }

    pub fn reset(&mut self) {
        *self = DappState::default();
    }
}
