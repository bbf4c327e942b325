//! TrustLayer dApp controller.
//!
//! Connects a wallet, enumerates campaigns from the factory, renders campaign
//! detail with milestone governance, and dispatches the five write actions.
//! Hosts (the browser crate, the ops CLI) supply transports and a clock.

pub mod actions;
pub mod app;
pub mod bindings;
pub mod campaigns;
pub mod config;
pub mod dashboard;
mod decode;
pub mod detail;
pub mod error;
pub mod session;
pub mod state;
pub mod view;

#[cfg(test)]
pub(crate) mod testkit;

pub use actions::{ActionKind, ActionObserver, ActionPhase, CampaignForm, Quiet};
pub use app::{ActionOutcome, Dapp};
pub use config::{ConfigError, DappConfig};
pub use error::{DappError, normalize_error_message};
pub use state::{DappState, Page};
pub use view::{
    BackerCount, BalanceField, CampaignCard, CampaignDetailView, CampaignListView, DashboardView,
    DetailPage, MilestoneRow, MilestonesSection,
};
