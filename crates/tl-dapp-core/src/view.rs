//! Typed view-models and the functions that turn them into markup.
//!
//! View-models carry display-ready strings; render functions escape every
//! value they interpolate.

use serde::Serialize;
use tl_types::{
    CampaignSummary, Milestone, MilestoneAction, MilestoneStatus, U256, address_hex,
    approval_threshold, clamp_percent, format_ether, short_address,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignCard {
    pub address: String,
    pub title: String,
    pub description: String,
    pub raised_eth: String,
    pub goal_eth: String,
    pub progress_percent: f64,
}

impl CampaignCard {
    pub fn from_summary(summary: &CampaignSummary) -> Self {
        Self {
            address: address_hex(&summary.address),
            title: summary.title.clone(),
            description: summary.description.clone(),
            raised_eth: format_ether(summary.raised),
            goal_eth: format_ether(summary.goal),
            progress_percent: summary.display_progress(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CampaignListView {
    Loaded {
        cards: Vec<CampaignCard>,
        skipped: Vec<String>,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackerCount {
    Pending,
    Known(usize),
}

impl BackerCount {
    pub fn label(&self) -> String {
        match self {
            BackerCount::Pending => "-".to_owned(),
            BackerCount::Known(count) => count.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneRow {
    pub index: u64,
    pub description: String,
    pub amount_eth: String,
    pub approved_weight_eth: String,
    pub threshold_eth: String,
    pub approval_percent: f64,
    pub status: MilestoneStatus,
    pub action: MilestoneAction,
}

impl MilestoneRow {
    pub fn new(milestone: &Milestone, raised: U256, viewer_is_creator: bool) -> Self {
        let (status, action) = milestone.decide(viewer_is_creator);
        Self {
            index: milestone.index,
            description: milestone.description.clone(),
            amount_eth: format_ether(milestone.amount),
            approved_weight_eth: format_ether(milestone.approved_weight),
            threshold_eth: format_ether(approval_threshold(raised)),
            approval_percent: clamp_percent(milestone.approval_percent(raised)),
            status,
            action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MilestonesSection {
    Empty,
    Rows { rows: Vec<MilestoneRow> },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignDetailView {
    pub address: String,
    pub address_short: String,
    pub title: String,
    pub description: String,
    pub raised_eth: String,
    pub goal_eth: String,
    pub balance_eth: String,
    pub progress_percent: f64,
    pub days_left: Option<u64>,
    pub backers: BackerCount,
    pub viewer_is_creator: bool,
    pub milestones: MilestonesSection,
}

impl CampaignDetailView {
    pub fn new(
        summary: &CampaignSummary,
        milestones: MilestonesSection,
        viewer_is_creator: bool,
        now_unix: u64,
    ) -> Self {
        Self {
            address: address_hex(&summary.address),
            address_short: short_address(&summary.address),
            title: summary.title.clone(),
            description: summary.description.clone(),
            raised_eth: format_ether(summary.raised),
            goal_eth: format_ether(summary.goal),
            balance_eth: format_ether(summary.balance),
            progress_percent: summary.display_progress(),
            days_left: summary.days_left(now_unix),
            backers: BackerCount::Pending,
            viewer_is_creator,
            milestones,
        }
    }

    pub fn set_backers(&mut self, backers: BackerCount) {
        self.backers = backers;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetailPage {
    Loaded { view: CampaignDetailView },
    NotFound { address: String },
    Unavailable { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum BalanceField {
    Value(String),
    NotDeployed,
    Error,
}

impl BalanceField {
    pub fn label(&self) -> &str {
        match self {
            BalanceField::Value(text) => text,
            BalanceField::NotDeployed => "Not Deployed",
            BalanceField::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DashboardView {
    Disconnected,
    Connected {
        account_short: String,
        network_label: String,
        eth_balance: BalanceField,
        token_balance: BalanceField,
        campaigns: Vec<CampaignCard>,
    },
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Element id of the backer count placeholder patched after render.
pub fn backers_placeholder_id(address: &str) -> String {
    format!("backers-count-{address}")
}

fn progress_bar(percent: f64) -> String {
    format!(
        r#"<div class="progress-bar"><div class="progress-fill" style="width: {:.2}%"></div></div>"#,
        clamp_percent(percent)
    )
}

/// Where a milestone form is mounted. The detail page and the dashboard can
/// both hold a form for the same campaign, so their field ids differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormScope {
    Detail,
    Dashboard,
}

impl FormScope {
    pub fn as_str(self) -> &'static str {
        match self {
            FormScope::Detail => "detail",
            FormScope::Dashboard => "dash",
        }
    }
}

/// Description and amount input ids of a milestone form.
pub fn milestone_field_ids(scope: &str, address: &str) -> (String, String) {
    (
        format!("{scope}-ms-desc-{address}"),
        format!("{scope}-ms-amount-{address}"),
    )
}

fn milestone_form(scope: FormScope, address: &str) -> String {
    let (description_id, amount_id) = milestone_field_ids(scope.as_str(), address);
    format!(
        r#"<div class="milestone-form">
  <input type="text" id="{description_id}" placeholder="Description (e.g., 'Prototypes')">
  <input type="number" id="{amount_id}" placeholder="Amount (ETH)">
  <button class="btn btn-primary" data-action="create-milestone" data-campaign="{address}" data-scope="{scope}">Create Milestone</button>
</div>"#,
        description_id = escape_html(&description_id),
        amount_id = escape_html(&amount_id),
        address = escape_html(address),
        scope = scope.as_str(),
    )
}

pub fn render_campaign_card(card: &CampaignCard, manage: bool) -> String {
    let address = escape_html(&card.address);
    let (label, extra) = if manage {
        ("Manage Campaign", milestone_form(FormScope::Dashboard, &card.address))
    } else {
        ("View Campaign", String::new())
    };
    format!(
        r#"<div class="card">
  <h3>{title}</h3>
  <p>{description}</p>
  {bar}
  <div class="card-amounts"><span>{raised} ETH raised</span><span>Goal: {goal} ETH</span></div>
  <button class="btn btn-outline" data-action="view" data-campaign="{address}">{label}</button>
  {extra}
</div>"#,
        title = escape_html(&card.title),
        description = escape_html(&card.description),
        bar = progress_bar(card.progress_percent),
        raised = escape_html(&card.raised_eth),
        goal = escape_html(&card.goal_eth),
    )
}

pub fn render_campaign_list(view: &CampaignListView) -> String {
    match view {
        CampaignListView::Loaded { cards, skipped } if cards.is_empty() && skipped.is_empty() => {
            "<p>No campaigns found. Start one!</p>".to_owned()
        }
        CampaignListView::Loaded { cards, skipped } if cards.is_empty() => format!(
            r#"<p class="error">None of the {} campaigns could be loaded.</p>"#,
            skipped.len()
        ),
        CampaignListView::Loaded { cards, .. } => cards
            .iter()
            .map(|card| render_campaign_card(card, false))
            .collect(),
        CampaignListView::Failed { message } => {
            format!(r#"<p class="error">Could not load campaigns: {}</p>"#, escape_html(message))
        }
    }
}

fn render_milestone_row(row: &MilestoneRow, campaign: &str) -> String {
    let campaign = escape_html(campaign);
    let action = match row.action {
        MilestoneAction::None => String::new(),
        MilestoneAction::Vote => format!(
            r#"<button class="btn btn-primary" data-action="vote" data-campaign="{campaign}" data-milestone="{}">Vote Yes</button>"#,
            row.index
        ),
        MilestoneAction::Withdraw => format!(
            r#"<button class="btn btn-success" data-action="withdraw" data-campaign="{campaign}" data-milestone="{}">Receive Funds</button>"#,
            row.index
        ),
    };
    let status_class = match row.status {
        MilestoneStatus::Voting => "status-locked",
        MilestoneStatus::Approved => "status-voting",
        MilestoneStatus::Released => "status-released",
    };
    format!(
        r#"<div class="milestone-item">
  <div class="milestone-head"><h4>{number}. {description}</h4><span class="status-badge {status_class}">{status}</span></div>
  <div>Requested: <strong>{amount} ETH</strong></div>
  <div class="milestone-approval"><span>Approval: {weight} / {threshold} ETH needed</span><span>{percent:.1}%</span></div>
  {bar}
  <div class="milestone-actions">{action}</div>
</div>"#,
        number = row.index + 1,
        description = escape_html(&row.description),
        status = row.status.label(),
        amount = escape_html(&row.amount_eth),
        weight = escape_html(&row.approved_weight_eth),
        threshold = escape_html(&row.threshold_eth),
        percent = row.approval_percent,
        bar = progress_bar(row.approval_percent),
    )
}

pub fn render_milestones(section: &MilestonesSection, campaign: &str) -> String {
    match section {
        MilestonesSection::Empty => "<p>No milestones yet.</p>".to_owned(),
        MilestonesSection::Rows { rows } => {
            let items: String = rows
                .iter()
                .map(|row| render_milestone_row(row, campaign))
                .collect();
            format!(r#"<div class="milestones-list">{items}</div>"#)
        }
        MilestonesSection::Failed { message } => format!(
            r#"<p class="error">Error loading milestones: {}</p>"#,
            escape_html(message)
        ),
    }
}

pub fn render_detail(page: &DetailPage) -> String {
    let view = match page {
        DetailPage::Loaded { view } => view,
        DetailPage::NotFound { .. } => {
            return r#"<p class="error">Campaign not found on blockchain.</p>"#.to_owned();
        }
        DetailPage::Unavailable { message } => {
            return format!(r#"<p class="error">{}</p>"#, escape_html(message));
        }
    };

    let address = escape_html(&view.address);
    let creator_form = if view.viewer_is_creator {
        format!(
            "<h4>Create New Milestone (Unlock Funds)</h4>{}",
            milestone_form(FormScope::Detail, &view.address)
        )
    } else {
        String::new()
    };
    let days_left = view
        .days_left
        .map(|days| days.to_string())
        .unwrap_or_else(|| "-".to_owned());

    format!(
        r#"<div class="campaign-main">
  <h1>{title}</h1>
  <span class="status-badge">Contract: {short}</span>
  <p class="description">{description}</p>
  <h3>Milestones (Governance)</h3>
  {creator_form}
  {milestones}
</div>
<div class="card campaign-side">
  <div>Total Pledged</div>
  <h2>{raised} ETH</h2>
  <div class="card-amounts"><span>Goal: {goal} ETH</span><span>{progress:.0}% Funded</span></div>
  {bar}
  <div class="escrow">Escrow Balance <strong>{balance} ETH</strong></div>
  <div class="stats">
    <div><div id="{backers_id}">{backers}</div><div>Backers</div></div>
    <div><div>{days_left}</div><div>Days Left</div></div>
  </div>
  <input type="number" id="contribute-amount-{address}" placeholder="Amount (ETH)">
  <button class="btn btn-primary" data-action="contribute" data-campaign="{address}">Contribute ETH</button>
</div>"#,
        title = escape_html(&view.title),
        short = escape_html(&view.address_short),
        description = escape_html(&view.description),
        milestones = render_milestones(&view.milestones, &view.address),
        raised = escape_html(&view.raised_eth),
        goal = escape_html(&view.goal_eth),
        progress = view.progress_percent,
        bar = progress_bar(view.progress_percent),
        balance = escape_html(&view.balance_eth),
        backers_id = escape_html(&backers_placeholder_id(&view.address)),
        backers = view.backers.label(),
    )
}

pub fn render_dashboard(view: &DashboardView) -> String {
    let DashboardView::Connected {
        account_short,
        network_label,
        eth_balance,
        token_balance,
        campaigns,
    } = view
    else {
        return "<p>Please connect wallet.</p>".to_owned();
    };

    let cards = if campaigns.is_empty() {
        "<p>You haven't created any campaigns yet.</p>".to_owned()
    } else {
        campaigns
            .iter()
            .map(|card| render_campaign_card(card, true))
            .collect()
    };

    format!(
        r#"<div class="stats-grid">
  <div class="stat-card"><div>Address</div><div class="stat-value">{account}</div></div>
  <div class="stat-card"><div>Network</div><div class="stat-value">{network}</div></div>
  <div class="stat-card"><div>ETH Balance</div><div class="stat-value" id="user-eth-balance">{eth}</div></div>
  <div class="stat-card"><div>TSL Tokens</div><div class="stat-value" id="token-balance">{token}</div></div>
</div>
<h2>My Campaigns</h2>
<div id="dashboard-campaigns-grid" class="campaigns-grid">{cards}</div>"#,
        account = escape_html(account_short),
        network = escape_html(network_label),
        eth = escape_html(eth_balance.label()),
        token = escape_html(token_balance.label()),
    )
}
