//! The controller hosts drive: one per page, owning the state container.

use ethabi::Token;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tl_chain_client::{AbiSet, Clock, ContractKind, RpcTransport, TxReceipt, WalletEvent, WalletHandle};
use tl_types::{Address, CampaignSummary, Session, U256, address_hex, short_address};
use tracing::{error, info, warn};

use crate::actions::{self, ActionKind, ActionObserver, CampaignForm, Submitter};
use crate::bindings::Bindings;
use crate::campaigns;
use crate::config::{ConfigError, DappConfig};
use crate::dashboard;
use crate::detail;
use crate::error::DappError;
use crate::session::{self, SessionManager};
use crate::state::{DappState, Page};
use crate::view::{
    BackerCount, CampaignCard, CampaignDetailView, CampaignListView, DashboardView, DetailPage,
    MilestoneRow, MilestonesSection,
};

/// Result of a confirmed action plus the views it refreshed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub kind: ActionKind,
    #[serde(skip)]
    pub receipt: TxReceipt,
    pub message: String,
    pub list: Option<CampaignListView>,
    pub detail: Option<DetailPage>,
}

pub struct Dapp {
    config: DappConfig,
    factory: Address,
    bindings: Bindings,
    sessions: SessionManager,
    clock: Rc<dyn Clock>,
    state: RefCell<DappState>,
    watching: Cell<bool>,
}

impl Dapp {
    pub fn new(
        config: DappConfig,
        abis: AbiSet,
        network: Rc<dyn RpcTransport>,
        wallet: Option<WalletHandle>,
        clock: Rc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let factory = config.factory()?;
        Ok(Self {
            sessions: SessionManager::new(wallet, config.network.clone()),
            bindings: Bindings::new(abis, network),
            factory,
            config,
            clock,
            state: RefCell::new(DappState::default()),
            watching: Cell::new(false),
        })
    }

    pub fn config(&self) -> &DappConfig {
        &self.config
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn has_wallet(&self) -> bool {
        self.sessions.wallet().is_some()
    }

    pub fn session(&self) -> Session {
        self.state.borrow().session.clone()
    }

    pub fn page(&self) -> Page {
        self.state.borrow().page
    }

    pub fn navigate(&self, page: Page) {
        self.state.borrow_mut().page = page;
    }

    pub fn cached_campaigns(&self) -> Vec<CampaignSummary> {
        self.state.borrow().campaigns.clone()
    }

    fn store_session(&self, session: Session) {
        match (self.sessions.wallet(), session.address) {
            (Some(wallet), Some(account)) if session.is_writable_on(self.config.network.chain_id) => {
                self.bindings.attach_signer(wallet.transport(), account);
            }
            _ => self.bindings.detach_signer(),
        }
        self.state.borrow_mut().session = session;
    }

    /// Picks up a wallet the user authorized on an earlier visit. Never prompts.
    pub async fn restore_session(&self) -> Option<Session> {
        match self.sessions.restore().await {
            Ok(Some(session)) => {
                info!("restored session for {:?}", session.address);
                self.store_session(session.clone());
                Some(session)
            }
            Ok(None) => None,
            Err(err) => {
                warn!("session restore failed: {}", err);
                None
            }
        }
    }

    /// Account access, then network enforcement. On `WrongNetwork` the session
    /// stays recorded but read-only.
    pub async fn connect(&self) -> Result<Session, DappError> {
        let session = self.sessions.request_access().await?;
        self.store_session(session.clone());

        let session = self.sessions.ensure_network(session).await?;
        self.store_session(session.clone());
        Ok(session)
    }

    /// Any account or network change wipes the state; `on_reset` lets the host
    /// redraw (a browser host simply reloads).
    pub fn watch_wallet<F>(self: &Rc<Self>, on_reset: F)
    where
        F: Fn(&WalletEvent) + 'static,
    {
        if self.watching.replace(true) {
            return;
        }
        let dapp = Rc::downgrade(self);
        self.sessions.subscribe(Box::new(move |event| {
            info!("{}, resetting", session::describe(&event));
            if let Some(dapp) = dapp.upgrade() {
                dapp.reset();
            }
            on_reset(&event);
        }));
    }

    pub fn reset(&self) {
        self.state.borrow_mut().reset();
        self.bindings.detach_signer();
    }

    pub async fn load_campaigns(&self) -> CampaignListView {
        match campaigns::list_campaigns(&self.bindings, self.factory).await {
            Ok(listing) => {
                let cards = listing
                    .summaries
                    .iter()
                    .map(CampaignCard::from_summary)
                    .collect();
                let skipped = listing.skipped.iter().map(address_hex).collect();
                self.state.borrow_mut().replace_campaigns(listing.summaries);
                CampaignListView::Loaded { cards, skipped }
            }
            Err(err) => {
                error!("loading campaigns: {}", err);
                CampaignListView::Failed {
                    message: err.to_string(),
                }
            }
        }
    }

    /// Cache first, then milestones in index order. The backer count is left
    /// pending; see [`Dapp::backer_count`].
    pub async fn view_campaign(&self, campaign: Address) -> DetailPage {
        self.navigate(Page::Campaign(campaign));

        let cached = self.state.borrow().cached(&campaign).cloned();
        let summary = match cached {
            Some(summary) => summary,
            None => match campaigns::fetch_summary(&self.bindings, campaign).await {
                Ok(summary) => {
                    self.state.borrow_mut().remember(summary.clone());
                    summary
                }
                Err(DappError::AbiUnavailable(err)) => {
                    return DetailPage::Unavailable {
                        message: err.to_string(),
                    };
                }
                Err(err) => {
                    warn!("campaign {:#x} not found: {}", campaign, err);
                    return DetailPage::NotFound {
                        address: address_hex(&campaign),
                    };
                }
            },
        };

        let viewer_is_creator = self.session().is_account(&summary.creator);
        let milestones = match detail::fetch_milestones(&self.bindings, campaign).await {
            Ok(list) if list.is_empty() => MilestonesSection::Empty,
            Ok(list) => MilestonesSection::Rows {
                rows: list
                    .iter()
                    .map(|milestone| MilestoneRow::new(milestone, summary.raised, viewer_is_creator))
                    .collect(),
            },
            Err(err) => {
                error!("milestones of {:#x}: {}", campaign, err);
                MilestonesSection::Failed {
                    message: err.to_string(),
                }
            }
        };

        DetailPage::Loaded {
            view: CampaignDetailView::new(
                &summary,
                milestones,
                viewer_is_creator,
                self.clock.now_unix(),
            ),
        }
    }

    /// Best-effort background scan. Failure keeps the placeholder.
    pub async fn backer_count(&self, campaign: Address) -> BackerCount {
        match detail::count_backers(&self.bindings, campaign).await {
            Ok(count) => BackerCount::Known(count),
            Err(err) => {
                warn!("backer count of {:#x}: {}", campaign, err);
                BackerCount::Pending
            }
        }
    }

    pub async fn dashboard(&self) -> DashboardView {
        self.navigate(Page::Dashboard);
        let session = self.session();
        let Some(account) = session.address.filter(|_| session.connected) else {
            return DashboardView::Disconnected;
        };

        if self.state.borrow().campaigns.is_empty() {
            self.load_campaigns().await;
        }
        let network_label = if session.is_on(self.config.network.chain_id) {
            "Localhost"
        } else {
            "Wrong Network!"
        };
        let eth_balance = dashboard::eth_balance(&self.bindings, account).await;
        let token_balance = dashboard::token_balance(&self.bindings, self.factory, account).await;
        let campaigns = self
            .state
            .borrow()
            .created_by(&account)
            .iter()
            .map(CampaignCard::from_summary)
            .collect();

        DashboardView::Connected {
            account_short: short_address(&account),
            network_label: network_label.to_owned(),
            eth_balance,
            token_balance,
            campaigns,
        }
    }

    pub async fn contribute(
        &self,
        campaign: &str,
        amount: &str,
        observer: &dyn ActionObserver,
    ) -> Result<ActionOutcome, DappError> {
        self.require_writable()?;
        let campaign = actions::campaign_address(campaign)?;
        let value = actions::positive_amount(amount, "Amount")?;
        self.dispatch(ActionKind::Contribute, campaign, Vec::new(), Some(value), observer)
            .await
    }

    pub async fn vote(
        &self,
        campaign: &str,
        milestone: u64,
        observer: &dyn ActionObserver,
    ) -> Result<ActionOutcome, DappError> {
        self.require_writable()?;
        let campaign = actions::campaign_address(campaign)?;
        let args = vec![actions::uint_arg(milestone)];
        self.dispatch(ActionKind::Vote, campaign, args, None, observer)
            .await
    }

    pub async fn create_milestone(
        &self,
        campaign: &str,
        description: &str,
        amount: &str,
        observer: &dyn ActionObserver,
    ) -> Result<ActionOutcome, DappError> {
        self.require_writable()?;
        let campaign = actions::campaign_address(campaign)?;
        let description = actions::required_text(description, "Fill all fields")?;
        let amount = actions::positive_amount(amount, "Amount")?;
        let args = vec![Token::String(description), Token::Uint(amount)];
        self.dispatch(ActionKind::CreateMilestone, campaign, args, None, observer)
            .await
    }

    pub async fn withdraw(
        &self,
        campaign: &str,
        milestone: u64,
        observer: &dyn ActionObserver,
    ) -> Result<ActionOutcome, DappError> {
        self.require_writable()?;
        let campaign = actions::campaign_address(campaign)?;
        let args = vec![actions::uint_arg(milestone)];
        self.dispatch(ActionKind::Withdraw, campaign, args, None, observer)
            .await
    }

    pub async fn create_campaign(
        &self,
        form: &CampaignForm,
        observer: &dyn ActionObserver,
    ) -> Result<ActionOutcome, DappError> {
        self.require_writable()?;
        let valid = form.validate()?;
        let args = vec![
            Token::String(valid.title),
            Token::String(valid.description),
            Token::Uint(valid.goal),
            actions::uint_arg(valid.duration_secs),
        ];
        self.dispatch(ActionKind::CreateCampaign, self.factory, args, None, observer)
            .await
    }

    fn require_writable(&self) -> Result<Address, DappError> {
        let session = self.session();
        let account = match session.address {
            Some(account) if session.connected => account,
            _ => return Err(DappError::validation("Connect wallet first")),
        };
        if !session.is_on(self.config.network.chain_id) {
            return Err(DappError::wrong_network(&self.config.network, session.chain_id));
        }
        Ok(account)
    }

    /// Refetches one cached summary in place. On failure the stale copy is
    /// dropped so the detail page fetches it again.
    async fn refresh_summary(&self, campaign: Address) {
        match campaigns::fetch_summary(&self.bindings, campaign).await {
            Ok(summary) => self.state.borrow_mut().remember(summary),
            Err(err) => {
                warn!("refreshing {:#x}: {}", campaign, err);
                self.state.borrow_mut().forget(&campaign);
            }
        }
    }

    async fn dispatch(
        &self,
        kind: ActionKind,
        target: Address,
        args: Vec<Token>,
        value: Option<U256>,
        observer: &dyn ActionObserver,
    ) -> Result<ActionOutcome, DappError> {
        let contract = match kind {
            ActionKind::CreateCampaign => ContractKind::Factory,
            _ => ContractKind::Campaign,
        };
        let handle = self.bindings.bind(target, contract, true)?;
        let reader = self.bindings.reader();
        let submitter = Submitter {
            receipts: reader.as_ref(),
            clock: self.clock.as_ref(),
            poll_interval: self.config.receipt_poll_interval(),
            network: &self.config.network,
        };
        let receipt = submitter.submit(kind, &handle, &args, value, observer).await?;

        let campaign = (contract == ContractKind::Campaign).then_some(target);
        let list = if kind.refreshes_list() {
            Some(self.load_campaigns().await)
        } else {
            if let Some(campaign) = campaign {
                self.refresh_summary(campaign).await;
            }
            None
        };
        let detail = match campaign {
            Some(campaign) if kind.refreshes_detail() => Some(self.view_campaign(campaign).await),
            _ => None,
        };

        Ok(ActionOutcome {
            kind,
            receipt,
            message: kind.success_message().to_owned(),
            list,
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionPhase, Quiet};
    use crate::testkit::{FixedClock, NOW, StubChain, abis, descriptor, eth};
    use crate::view::BalanceField;
    use tl_chain_client::AbiError;
    use tl_types::{ChainId, MilestoneAction, MilestoneStatus, SECONDS_PER_DAY};

    fn dapp(chain: &Rc<StubChain>, with_wallet: bool) -> Rc<Dapp> {
        dapp_with(chain, with_wallet, abis())
    }

    fn dapp_with(chain: &Rc<StubChain>, with_wallet: bool, abis: AbiSet) -> Rc<Dapp> {
        let config = DappConfig {
            receipt_poll_ms: 0,
            ..DappConfig::default()
        };
        let wallet = with_wallet.then(|| WalletHandle::new(chain.clone()));
        Rc::new(Dapp::new(config, abis, chain.clone(), wallet, Rc::new(FixedClock)).unwrap())
    }

    #[derive(Default)]
    struct Phases(RefCell<Vec<ActionPhase>>);

    impl ActionObserver for Phases {
        fn on_phase(&self, _kind: ActionKind, phase: &ActionPhase) {
            self.0.borrow_mut().push(phase.clone());
        }
    }

    fn loaded(page: Option<DetailPage>) -> CampaignDetailView {
        match page {
            Some(DetailPage::Loaded { view }) => view,
            other => panic!("expected a loaded detail page, got {other:?}"),
        }
    }

    fn rows(view: &CampaignDetailView) -> &[MilestoneRow] {
        match &view.milestones {
            MilestonesSection::Rows { rows } => rows,
            other => panic!("expected milestone rows, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn writes_without_a_wallet_make_no_network_calls() {
        let chain = Rc::new(StubChain::new());
        let campaign = address_hex(&chain.add_campaign(chain.accounts[1], "Solar", eth(10)));

        for with_wallet in [false, true] {
            let dapp = dapp(&chain, with_wallet);
            let err = dapp
                .create_milestone(&campaign, "Prototype", "1", &Quiet)
                .await
                .unwrap_err();
            assert_eq!(err, DappError::validation("Connect wallet first"));
        }
        assert!(chain.requests().is_empty());
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_wallet() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        let campaign = address_hex(&chain.add_campaign(chain.accounts[1], "Solar", eth(10)));
        let dapp = dapp(&chain, true);
        dapp.connect().await?;
        chain.clear_requests();

        assert!(matches!(
            dapp.contribute(&campaign, "", &Quiet).await,
            Err(DappError::Validation(_))
        ));
        assert!(matches!(
            dapp.contribute(&campaign, "abc", &Quiet).await,
            Err(DappError::Validation(_))
        ));
        assert!(matches!(
            dapp.create_milestone(&campaign, "  ", "1", &Quiet).await,
            Err(DappError::Validation(_))
        ));
        assert!(matches!(
            dapp.contribute("0x1234", "1", &Quiet).await,
            Err(DappError::Validation(_))
        ));
        assert!(chain.requests().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn vote_refetch_reflects_approval() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        let creator = chain.accounts[1];
        let campaign = chain.add_campaign(creator, "Solar", eth(10));
        chain.fund(campaign, chain.accounts[0], eth(3));
        chain.fund(campaign, chain.accounts[2], eth(1));
        chain.add_milestone(campaign, "Prototype", eth(1));

        let dapp = dapp(&chain, true);
        dapp.connect().await?;
        let before = loaded(Some(dapp.view_campaign(campaign).await));
        assert_eq!(rows(&before)[0].status, MilestoneStatus::Voting);
        assert_eq!(rows(&before)[0].action, MilestoneAction::Vote);

        let phases = Phases::default();
        let outcome = dapp.vote(&address_hex(&campaign), 0, &phases).await?;
        assert_eq!(outcome.message, "Voted successfully!");
        assert!(outcome.list.is_none());

        let after = loaded(outcome.detail);
        let row = &rows(&after)[0];
        assert_eq!(row.status, MilestoneStatus::Approved);
        assert_eq!(row.action, MilestoneAction::None);
        assert_eq!(row.approved_weight_eth, "3.0");
        assert_eq!(row.approval_percent, 75.0);

        let phases = phases.0.borrow();
        assert_eq!(phases.len(), 3);
        assert_eq!(phases[0], ActionPhase::Signing);
        assert!(matches!(phases[1], ActionPhase::Submitted(_)));
        assert!(matches!(&phases[2], ActionPhase::Confirmed(receipt) if receipt.success));

        let requests = chain.requests();
        let sent = requests
            .iter()
            .position(|entry| entry == "eth_sendTransaction:vote")
            .unwrap();
        assert!(requests[sent..].iter().any(|entry| entry == "eth_getTransactionReceipt"));
        assert!(requests[sent..].iter().any(|entry| entry == "eth_call:milestones"));
        Ok(())
    }

    #[tokio::test]
    async fn vote_keeps_the_cache_in_factory_order() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        let creator = chain.accounts[1];
        let first = chain.add_campaign(creator, "Solar", eth(10));
        let second = chain.add_campaign(creator, "Wind", eth(10));
        chain.fund(first, chain.accounts[0], eth(2));
        chain.add_milestone(first, "Prototype", eth(1));

        let dapp = dapp(&chain, true);
        dapp.connect().await?;
        dapp.load_campaigns().await;
        dapp.vote(&address_hex(&first), 0, &Quiet).await?;

        let order: Vec<_> = dapp.cached_campaigns().iter().map(|s| s.address).collect();
        assert_eq!(order, vec![first, second]);
        Ok(())
    }

    #[tokio::test]
    async fn approved_milestone_offers_withdraw_only_to_the_creator() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        let creator = chain.accounts[1];
        let campaign = chain.add_campaign(creator, "Solar", eth(10));
        chain.fund(campaign, chain.accounts[0], eth(4));
        chain.add_milestone(campaign, "Prototype", eth(1));
        chain.approve(campaign, 0, chain.accounts[0]);

        let dapp = dapp(&chain, true);
        let resets = Rc::new(Cell::new(0));
        let counter = resets.clone();
        dapp.watch_wallet(move |_| counter.set(counter.get() + 1));

        dapp.connect().await?;
        let backer_view = loaded(Some(dapp.view_campaign(campaign).await));
        assert!(!backer_view.viewer_is_creator);
        assert_eq!(rows(&backer_view)[0].status, MilestoneStatus::Approved);
        assert_eq!(rows(&backer_view)[0].action, MilestoneAction::None);

        chain.active_account.set(1);
        chain.emit(WalletEvent::AccountsChanged(vec![creator]));
        assert_eq!(resets.get(), 1);
        assert_eq!(dapp.session(), Session::default());

        dapp.connect().await?;
        let creator_view = loaded(Some(dapp.view_campaign(campaign).await));
        assert!(creator_view.viewer_is_creator);
        assert_eq!(rows(&creator_view)[0].status, MilestoneStatus::Approved);
        assert_eq!(rows(&creator_view)[0].action, MilestoneAction::Withdraw);
        Ok(())
    }

    #[tokio::test]
    async fn withdraw_releases_and_refreshes_detail() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        let creator = chain.accounts[0];
        let campaign = chain.add_campaign(creator, "Solar", eth(10));
        chain.fund(campaign, chain.accounts[1], eth(4));
        chain.add_milestone(campaign, "Prototype", eth(1));
        chain.approve(campaign, 0, chain.accounts[1]);

        let dapp = dapp(&chain, true);
        dapp.connect().await?;
        dapp.load_campaigns().await;

        let outcome = dapp.withdraw(&address_hex(&campaign), 0, &Quiet).await?;
        let view = loaded(outcome.detail);
        assert_eq!(rows(&view)[0].status, MilestoneStatus::Released);
        assert_eq!(rows(&view)[0].action, MilestoneAction::None);
        assert_eq!(view.balance_eth, "3.0");
        Ok(())
    }

    #[tokio::test]
    async fn contribute_refreshes_list_and_detail() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        let campaign = chain.add_campaign(chain.accounts[1], "Solar", eth(10));
        let dapp = dapp(&chain, true);
        dapp.connect().await?;
        dapp.load_campaigns().await;

        let outcome = dapp.contribute(&address_hex(&campaign), "2.5", &Quiet).await?;
        match outcome.list {
            Some(CampaignListView::Loaded { cards, .. }) => {
                assert_eq!(cards[0].raised_eth, "2.5");
                assert_eq!(cards[0].progress_percent, 25.0);
            }
            other => panic!("expected a refreshed list, got {other:?}"),
        }
        let view = loaded(outcome.detail);
        assert_eq!(view.raised_eth, "2.5");
        assert_eq!(dapp.cached_campaigns()[0].raised, eth(5) / 2);

        assert_eq!(dapp.backer_count(campaign).await, BackerCount::Known(1));
        Ok(())
    }

    #[tokio::test]
    async fn created_campaign_shows_up_in_the_list() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        let dapp = dapp(&chain, true);
        dapp.connect().await?;

        let form = CampaignForm {
            title: "Community garden".to_owned(),
            description: "Raised beds".to_owned(),
            goal_eth: "12".to_owned(),
            duration_days: "10".to_owned(),
        };
        let outcome = dapp.create_campaign(&form, &Quiet).await?;
        assert!(outcome.detail.is_none());
        match outcome.list {
            Some(CampaignListView::Loaded { cards, skipped }) => {
                assert_eq!(cards.len(), 1);
                assert_eq!(cards[0].title, "Community garden");
                assert_eq!(cards[0].goal_eth, "12.0");
                assert!(skipped.is_empty());
            }
            other => panic!("expected a refreshed list, got {other:?}"),
        }

        let created = dapp.cached_campaigns()[0].clone();
        assert_eq!(created.creator, chain.accounts[0]);
        assert_eq!(created.deadline, NOW + 10 * SECONDS_PER_DAY);
        Ok(())
    }

    #[tokio::test]
    async fn revert_reason_is_surfaced_and_nothing_refetched() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        let campaign = chain.add_campaign(chain.accounts[1], "Solar", eth(10));
        chain.add_milestone(campaign, "Prototype", eth(1));
        let dapp = dapp(&chain, true);
        dapp.connect().await?;
        chain.clear_requests();

        let phases = Phases::default();
        let err = dapp
            .vote(&address_hex(&campaign), 0, &phases)
            .await
            .unwrap_err();
        assert_eq!(err, DappError::Transaction("Only contributors can vote".to_owned()));
        assert_eq!(*phases.0.borrow(), vec![ActionPhase::Signing]);
        assert_eq!(chain.requests(), vec!["eth_sendTransaction:vote".to_owned()]);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_network_session_is_read_only() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        let campaign = address_hex(&chain.add_campaign(chain.accounts[1], "Solar", eth(10)));
        chain.chain_id.set(1);
        chain.reject_switch.set(true);

        let dapp = dapp(&chain, true);
        let err = dapp.connect().await.unwrap_err();
        assert!(matches!(err, DappError::WrongNetwork { actual: Some(ChainId(1)), .. }));

        let session = dapp.session();
        assert!(session.connected);
        assert!(!session.is_writable_on(ChainId(31337)));

        chain.clear_requests();
        let err = dapp.contribute(&campaign, "1", &Quiet).await.unwrap_err();
        assert!(matches!(err, DappError::WrongNetwork { .. }));
        assert!(chain.requests().is_empty());

        match dapp.dashboard().await {
            DashboardView::Connected { network_label, .. } => {
                assert_eq!(network_label, "Wrong Network!")
            }
            other => panic!("expected a connected dashboard, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn wallet_events_reset_everything() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        chain.add_campaign(chain.accounts[0], "Solar", eth(10));
        let dapp = dapp(&chain, true);
        let resets = Rc::new(Cell::new(0));
        let counter = resets.clone();
        dapp.watch_wallet(move |_| counter.set(counter.get() + 1));
        dapp.watch_wallet(|_| panic!("second subscription"));

        dapp.connect().await?;
        dapp.load_campaigns().await;
        assert_eq!(dapp.cached_campaigns().len(), 1);

        chain.emit(WalletEvent::ChainChanged(ChainId(1)));
        assert_eq!(resets.get(), 1);
        assert_eq!(dapp.session(), Session::default());
        assert!(dapp.cached_campaigns().is_empty());
        assert_eq!(dapp.page(), Page::Home);
        Ok(())
    }

    #[tokio::test]
    async fn detail_serves_from_cache_then_falls_back_to_direct_fetch() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        let listed = chain.add_campaign(chain.accounts[0], "Listed", eth(10));
        let dapp = dapp(&chain, false);
        dapp.load_campaigns().await;
        let late = chain.add_campaign(chain.accounts[0], "Late", eth(10));
        chain.clear_requests();

        let view = loaded(Some(dapp.view_campaign(listed).await));
        assert_eq!(view.title, "Listed");
        assert_eq!(view.days_left, Some(30));
        assert_eq!(view.backers, BackerCount::Pending);
        assert_eq!(view.milestones, MilestonesSection::Empty);
        assert_eq!(chain.count("eth_call:getSummary"), 0);

        let view = loaded(Some(dapp.view_campaign(late).await));
        assert_eq!(view.title, "Late");
        assert_eq!(chain.count("eth_call:getSummary"), 1);
        assert_eq!(dapp.cached_campaigns().len(), 2);
        assert_eq!(dapp.page(), Page::Campaign(late));
        Ok(())
    }

    #[tokio::test]
    async fn detail_failures_render_in_place() {
        let chain = Rc::new(StubChain::new());
        let campaign = chain.add_campaign(chain.accounts[0], "Solar", eth(10));
        let dapp = dapp(&chain, false);

        let missing = Address::from_low_u64_be(0xdead);
        assert_eq!(
            dapp.view_campaign(missing).await,
            DetailPage::NotFound {
                address: address_hex(&missing)
            }
        );

        chain.broken_milestones.set(true);
        let view = loaded(Some(dapp.view_campaign(campaign).await));
        assert!(matches!(view.milestones, MilestonesSection::Failed { .. }));

        chain.break_campaign(campaign);
        assert_eq!(dapp.backer_count(campaign).await, BackerCount::Pending);
    }

    #[tokio::test]
    async fn missing_campaign_descriptor_disables_list_and_detail() {
        let chain = Rc::new(StubChain::new());
        let campaign = chain.add_campaign(chain.accounts[0], "Solar", eth(10));
        let abis = AbiSet::from_sources(|kind| match kind {
            ContractKind::Campaign => Err("404 Not Found".to_owned()),
            other => descriptor(other),
        });
        let dapp = dapp_with(&chain, false, abis);

        match dapp.view_campaign(campaign).await {
            DetailPage::Unavailable { message } => assert!(message.contains("campaign interface")),
            other => panic!("expected an unavailable page, got {other:?}"),
        }
        match dapp.load_campaigns().await {
            CampaignListView::Failed { message } => assert!(message.contains("campaign interface")),
            other => panic!("expected a failed list, got {other:?}"),
        }
        assert!(dapp.cached_campaigns().is_empty());
        assert!(dapp.bindings.bind(dapp.factory(), ContractKind::Factory, false).is_ok());
        assert!(matches!(
            dapp.bindings.bind(campaign, ContractKind::Campaign, false),
            Err(DappError::AbiUnavailable(AbiError::Unavailable { .. }))
        ));
    }

    #[tokio::test]
    async fn dashboard_lists_balances_and_own_campaigns() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        let me = chain.accounts[0];
        chain.add_campaign(me, "Mine", eth(10));
        chain.add_campaign(chain.accounts[1], "Theirs", eth(10));
        let dapp = dapp(&chain, true);

        assert_eq!(dapp.dashboard().await, DashboardView::Disconnected);

        dapp.connect().await?;
        match dapp.dashboard().await {
            DashboardView::Connected {
                account_short,
                network_label,
                eth_balance,
                token_balance,
                campaigns,
            } => {
                assert_eq!(account_short, short_address(&me));
                assert_eq!(network_label, "Localhost");
                assert_eq!(eth_balance, BalanceField::Value("100.5000 ETH".to_owned()));
                assert_eq!(token_balance, BalanceField::NotDeployed);
                assert_eq!(campaigns.len(), 1);
                assert_eq!(campaigns[0].title, "Mine");
            }
            other => panic!("expected a connected dashboard, got {other:?}"),
        }

        chain.set_token_balance(me, eth(5));
        match dapp.dashboard().await {
            DashboardView::Connected { token_balance, .. } => {
                assert_eq!(token_balance, BalanceField::Value("5.0 TSL".to_owned()))
            }
            other => panic!("expected a connected dashboard, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn absurd_token_decimals_only_fail_the_token_field() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        let me = chain.accounts[0];
        chain.set_token_balance(me, eth(5));
        chain.token_decimals.set(100);
        let dapp = dapp(&chain, true);
        dapp.connect().await?;

        match dapp.dashboard().await {
            DashboardView::Connected {
                eth_balance,
                token_balance,
                ..
            } => {
                assert_eq!(eth_balance, BalanceField::Value("100.5000 ETH".to_owned()));
                assert_eq!(token_balance, BalanceField::Error);
            }
            other => panic!("expected a connected dashboard, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn restore_picks_up_prior_authorization_silently() -> anyhow::Result<()> {
        let chain = Rc::new(StubChain::new());
        let dapp = dapp(&chain, true);
        assert_eq!(dapp.restore_session().await, None);
        assert_eq!(chain.count("eth_requestAccounts"), 0);

        dapp.connect().await?;
        dapp.reset();
        let restored = dapp.restore_session().await;
        assert_eq!(restored, Some(Session::connected(chain.accounts[0], ChainId(31337))));
        assert_eq!(chain.count("eth_requestAccounts"), 1);
        Ok(())
    }
}
