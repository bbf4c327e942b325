//! Click handlers for the five write actions plus wallet connect.

use tl_dapp_core::{
    ActionKind, ActionObserver, ActionOutcome, ActionPhase, CampaignForm, DappError,
};
use tl_dapp_core::view::milestone_field_ids;
use web_sys::Element;

use crate::dom::{self, Elements};
use crate::pages::{self, BusyButton};
use crate::state;

/// Logs progress to the console.
struct ConsoleProgress;

impl ActionObserver for ConsoleProgress {
    fn on_phase(&self, kind: ActionKind, phase: &ActionPhase) {
        match phase {
            ActionPhase::Signing => gloo_console::log!(format!("{kind:?}: confirm in your wallet")),
            ActionPhase::Submitted(hash) => {
                gloo_console::log!(format!("{kind:?}: transaction sent {hash:#x}"))
            }
            ActionPhase::Confirmed(receipt) => {
                gloo_console::log!(format!("{kind:?}: confirmed in block {:?}", receipt.block_number))
            }
        }
    }
}

fn finish(els: &Elements, result: Result<ActionOutcome, DappError>) -> bool {
    match result {
        Ok(outcome) => {
            dom::alert(&outcome.message);
            if let Some(list) = &outcome.list {
                pages::render_list(els, list);
            }
            if let Some(detail) = &outcome.detail {
                pages::render_detail(els, detail);
            }
            true
        }
        Err(err) => {
            gloo_console::error!(format!("{err:?}"));
            dom::alert(&format!("Error: {err}"));
            false
        }
    }
}

pub async fn on_connect(els: &Elements) {
    let Some(dapp) = state::dapp() else { return };
    match dapp.connect().await {
        Ok(_) => {
            pages::render_session(els, &dapp);
            pages::load_home(els).await;
        }
        Err(DappError::NoWallet) => dom::alert("Please install MetaMask!"),
        Err(err @ DappError::WrongNetwork { .. }) => {
            pages::render_session(els, &dapp);
            dom::alert(&err.to_string());
        }
        Err(err) => dom::alert(&format!("Connection failed: {err}")),
    }
}

pub async fn on_contribute(els: &Elements, button: Element, campaign: String) {
    let Some(dapp) = state::dapp() else { return };
    let amount_id = format!("contribute-amount-{campaign}");
    let amount = dom::field_value(&amount_id);
    let _busy = BusyButton::from_element(&button);
    if finish(els, dapp.contribute(&campaign, &amount, &ConsoleProgress).await) {
        dom::clear_field(&amount_id);
    }
}

pub async fn on_vote(els: &Elements, button: Element, campaign: String, milestone: u64) {
    let Some(dapp) = state::dapp() else { return };
    let _busy = BusyButton::from_element(&button);
    finish(els, dapp.vote(&campaign, milestone, &ConsoleProgress).await);
}

pub async fn on_withdraw(els: &Elements, button: Element, campaign: String, milestone: u64) {
    let Some(dapp) = state::dapp() else { return };
    let _busy = BusyButton::from_element(&button);
    finish(els, dapp.withdraw(&campaign, milestone, &ConsoleProgress).await);
}

pub async fn on_create_milestone(els: &Elements, button: Element, campaign: String) {
    let Some(dapp) = state::dapp() else { return };
    let scope = button.get_attribute("data-scope").unwrap_or_default();
    let (description_id, amount_id) = milestone_field_ids(&scope, &campaign);
    let description = dom::field_value(&description_id);
    let amount = dom::field_value(&amount_id);

    let _busy = BusyButton::from_element(&button);
    let result = dapp
        .create_milestone(&campaign, &description, &amount, &ConsoleProgress)
        .await;
    if finish(els, result) {
        dom::clear_field(&description_id);
        dom::clear_field(&amount_id);
    }
}

pub async fn on_create_campaign(els: &Elements, button: Element) {
    let Some(dapp) = state::dapp() else { return };
    let form = CampaignForm {
        title: dom::field_value(dom::NEW_TITLE),
        description: dom::field_value(dom::NEW_DESCRIPTION),
        goal_eth: dom::field_value(dom::NEW_GOAL),
        duration_days: dom::field_value(dom::NEW_DURATION),
    };

    let _busy = BusyButton::from_element(&button);
    if finish(els, dapp.create_campaign(&form, &ConsoleProgress).await) {
        pages::show_create_modal(els, false);
        for id in [dom::NEW_TITLE, dom::NEW_DESCRIPTION, dom::NEW_GOAL, dom::NEW_DURATION] {
            dom::clear_field(id);
        }
    }
}
