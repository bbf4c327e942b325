//! Page switching and rendering of the controller's view-models.

use tl_dapp_core::view::{self, backers_placeholder_id};
use tl_dapp_core::{BackerCount, CampaignListView, Dapp, DetailPage};
use tl_types::{Address, address_hex, short_address};
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

use crate::dom::{self, Elements};
use crate::state;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Project,
    Dashboard,
}

impl View {
    pub fn from_target(target: &str) -> Option<Self> {
        match target {
            "home" => Some(View::Home),
            "project" => Some(View::Project),
            "dashboard" => Some(View::Dashboard),
            _ => None,
        }
    }

    fn target(self) -> &'static str {
        match self {
            View::Home => "home",
            View::Project => "project",
            View::Dashboard => "dashboard",
        }
    }
}

pub fn show_view(els: &Elements, view: View) {
    dom::toggle_class(&els.view_home, "active", view == View::Home);
    dom::toggle_class(&els.view_project, "active", view == View::Project);
    dom::toggle_class(&els.view_dashboard, "active", view == View::Dashboard);

    for link in &els.nav_links {
        let target = link.get_attribute("data-target").unwrap_or_default();
        // "Campaigns" also points home; only the Home link lights up
        let campaigns_alias = view == View::Home && link.text_content().unwrap_or_default().trim() == "Campaigns";
        dom::toggle_class(link, "active", target == view.target() && !campaigns_alias);
    }
}

/// Connect button and dashboard link reflect the session.
pub fn render_session(els: &Elements, dapp: &Dapp) {
    let session = dapp.session();
    let Some(account) = session.address.filter(|_| session.connected) else {
        return;
    };
    dom::set_text(&els.connect_btn, &short_address(&account));
    dom::add_class(&els.connect_btn, "btn-outline");
    dom::remove_class(&els.connect_btn, "btn-primary");
    if let Some(link) = &els.dashboard_link {
        dom::set_display(link, "inline-block");
    }
}

pub fn render_list(els: &Elements, list: &CampaignListView) {
    dom::set_inner_html(&els.campaigns_grid, &view::render_campaign_list(list));
}

pub async fn load_home(els: &Elements) {
    let Some(dapp) = state::dapp() else { return };
    dom::set_inner_html(&els.campaigns_grid, "<p>Loading campaigns...</p>");
    let list = dapp.load_campaigns().await;
    render_list(els, &list);
}

/// Shows a rendered detail page, then patches the backer count in when the
/// log scan finishes.
pub fn render_detail(els: &Elements, page: &DetailPage) {
    show_view(els, View::Project);
    dom::set_inner_html(&els.project_container, &view::render_detail(page));

    let DetailPage::Loaded { view } = page else {
        return;
    };
    let address = view.address.clone();
    let Ok(campaign) = tl_types::parse_address(&address) else {
        return;
    };
    wasm_bindgen_futures::spawn_local(async move {
        let Some(dapp) = state::dapp() else { return };
        if let BackerCount::Known(count) = dapp.backer_count(campaign).await {
            if let Some(el) = dom::by_id(&backers_placeholder_id(&address)) {
                dom::set_text(&el, &count.to_string());
            }
        }
    });
}

pub async fn open_campaign(els: &Elements, campaign: Address) {
    let Some(dapp) = state::dapp() else { return };
    show_view(els, View::Project);
    dom::set_inner_html(&els.project_container, "<p>Loading details...</p>");
    let page = dapp.view_campaign(campaign).await;
    render_detail(els, &page);
    gloo_console::debug!(format!("rendered {}", address_hex(&campaign)));
}

pub async fn open_dashboard(els: &Elements) {
    let Some(dapp) = state::dapp() else { return };
    show_view(els, View::Dashboard);
    let dashboard = dapp.dashboard().await;
    dom::set_inner_html(&els.dashboard_content, &view::render_dashboard(&dashboard));
}

pub fn show_create_modal(els: &Elements, visible: bool) {
    dom::set_display(&els.create_modal, if visible { "flex" } else { "none" });
}

/// Disables a button while its transaction is in flight.
pub struct BusyButton {
    button: Option<HtmlElement>,
    label: String,
}

impl BusyButton {
    pub fn start(button: Option<HtmlElement>) -> Self {
        let label = button
            .as_ref()
            .and_then(|button| button.text_content())
            .unwrap_or_default();
        if let Some(button) = &button {
            dom::set_text(button, "Processing...");
            let _ = button.set_attribute("disabled", "");
        }
        Self { button, label }
    }

    pub fn from_element(element: &web_sys::Element) -> Self {
        Self::start(element.clone().dyn_into::<HtmlElement>().ok())
    }
}

impl Drop for BusyButton {
    fn drop(&mut self) {
        if let Some(button) = &self.button {
            dom::set_text(button, &self.label);
            let _ = button.remove_attribute("disabled");
        }
    }
}
