//! Event binding.
//!
//! Rendered markup carries `data-action` / `data-campaign` / `data-milestone`
//! attributes; a single delegated listener on the document routes clicks.
//! Async handlers run via `wasm_bindgen_futures::spawn_local`.

use tl_types::parse_address;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Element;

use crate::actions;
use crate::dom::{self, Elements};
use crate::pages::{self, View};

fn listen<F>(target: &web_sys::EventTarget, event: &str, handler: F)
where
    F: FnMut(web_sys::Event) + 'static,
{
    let cb = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
    if let Err(err) = target.add_event_listener_with_callback(event, cb.as_ref().unchecked_ref()) {
        gloo_console::error!("add_event_listener failed", err);
    }
    cb.forget();
}

/// Bind all UI event listeners. Call once after init.
pub fn bind_events(els: &Elements) {
    // ── Navigation ──
    for link in &els.nav_links {
        let els2 = els.clone();
        let target = link.get_attribute("data-target").unwrap_or_default();
        listen(link, "click", move |event: web_sys::Event| {
            event.prevent_default();
            let Some(view) = View::from_target(&target) else {
                return;
            };
            let els3 = els2.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match view {
                    View::Home => {
                        pages::show_view(&els3, View::Home);
                        pages::load_home(&els3).await;
                    }
                    View::Dashboard => pages::open_dashboard(&els3).await,
                    View::Project => pages::show_view(&els3, View::Project),
                }
            });
        });
    }

    // ── Wallet ──
    {
        let els2 = els.clone();
        listen(&els.connect_btn, "click", move |_: web_sys::Event| {
            let els3 = els2.clone();
            wasm_bindgen_futures::spawn_local(async move {
                actions::on_connect(&els3).await;
            });
        });
    }

    // ── Delegated actions ──
    {
        let els2 = els.clone();
        listen(&dom::document(), "click", move |event: web_sys::Event| {
            let Some(button) = event
                .target()
                .and_then(|target| target.dyn_into::<Element>().ok())
                .and_then(|el| el.closest("[data-action]").ok().flatten())
            else {
                return;
            };
            dispatch(&els2, button);
        });
    }
}

fn dispatch(els: &Elements, button: Element) {
    let action = button.get_attribute("data-action").unwrap_or_default();
    let campaign = button.get_attribute("data-campaign").unwrap_or_default();
    let milestone = button
        .get_attribute("data-milestone")
        .and_then(|raw| raw.parse::<u64>().ok());
    let els = els.clone();

    match (action.as_str(), milestone) {
        ("view", _) => {
            let Ok(address) = parse_address(&campaign) else {
                gloo_console::warn!(format!("bad campaign address {campaign}"));
                return;
            };
            wasm_bindgen_futures::spawn_local(async move {
                pages::open_campaign(&els, address).await;
            });
        }
        ("contribute", _) => wasm_bindgen_futures::spawn_local(async move {
            actions::on_contribute(&els, button, campaign).await;
        }),
        ("vote", Some(index)) => wasm_bindgen_futures::spawn_local(async move {
            actions::on_vote(&els, button, campaign, index).await;
        }),
        ("withdraw", Some(index)) => wasm_bindgen_futures::spawn_local(async move {
            actions::on_withdraw(&els, button, campaign, index).await;
        }),
        ("create-milestone", _) => wasm_bindgen_futures::spawn_local(async move {
            actions::on_create_milestone(&els, button, campaign).await;
        }),
        ("show-create", _) => pages::show_create_modal(&els, true),
        ("hide-create", _) => pages::show_create_modal(&els, false),
        ("create-campaign", _) => wasm_bindgen_futures::spawn_local(async move {
            actions::on_create_campaign(&els, button).await;
        }),
        (other, _) => gloo_console::warn!(format!("unhandled action {other}")),
    }
}
