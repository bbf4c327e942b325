//! TrustLayer browser frontend.
//!
//! Hosts the `tl-dapp-core` controller in the page: the injected wallet signs,
//! a `fetch` connection to the node reads, and rendered view-models are
//! mounted into the static page shell.

pub mod actions;
pub mod dom;
pub mod events;
pub mod pages;
pub mod provider;
pub mod rpc;
pub mod state;

use std::rc::Rc;
use tl_chain_client::WalletHandle;
use tl_dapp_core::Dapp;
use wasm_bindgen::prelude::*;

/// WASM entry point, called when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    init().await
}

async fn init() -> Result<(), JsValue> {
    gloo_console::log!("TrustLayer initializing");
    let els = dom::Elements::bind()?;

    let config = rpc::load_config().await;
    let abis = rpc::load_abis(&config.abi_dir).await;
    let network = Rc::new(rpc::FetchTransport::new(&config.network.rpc_url));
    let wallet = provider::InjectedWallet::detect().map(|wallet| WalletHandle::new(Rc::new(wallet)));
    if wallet.is_none() {
        gloo_console::warn!("no injected wallet; read-only mode");
    }

    let dapp = Dapp::new(config, abis, network, wallet, Rc::new(rpc::BrowserClock))
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    let dapp = Rc::new(dapp);

    // any account or chain change starts over from a clean page
    dapp.watch_wallet(|event| {
        gloo_console::log!(format!("wallet changed: {event:?}"));
        dom::reload();
    });
    state::install(dapp.clone());
    events::bind_events(&els);

    if dapp.restore_session().await.is_some() {
        pages::render_session(&els, &dapp);
    }
    pages::load_home(&els).await;

    Ok(())
}
