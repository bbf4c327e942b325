//! The injected EIP-1193 wallet (`window.ethereum`).

use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use serde::Serialize;
use serde_json::{Value, json};
use std::rc::Rc;
use tl_chain_client::{RpcError, RpcTransport, WalletEvent, WalletEventHandler, WalletProvider};
use tl_types::{ChainId, parse_address};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::dom;

pub struct InjectedWallet {
    ethereum: JsValue,
}

impl InjectedWallet {
    /// `None` when no wallet extension injected a provider.
    pub fn detect() -> Option<Self> {
        let ethereum = Reflect::get(&dom::window(), &JsValue::from_str("ethereum")).ok()?;
        if ethereum.is_undefined() || ethereum.is_null() {
            return None;
        }
        Some(Self { ethereum })
    }

    fn method(&self, name: &str) -> Result<Function, RpcError> {
        Reflect::get(&self.ethereum, &JsValue::from_str(name))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok())
            .ok_or_else(|| RpcError::internal(format!("ethereum.{name} is not a function")))
    }

    fn listen(&self, event: &str, callback: &Closure<dyn FnMut(JsValue)>) {
        let result = self.method("on").and_then(|on| {
            on.call2(
                &self.ethereum,
                &JsValue::from_str(event),
                callback.as_ref().unchecked_ref(),
            )
            .map_err(|err| to_rpc_error(&err))
        });
        if let Err(err) = result {
            gloo_console::error!(format!("cannot listen for {event}: {err}"));
        }
    }
}

fn to_js(value: &Value) -> Result<JsValue, RpcError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| RpcError::internal(err.to_string()))
}

/// Wallet errors arrive as `{ code, message, data }` objects, sometimes as
/// plain `Error`s without a code.
fn to_rpc_error(err: &JsValue) -> RpcError {
    let field = |name: &str| Reflect::get(err, &JsValue::from_str(name)).ok();
    let code = field("code")
        .and_then(|code| code.as_f64())
        .map(|code| code as i64)
        .unwrap_or(RpcError::INTERNAL);
    let message = field("message")
        .and_then(|message| message.as_string())
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    let data = field("data")
        .filter(|data| !data.is_undefined())
        .and_then(|data| serde_wasm_bindgen::from_value(data).ok());
    RpcError {
        code,
        message,
        data,
    }
}

#[async_trait(?Send)]
impl RpcTransport for InjectedWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let args = to_js(&json!({ "method": method, "params": params }))?;
        let promise = self
            .method("request")?
            .call1(&self.ethereum, &args)
            .map_err(|err| to_rpc_error(&err))?;
        let promise: Promise = promise
            .dyn_into()
            .map_err(|_| RpcError::internal("ethereum.request did not return a promise"))?;

        let result = JsFuture::from(promise)
            .await
            .map_err(|err| to_rpc_error(&err))?;
        if result.is_undefined() {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(result).map_err(|err| RpcError::internal(err.to_string()))
    }
}

impl WalletProvider for InjectedWallet {
    fn subscribe(&self, handler: WalletEventHandler) {
        let handler: Rc<dyn Fn(WalletEvent)> = Rc::from(handler);

        let on_accounts = handler.clone();
        let accounts = Closure::wrap(Box::new(move |value: JsValue| {
            let accounts = js_sys::Array::from(&value)
                .iter()
                .filter_map(|entry| entry.as_string())
                .filter_map(|text| parse_address(&text).ok())
                .collect();
            on_accounts(WalletEvent::AccountsChanged(accounts));
        }) as Box<dyn FnMut(JsValue)>);
        self.listen("accountsChanged", &accounts);
        accounts.forget();

        let chain = Closure::wrap(Box::new(move |value: JsValue| {
            match value.as_string().as_deref().and_then(ChainId::from_hex) {
                Some(chain_id) => handler(WalletEvent::ChainChanged(chain_id)),
                None => gloo_console::warn!(format!("unparseable chainChanged payload {value:?}")),
            }
        }) as Box<dyn FnMut(JsValue)>);
        self.listen("chainChanged", &chain);
        chain.forget();
    }
}
