//! Read connection to the node over `fetch`, descriptor download and the
//! browser clock.

use async_trait::async_trait;
use gloo_net::http::Request;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::Cell;
use std::collections::HashMap;
use std::time::Duration;
use tl_chain_client::{AbiSet, Clock, ContractKind, RpcError, RpcTransport};
use tl_dapp_core::DappConfig;

pub struct FetchTransport {
    endpoint: String,
    next_id: Cell<u64>,
}

impl FetchTransport {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            next_id: Cell::new(1),
        }
    }
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[async_trait(?Send)]
impl RpcTransport for FetchTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let transport = |err: gloo_net::Error| RpcError::internal(format!("{method} transport: {err}"));
        let response = Request::post(&self.endpoint)
            .json(&body)
            .map_err(transport)?
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        let parsed: JsonRpcResponse = serde_json::from_str(&text)
            .map_err(|_| RpcError::internal(format!("{method} HTTP {status}: {text}")))?;
        if let Some(error) = parsed.error {
            return Err(error);
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }
}

/// Optional `config.json` next to the page; defaults when absent.
pub async fn load_config() -> DappConfig {
    let fetched = match Request::get("config.json").send().await {
        Ok(response) if response.ok() => response.text().await.ok(),
        _ => None,
    };
    match fetched.map(|text| DappConfig::from_json(&text)) {
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            gloo_console::warn!(format!("ignoring config.json: {err}"));
            DappConfig::default()
        }
        None => DappConfig::default(),
    }
}

/// Downloads the three descriptors; each failure only disables its contract.
pub async fn load_abis(dir: &str) -> AbiSet {
    let mut fetched = HashMap::new();
    for kind in ContractKind::ALL {
        let url = format!("{}/{}", dir.trim_end_matches('/'), kind.descriptor_file());
        fetched.insert(kind, fetch_bytes(&url).await);
    }
    AbiSet::from_sources(|kind| {
        fetched
            .remove(&kind)
            .unwrap_or_else(|| Err(format!("{kind} descriptor was not requested")))
    })
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
    let response = Request::get(url)
        .send()
        .await
        .map_err(|err| format!("{url}: {err}"))?;
    if !response.ok() {
        return Err(format!("{url}: {} {}", response.status(), response.status_text()));
    }
    response.binary().await.map_err(|err| format!("{url}: {err}"))
}

pub struct BrowserClock;

#[async_trait(?Send)]
impl Clock for BrowserClock {
    fn now_unix(&self) -> u64 {
        (js_sys::Date::now() / 1000.0) as u64
    }

    async fn sleep(&self, duration: Duration) {
        let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        gloo_timers::future::TimeoutFuture::new(millis).await;
    }
}
