use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::cell::Cell;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tl_chain_client::{Clock, RpcError, RpcTransport, WalletEventHandler, WalletProvider};
use tracing::{debug, warn};

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// JSON-RPC over HTTP against a node.
///
/// Reads `TRUSTLAYER_RPC_URL` from environment at construction time
/// (default: `http://127.0.0.1:8545`).
pub struct HttpTransport {
    endpoint: String,
    http: reqwest::Client,
    next_id: Cell<u64>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HttpTransport {
    pub fn new(endpoint: Option<String>) -> Self {
        let endpoint = endpoint
            .or_else(|| std::env::var("TRUSTLAYER_RPC_URL").ok())
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            next_id: Cell::new(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

// ── JSON-RPC 2.0 envelope ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

fn read_body<E: fmt::Display>(
    method: &str,
    status: u16,
    body: Result<String, E>,
) -> Result<String, RpcError> {
    body.map_err(|err| RpcError::internal(format!("{method} transport: HTTP {status} body unreadable: {err}")))
}

fn parse_response(method: &str, status: u16, text: &str) -> Result<Value, RpcError> {
    let parsed: JsonRpcResponse = serde_json::from_str(text)
        .map_err(|_| RpcError::internal(format!("{method} HTTP {status}: {text}")))?;

    if let Some(error) = parsed.error {
        return Err(error);
    }
    Ok(parsed.result.unwrap_or(Value::Null))
}

#[async_trait(?Send)]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        debug!("rpc #{} {}", id, method);
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| RpcError::internal(format!("{method} transport: {err}")))?;

        let status = response.status().as_u16();
        let text = read_body(method, status, response.text().await)?;
        parse_response(method, status, &text)
    }
}

/// Wallet backed by the node's own unlocked accounts (local test networks).
///
/// Account selection replaces the wallet prompt; network switching is not
/// something a node can do, so those requests fail as unsupported.
pub struct NodeWallet<T = HttpTransport> {
    inner: T,
    account_index: usize,
}

impl<T: RpcTransport> NodeWallet<T> {
    pub fn new(inner: T, account_index: usize) -> Self {
        Self {
            inner,
            account_index,
        }
    }

    async fn selected_account(&self) -> Result<Value, RpcError> {
        let accounts = self.inner.request("eth_accounts", json!([])).await?;
        let account = accounts
            .as_array()
            .and_then(|list| list.get(self.account_index))
            .cloned()
            .ok_or_else(|| {
                RpcError::new(
                    RpcError::USER_REJECTED,
                    format!("node has no account at index {}", self.account_index),
                )
            })?;
        Ok(json!([account]))
    }
}

#[async_trait(?Send)]
impl<T: RpcTransport> RpcTransport for NodeWallet<T> {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "eth_requestAccounts" | "eth_accounts" => self.selected_account().await,
            "wallet_switchEthereumChain" | "wallet_addEthereumChain" => Err(RpcError::new(
                RpcError::UNSUPPORTED_METHOD,
                format!("{method} is not supported by node-managed accounts"),
            )),
            _ => self.inner.request(method, params).await,
        }
    }
}

impl<T: RpcTransport> WalletProvider for NodeWallet<T> {
    fn subscribe(&self, _handler: WalletEventHandler) {
        warn!("node-managed accounts never emit account or chain changes");
    }
}

/// Wall clock plus tokio timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait(?Send)]
impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
