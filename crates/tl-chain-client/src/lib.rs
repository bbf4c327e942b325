//! Seams between the dApp controller and the outside world.
//!
//! Everything here runs on a single cooperative event loop (a browser tab or a
//! current-thread runtime), so the async traits are `?Send`.

pub mod abi;
pub mod contract;

pub use abi::{AbiError, AbiSet, ContractKind};
pub use contract::{CallError, ContractHandle, TxReceipt, wait_for_receipt};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tl_types::{Address, ChainId};

/// Error object of a JSON-RPC or EIP-1193 request.
#[derive(Debug, Clone, PartialEq, Error, Deserialize)]
#[error("{message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RpcError {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    pub const INTERNAL: i64 = -32603;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL, message)
    }

    pub fn is_user_rejection(&self) -> bool {
        if self.code == Self::USER_REJECTED {
            return true;
        }
        let lower = self.message.to_lowercase();
        lower.contains("rejected") || lower.contains("denied")
    }

    /// Message plus the nested node message when the provider wraps one.
    pub fn detail(&self) -> String {
        let nested = self.data.as_ref().and_then(|data| match data {
            Value::String(text) => Some(text.clone()),
            Value::Object(map) => map.get("message").and_then(Value::as_str).map(str::to_owned),
            _ => None,
        });

        match nested {
            Some(inner) if !inner.is_empty() && inner != self.message => {
                format!("{}: {}", self.message, inner)
            }
            _ => self.message.clone(),
        }
    }
}

/// EIP-1193 style `request({ method, params })`.
#[async_trait(?Send)]
pub trait RpcTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
}

pub type WalletEventHandler = Box<dyn Fn(WalletEvent)>;

/// A wallet is a transport that can also prompt the user and notify changes.
pub trait WalletProvider: RpcTransport {
    fn subscribe(&self, handler: WalletEventHandler);
}

#[async_trait(?Send)]
pub trait Clock {
    fn now_unix(&self) -> u64;
    async fn sleep(&self, duration: Duration);
}

/// One wallet seen through both of its faces.
#[derive(Clone)]
pub struct WalletHandle {
    provider: Rc<dyn WalletProvider>,
    transport: Rc<dyn RpcTransport>,
}

impl WalletHandle {
    pub fn new<W>(wallet: Rc<W>) -> Self
    where
        W: WalletProvider + 'static,
    {
        Self {
            provider: wallet.clone(),
            transport: wallet,
        }
    }

    pub fn provider(&self) -> &dyn WalletProvider {
        self.provider.as_ref()
    }

    pub fn transport(&self) -> Rc<dyn RpcTransport> {
        self.transport.clone()
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.transport.request(method, params).await
    }
}
