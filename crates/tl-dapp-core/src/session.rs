//! Wallet Session Manager: account access and target network enforcement.

use serde_json::{Value, json};
use tl_chain_client::{RpcError, WalletEvent, WalletEventHandler, WalletHandle};
use tl_types::{Address, ChainId, Session, TargetNetwork, parse_address};
use tracing::{info, warn};

use crate::error::DappError;

pub struct SessionManager {
    wallet: Option<WalletHandle>,
    network: TargetNetwork,
}

impl SessionManager {
    pub fn new(wallet: Option<WalletHandle>, network: TargetNetwork) -> Self {
        Self { wallet, network }
    }

    pub fn wallet(&self) -> Option<&WalletHandle> {
        self.wallet.as_ref()
    }

    pub fn network(&self) -> &TargetNetwork {
        &self.network
    }

    /// Prompts for account access. The session may still be on the wrong chain.
    pub async fn request_access(&self) -> Result<Session, DappError> {
        let wallet = self.wallet.as_ref().ok_or(DappError::NoWallet)?;

        let accounts = wallet
            .request("eth_requestAccounts", json!([]))
            .await
            .map_err(|err| {
                if err.is_user_rejection() {
                    DappError::UserRejected
                } else {
                    DappError::read("wallet", err.into())
                }
            })?;
        let account = first_account(&accounts)?.ok_or(DappError::UserRejected)?;
        let chain_id = self.chain_id().await?;

        info!("connected {:#x} on chain {}", account, chain_id);
        Ok(Session::connected(account, chain_id))
    }

    /// Silent variant for page load: only succeeds if access was granted earlier.
    pub async fn restore(&self) -> Result<Option<Session>, DappError> {
        let Some(wallet) = self.wallet.as_ref() else {
            return Ok(None);
        };

        let accounts = wallet
            .request("eth_accounts", json!([]))
            .await
            .map_err(|err| DappError::read("wallet", err.into()))?;
        let Some(account) = first_account(&accounts)? else {
            return Ok(None);
        };
        let chain_id = self.chain_id().await?;
        Ok(Some(Session::connected(account, chain_id)))
    }

    /// Switches the wallet to the target network, registering it first if the
    /// wallet does not know it. One corrective attempt, then `WrongNetwork`.
    pub async fn ensure_network(&self, session: Session) -> Result<Session, DappError> {
        let target = self.network.chain_id;
        if session.is_on(target) {
            return Ok(session);
        }
        let wallet = self.wallet.as_ref().ok_or(DappError::NoWallet)?;
        let wrong = |actual| DappError::wrong_network(&self.network, actual);

        info!(
            "wallet is on chain {:?}, switching to {}",
            session.chain_id.map(|id| id.0),
            target
        );
        match self.switch(wallet).await {
            Ok(()) => {}
            Err(err) if err.code == RpcError::UNRECOGNIZED_CHAIN => {
                info!("{} unknown to the wallet, adding it", self.network.chain_name);
                self.add(wallet).await.map_err(|err| {
                    warn!("add network failed: {}", err.detail());
                    wrong(session.chain_id)
                })?;
                self.switch(wallet).await.map_err(|err| {
                    warn!("switch after add failed: {}", err.detail());
                    wrong(session.chain_id)
                })?;
            }
            Err(err) => {
                warn!("switch network failed: {}", err.detail());
                return Err(wrong(session.chain_id));
            }
        }

        let chain_id = self.chain_id().await?;
        if chain_id != target {
            return Err(wrong(Some(chain_id)));
        }
        Ok(Session {
            chain_id: Some(chain_id),
            ..session
        })
    }

    /// Installs the single account/chain change handler.
    pub fn subscribe(&self, handler: WalletEventHandler) {
        match self.wallet.as_ref() {
            Some(wallet) => wallet.provider().subscribe(handler),
            None => warn!("no wallet to watch for account or network changes"),
        }
    }

    async fn chain_id(&self) -> Result<ChainId, DappError> {
        let wallet = self.wallet.as_ref().ok_or(DappError::NoWallet)?;
        let raw = wallet
            .request("eth_chainId", json!([]))
            .await
            .map_err(|err| DappError::read("eth_chainId", err.into()))?;
        raw.as_str()
            .and_then(ChainId::from_hex)
            .ok_or_else(|| DappError::ContractCall {
                context: "eth_chainId".to_owned(),
                message: format!("unexpected chain id {raw}"),
            })
    }

    async fn switch(&self, wallet: &WalletHandle) -> Result<(), RpcError> {
        wallet
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": self.network.chain_id.to_hex() }]),
            )
            .await
            .map(|_| ())
    }

    async fn add(&self, wallet: &WalletHandle) -> Result<(), RpcError> {
        let network = &self.network;
        wallet
            .request(
                "wallet_addEthereumChain",
                json!([{
                    "chainId": network.chain_id.to_hex(),
                    "chainName": network.chain_name,
                    "rpcUrls": [network.rpc_url],
                    "nativeCurrency": {
                        "name": network.currency_name,
                        "symbol": network.currency_symbol,
                        "decimals": network.currency_decimals,
                    },
                }]),
            )
            .await
            .map(|_| ())
    }
}

fn first_account(accounts: &Value) -> Result<Option<Address>, DappError> {
    let Some(first) = accounts.as_array().and_then(|list| list.first()) else {
        return Ok(None);
    };
    let malformed = |message: String| DappError::ContractCall {
        context: "wallet accounts".to_owned(),
        message,
    };
    let text = first
        .as_str()
        .ok_or_else(|| malformed(format!("unexpected account {first}")))?;
    parse_address(text)
        .map(Some)
        .map_err(|err| malformed(err.to_string()))
}

pub(crate) fn describe(event: &WalletEvent) -> String {
    match event {
        WalletEvent::AccountsChanged(accounts) => match accounts.first() {
            Some(account) => format!("account changed to {account:#x}"),
            None => "wallet disconnected".to_owned(),
        },
        WalletEvent::ChainChanged(chain_id) => format!("network changed to chain {chain_id}"),
    }
}
