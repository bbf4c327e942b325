use anyhow::{Context as _, Result};
use ethabi::Token;
use serde_json::{Value, json};
use std::path::Path;
use std::rc::Rc;
use tl_chain_client::{
    AbiSet, ContractHandle, ContractKind, RpcTransport, TxReceipt, WalletHandle,
    contract::parse_h256, wait_for_receipt,
};
use tl_chain_jsonrpc::{HttpTransport, NodeWallet, SystemClock};
use tl_dapp_core::{Dapp, DappConfig};
use tl_types::{Address, U256, address_hex};
use tracing::{debug, info};

/// Everything a command needs: the node connection, the node-managed signer
/// and a controller wired to both.
pub struct Context {
    pub config: DappConfig,
    pub node: Rc<HttpTransport>,
    pub wallet: Rc<NodeWallet>,
    pub abis: AbiSet,
    pub dapp: Rc<Dapp>,
    clock: SystemClock,
}

impl Context {
    pub fn new(config: DappConfig, account: usize) -> Result<Self> {
        let rpc_url = config.network.rpc_url.clone();
        let node = Rc::new(HttpTransport::new(Some(rpc_url.clone())));
        let wallet = Rc::new(NodeWallet::new(HttpTransport::new(Some(rpc_url)), account));
        let abis = AbiSet::load_dir(Path::new(&config.abi_dir));
        debug!("node at {}, signing with account #{}", node.endpoint(), account);

        let dapp = Dapp::new(
            config.clone(),
            abis.clone(),
            node.clone(),
            Some(WalletHandle::new(wallet.clone())),
            Rc::new(SystemClock),
        )?;

        Ok(Self {
            config,
            node,
            wallet,
            abis,
            dapp: Rc::new(dapp),
            clock: SystemClock,
        })
    }

    pub fn factory(&self) -> Address {
        self.dapp.factory()
    }

    pub fn reader(&self, address: Address, kind: ContractKind) -> Result<ContractHandle> {
        let abi = self.abis.get(kind)?;
        Ok(ContractHandle::new(address, kind, abi, self.node.clone(), None))
    }

    pub async fn code(&self, address: Address) -> Result<String> {
        let raw = self
            .node
            .request("eth_getCode", json!([address_hex(&address), "latest"]))
            .await?;
        Ok(raw.as_str().unwrap_or("0x").to_owned())
    }

    /// Account the node hands out at the configured index.
    pub async fn signer(&self) -> Result<Address> {
        let accounts = self.wallet.request("eth_requestAccounts", json!([])).await?;
        let first = accounts
            .get(0)
            .and_then(Value::as_str)
            .context("node returned no accounts")?;
        Ok(tl_types::parse_address(first)?)
    }

    /// Plain value transfer from the signing account, waited to inclusion.
    pub async fn transfer(&self, to: Address, amount: U256) -> Result<TxReceipt> {
        let from = self.signer().await?;
        let tx = json!({
            "from": address_hex(&from),
            "to": address_hex(&to),
            "value": format!("{amount:#x}"),
        });
        let raw = self.wallet.request("eth_sendTransaction", json!([tx])).await?;
        let hash = parse_h256(raw.as_str().context("transaction hash expected")?)?;
        println!("Transaction sent: {hash:#x}");

        let receipt = wait_for_receipt(
            self.node.as_ref(),
            &self.clock,
            hash,
            self.config.receipt_poll_interval(),
        )
        .await?;
        info!("transfer {:#x} included in block {:?}", hash, receipt.block_number);
        Ok(receipt)
    }

    /// Single-output view call.
    pub async fn view(&self, handle: &ContractHandle, function: &str) -> Result<Token> {
        handle
            .call(function, &[])
            .await?
            .into_iter()
            .next()
            .with_context(|| format!("{function} returned nothing"))
    }
}
