use ethabi::{Contract, Log, RawLog, Token};
use serde_json::{Value, json};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tl_types::{Address, H256, U256, address_hex};
use tracing::{debug, info};

use crate::{Clock, ContractKind, RpcError, RpcTransport};

#[derive(Debug, Error)]
pub enum CallError {
    #[error("abi error: {0}")]
    Abi(#[from] ethabi::Error),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("unexpected node response: {0}")]
    Decode(String),
    #[error("transaction {0:#x} reverted")]
    Reverted(H256),
    #[error("no signing account is bound to this contract")]
    NoSigner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// A contract interface bound to an address and a connection.
///
/// Handles bound with a `from` account send writes through the signing
/// connection; the rest are read-only.
#[derive(Clone)]
pub struct ContractHandle {
    address: Address,
    kind: ContractKind,
    abi: Rc<Contract>,
    transport: Rc<dyn RpcTransport>,
    from: Option<Address>,
}

impl ContractHandle {
    pub fn new(
        address: Address,
        kind: ContractKind,
        abi: Rc<Contract>,
        transport: Rc<dyn RpcTransport>,
        from: Option<Address>,
    ) -> Self {
        Self {
            address,
            kind,
            abi,
            transport,
            from,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn kind(&self) -> ContractKind {
        self.kind
    }

    pub fn signer(&self) -> Option<Address> {
        self.from
    }

    pub async fn call(&self, function: &str, args: &[Token]) -> Result<Vec<Token>, CallError> {
        let function = self.abi.function(function)?;
        let data = function.encode_input(args)?;

        let mut tx = json!({
            "to": address_hex(&self.address),
            "data": to_hex_prefixed(&data),
        });
        if let Some(from) = &self.from {
            tx["from"] = Value::String(address_hex(from));
        }

        let raw = self.transport.request("eth_call", json!([tx, "latest"])).await?;
        let bytes = decode_hex_value(&raw)?;
        if bytes.is_empty() && !function.outputs.is_empty() {
            return Err(CallError::Decode(format!(
                "empty result from {} at {}; is the contract deployed?",
                function.name,
                address_hex(&self.address)
            )));
        }
        Ok(function.decode_output(&bytes)?)
    }

    /// Like [`call`](Self::call) but pairs each output with its declared name.
    pub async fn call_named(
        &self,
        function: &str,
        args: &[Token],
    ) -> Result<Vec<(String, Token)>, CallError> {
        let names: Vec<String> = self
            .abi
            .function(function)?
            .outputs
            .iter()
            .map(|param| param.name.clone())
            .collect();
        let tokens = self.call(function, args).await?;
        Ok(names.into_iter().zip(tokens).collect())
    }

    pub async fn send(
        &self,
        function: &str,
        args: &[Token],
        value: Option<U256>,
    ) -> Result<H256, CallError> {
        let from = self.from.ok_or(CallError::NoSigner)?;
        let data = self.abi.function(function)?.encode_input(args)?;

        let mut tx = json!({
            "from": address_hex(&from),
            "to": address_hex(&self.address),
            "data": to_hex_prefixed(&data),
        });
        if let Some(value) = value {
            tx["value"] = Value::String(format!("{value:#x}"));
        }

        debug!("{} {} -> {}", self.kind, function, address_hex(&self.address));
        let raw = self.transport.request("eth_sendTransaction", json!([tx])).await?;
        let hash = raw
            .as_str()
            .ok_or_else(|| CallError::Decode(format!("transaction hash expected, got {raw}")))?;
        let hash = parse_h256(hash)?;
        info!("{} {} submitted as {:#x}", self.kind, function, hash);
        Ok(hash)
    }

    /// Every emission of `event` by this contract from block 0 to latest.
    pub async fn logs(&self, event: &str) -> Result<Vec<Log>, CallError> {
        let event = self.abi.event(event)?;
        let filter = json!({
            "address": address_hex(&self.address),
            "topics": [format!("{:#x}", event.signature())],
            "fromBlock": "0x0",
            "toBlock": "latest",
        });

        let raw = self.transport.request("eth_getLogs", json!([filter])).await?;
        let entries = raw
            .as_array()
            .ok_or_else(|| CallError::Decode(format!("log array expected, got {raw}")))?;

        let mut logs = Vec::with_capacity(entries.len());
        for entry in entries {
            let topics = entry
                .get("topics")
                .and_then(Value::as_array)
                .ok_or_else(|| CallError::Decode("log without topics".to_owned()))?
                .iter()
                .map(|topic| {
                    topic
                        .as_str()
                        .ok_or_else(|| CallError::Decode("topic is not a string".to_owned()))
                        .and_then(parse_h256)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let data = decode_hex_value(entry.get("data").unwrap_or(&Value::Null))?;
            logs.push(event.parse_log(RawLog { topics, data })?);
        }
        Ok(logs)
    }
}

/// Polls until the transaction has a receipt (one confirmation).
///
/// There is no timeout here; the node and wallet enforce their own.
pub async fn wait_for_receipt(
    transport: &dyn RpcTransport,
    clock: &dyn Clock,
    tx_hash: H256,
    poll_interval: Duration,
) -> Result<TxReceipt, CallError> {
    let hash = format!("{tx_hash:#x}");
    loop {
        let raw = transport
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;

        if raw.is_null() {
            clock.sleep(poll_interval).await;
            continue;
        }

        let block_number = raw
            .get("blockNumber")
            .and_then(Value::as_str)
            .map(parse_quantity)
            .transpose()?
            .map(tl_types::saturating_u64);
        // pre-byzantium receipts carry no status; treat them as included
        let success = match raw.get("status").and_then(Value::as_str) {
            Some(status) => !parse_quantity(status)?.is_zero(),
            None => true,
        };

        let receipt = TxReceipt {
            tx_hash,
            block_number,
            success,
        };
        if !receipt.success {
            return Err(CallError::Reverted(tx_hash));
        }
        return Ok(receipt);
    }
}

pub fn to_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn decode_hex_value(value: &Value) -> Result<Vec<u8>, CallError> {
    let text = value
        .as_str()
        .ok_or_else(|| CallError::Decode(format!("hex string expected, got {value}")))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|err| CallError::Decode(format!("invalid hex: {err}")))
}

pub fn parse_h256(text: &str) -> Result<H256, CallError> {
    let bytes = decode_hex_value(&Value::String(text.to_owned()))?;
    if bytes.len() != 32 {
        return Err(CallError::Decode(format!("32 byte hash expected, got {text}")));
    }
    Ok(H256::from_slice(&bytes))
}

pub fn parse_quantity(text: &str) -> Result<U256, CallError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(digits, 16)
        .map_err(|_| CallError::Decode(format!("invalid quantity: {text}")))
}
