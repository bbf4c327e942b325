//! In-memory chain for tests. Decodes calldata with the real descriptors,
//! keeps just enough contract state to answer the controller, and records
//! every request.

use async_trait::async_trait;
use ethabi::{Contract, Function, Token};
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;
use tl_chain_client::abi::parse_descriptor;
use tl_chain_client::{
    AbiSet, Clock, ContractKind, RpcError, RpcTransport, WalletEvent, WalletEventHandler,
    WalletProvider,
};
use tl_types::{Address, ChainId, H256, SECONDS_PER_DAY, U256, address_hex, parse_address};

use crate::config::DEFAULT_FACTORY_ADDRESS;

const FACTORY_ABI: &str = include_str!("../../../abis/TrustLayer.json");
const CAMPAIGN_ABI: &str = include_str!("../../../abis/Campaign.json");
const TOKEN_ABI: &str = include_str!("../../../abis/RewardToken.json");

pub(crate) const NOW: u64 = 1_700_000_000;

pub(crate) fn descriptor(kind: ContractKind) -> Result<Vec<u8>, String> {
    let text = match kind {
        ContractKind::Factory => FACTORY_ABI,
        ContractKind::Campaign => CAMPAIGN_ABI,
        ContractKind::RewardToken => TOKEN_ABI,
    };
    Ok(text.as_bytes().to_vec())
}

pub(crate) fn abis() -> AbiSet {
    AbiSet::from_sources(descriptor)
}

pub(crate) fn eth(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

pub(crate) struct FixedClock;

#[async_trait(?Send)]
impl Clock for FixedClock {
    fn now_unix(&self) -> u64 {
        NOW
    }

    async fn sleep(&self, _duration: Duration) {}
}

struct StubMilestone {
    description: String,
    amount: U256,
    weight: U256,
    voters: Vec<Address>,
    approved: bool,
    released: bool,
}

struct StubCampaign {
    address: Address,
    goal: U256,
    raised: U256,
    balance: U256,
    deadline: u64,
    creator: Address,
    title: String,
    description: String,
    milestones: Vec<StubMilestone>,
    contributions: Vec<(Address, U256)>,
    broken: bool,
}

impl StubCampaign {
    fn stake_of(&self, account: &Address) -> U256 {
        self.contributions
            .iter()
            .filter(|(from, _)| from == account)
            .fold(U256::zero(), |total, (_, amount)| total + *amount)
    }

    fn vote(&mut self, index: usize, voter: Address) -> Result<(), RpcError> {
        let stake = self.stake_of(&voter);
        let raised = self.raised;
        let milestone = self
            .milestones
            .get_mut(index)
            .ok_or_else(|| revert("Invalid milestone"))?;
        if stake.is_zero() {
            return Err(revert("Only contributors can vote"));
        }
        if milestone.voters.contains(&voter) {
            return Err(revert("Already voted"));
        }
        milestone.weight += stake;
        milestone.voters.push(voter);
        milestone.approved = milestone.weight * 2 > raised;
        Ok(())
    }
}

enum Target {
    Factory,
    Token,
    Campaign(usize),
}

pub(crate) struct StubChain {
    pub factory: Address,
    pub token: Address,
    pub accounts: Vec<Address>,
    /// Index into `accounts` the wallet hands out.
    pub active_account: Cell<usize>,
    pub chain_id: Cell<u64>,
    pub known_chains: RefCell<Vec<u64>>,
    pub reject_accounts: Cell<bool>,
    pub reject_switch: Cell<bool>,
    pub token_deployed: Cell<bool>,
    pub token_decimals: Cell<u64>,
    pub broken_milestones: Cell<bool>,
    /// Answers `getMilestonesCount` with this instead of the real count.
    pub milestone_count: Cell<Option<U256>>,
    authorized: Cell<bool>,
    campaigns: RefCell<Vec<StubCampaign>>,
    token_balances: RefCell<HashMap<Address, U256>>,
    requests: RefCell<Vec<String>>,
    handlers: RefCell<Vec<WalletEventHandler>>,
    receipts: RefCell<HashMap<H256, bool>>,
    next_tx: Cell<u64>,
    factory_abi: Contract,
    campaign_abi: Contract,
    token_abi: Contract,
}

impl StubChain {
    pub fn new() -> Self {
        let load = |kind: ContractKind, text: &str| {
            parse_descriptor(kind, text.as_bytes()).expect("bundled descriptor parses")
        };
        Self {
            factory: parse_address(DEFAULT_FACTORY_ADDRESS).expect("default factory address"),
            token: Address::from_low_u64_be(0x70c3),
            accounts: vec![
                Address::from_low_u64_be(0xa11ce),
                Address::from_low_u64_be(0xb0b),
                Address::from_low_u64_be(0xc4a1),
            ],
            active_account: Cell::new(0),
            chain_id: Cell::new(31337),
            known_chains: RefCell::new(vec![1, 31337]),
            reject_accounts: Cell::new(false),
            reject_switch: Cell::new(false),
            token_deployed: Cell::new(false),
            token_decimals: Cell::new(18),
            broken_milestones: Cell::new(false),
            milestone_count: Cell::new(None),
            authorized: Cell::new(false),
            campaigns: RefCell::new(Vec::new()),
            token_balances: RefCell::new(HashMap::new()),
            requests: RefCell::new(Vec::new()),
            handlers: RefCell::new(Vec::new()),
            receipts: RefCell::new(HashMap::new()),
            next_tx: Cell::new(1),
            factory_abi: load(ContractKind::Factory, FACTORY_ABI),
            campaign_abi: load(ContractKind::Campaign, CAMPAIGN_ABI),
            token_abi: load(ContractKind::RewardToken, TOKEN_ABI),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    /// Requests for `method`, with or without a `:function` suffix.
    pub fn count(&self, method: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|entry| {
                entry.as_str() == method || entry.strip_prefix(method).is_some_and(|rest| rest.starts_with(':'))
            })
            .count()
    }

    pub fn clear_requests(&self) {
        self.requests.borrow_mut().clear();
    }

    pub fn add_campaign(&self, creator: Address, title: &str, goal: U256) -> Address {
        self.create_campaign(creator, title, &format!("{title} description"), goal, 30 * SECONDS_PER_DAY)
    }

    pub fn break_campaign(&self, campaign: Address) {
        self.with_campaign(campaign, |stub| stub.broken = true);
    }

    pub fn fund(&self, campaign: Address, from: Address, amount: U256) {
        self.with_campaign(campaign, |stub| {
            stub.raised += amount;
            stub.balance += amount;
            stub.contributions.push((from, amount));
        });
    }

    pub fn add_milestone(&self, campaign: Address, description: &str, amount: U256) {
        self.with_campaign(campaign, |stub| {
            stub.milestones.push(StubMilestone {
                description: description.to_owned(),
                amount,
                weight: U256::zero(),
                voters: Vec::new(),
                approved: false,
                released: false,
            });
        });
    }

    pub fn approve(&self, campaign: Address, index: usize, voter: Address) {
        self.with_campaign(campaign, |stub| {
            stub.vote(index, voter).expect("stub vote");
        });
    }

    pub fn set_token_balance(&self, account: Address, amount: U256) {
        self.token_deployed.set(true);
        self.token_balances.borrow_mut().insert(account, amount);
    }

    pub fn emit(&self, event: WalletEvent) {
        for handler in self.handlers.borrow().iter() {
            handler(event.clone());
        }
    }

    fn active(&self) -> Address {
        self.accounts[self.active_account.get()]
    }

    fn record(&self, entry: impl Into<String>) {
        self.requests.borrow_mut().push(entry.into());
    }

    fn with_campaign(&self, campaign: Address, apply: impl FnOnce(&mut StubCampaign)) {
        let mut campaigns = self.campaigns.borrow_mut();
        let stub = campaigns
            .iter_mut()
            .find(|stub| stub.address == campaign)
            .expect("unknown stub campaign");
        apply(stub);
    }

    fn create_campaign(
        &self,
        creator: Address,
        title: &str,
        description: &str,
        goal: U256,
        duration: u64,
    ) -> Address {
        let mut campaigns = self.campaigns.borrow_mut();
        let address = Address::from_low_u64_be(0xca00 + campaigns.len() as u64);
        campaigns.push(StubCampaign {
            address,
            goal,
            raised: U256::zero(),
            balance: U256::zero(),
            deadline: NOW + duration,
            creator,
            title: title.to_owned(),
            description: description.to_owned(),
            milestones: Vec::new(),
            contributions: Vec::new(),
            broken: false,
        });
        address
    }

    fn target(&self, address: Address) -> Option<(Target, &Contract)> {
        if address == self.factory {
            return Some((Target::Factory, &self.factory_abi));
        }
        if address == self.token && self.token_deployed.get() {
            return Some((Target::Token, &self.token_abi));
        }
        self.campaigns
            .borrow()
            .iter()
            .position(|stub| stub.address == address)
            .map(|index| (Target::Campaign(index), &self.campaign_abi))
    }

    fn eth_call(&self, params: &Value) -> Result<Value, RpcError> {
        let tx = TxFields::parse(params)?;
        let Some((target, abi)) = self.target(tx.to) else {
            self.record("eth_call");
            return Ok(json!("0x"));
        };
        let function = find_function(abi, &tx.data)?;
        self.record(format!("eth_call:{}", function.name));
        let args = decode_args(function, &tx.data)?;

        let outputs = match target {
            Target::Factory => self.factory_view(&function.name, &args)?,
            Target::Token => self.token_view(&function.name, &args)?,
            Target::Campaign(index) => self.campaign_view(index, &function.name, &args)?,
        };
        Ok(json!(format!("0x{}", hex::encode(ethabi::encode(&outputs)))))
    }

    fn factory_view(&self, name: &str, args: &[Token]) -> Result<Vec<Token>, RpcError> {
        let campaigns = self.campaigns.borrow();
        match name {
            "getDeployedCampaigns" => Ok(vec![Token::Array(
                campaigns.iter().map(|stub| Token::Address(stub.address)).collect(),
            )]),
            "deployedCampaigns" => {
                let index = index_arg(args)?;
                let stub = campaigns.get(index).ok_or_else(|| revert("index out of range"))?;
                Ok(vec![Token::Address(stub.address)])
            }
            "token" => {
                let token = if self.token_deployed.get() {
                    self.token
                } else {
                    Address::zero()
                };
                Ok(vec![Token::Address(token)])
            }
            other => Err(RpcError::internal(format!("factory has no view {other}"))),
        }
    }

    fn token_view(&self, name: &str, args: &[Token]) -> Result<Vec<Token>, RpcError> {
        let balances = self.token_balances.borrow();
        match name {
            "name" => Ok(vec![Token::String("TrustLayer Token".to_owned())]),
            "symbol" => Ok(vec![Token::String("TSL".to_owned())]),
            "decimals" => Ok(vec![Token::Uint(U256::from(self.token_decimals.get()))]),
            "totalSupply" => Ok(vec![Token::Uint(
                balances.values().fold(U256::zero(), |total, amount| total + *amount),
            )]),
            "balanceOf" => {
                let account = args
                    .first()
                    .cloned()
                    .and_then(Token::into_address)
                    .ok_or_else(|| RpcError::internal("balanceOf needs an address"))?;
                let balance = balances.get(&account).copied().unwrap_or_default();
                Ok(vec![Token::Uint(balance)])
            }
            other => Err(RpcError::internal(format!("token has no view {other}"))),
        }
    }

    fn campaign_view(&self, index: usize, name: &str, args: &[Token]) -> Result<Vec<Token>, RpcError> {
        let campaigns = self.campaigns.borrow();
        let stub = &campaigns[index];
        if stub.broken {
            return Err(RpcError::new(-32000, "execution reverted"));
        }
        match name {
            "getSummary" => Ok(vec![
                Token::Uint(stub.goal),
                Token::Uint(stub.raised),
                Token::Uint(stub.balance),
                Token::Uint(U256::from(stub.deadline)),
                Token::Address(stub.creator),
                Token::String(stub.title.clone()),
                Token::String(stub.description.clone()),
            ]),
            "getMilestonesCount" if self.broken_milestones.get() => {
                Err(RpcError::new(-32000, "header not found"))
            }
            "getMilestonesCount" => {
                let count = self
                    .milestone_count
                    .get()
                    .unwrap_or_else(|| U256::from(stub.milestones.len()));
                Ok(vec![Token::Uint(count)])
            }
            "milestones" => {
                let milestone = stub
                    .milestones
                    .get(index_arg(args)?)
                    .ok_or_else(|| revert("Invalid milestone"))?;
                Ok(vec![
                    Token::String(milestone.description.clone()),
                    Token::Uint(milestone.amount),
                    Token::Bool(milestone.approved),
                    Token::Bool(milestone.released),
                ])
            }
            "approvalWeights" => {
                let weight = stub
                    .milestones
                    .get(index_arg(args)?)
                    .map(|milestone| milestone.weight)
                    .unwrap_or_default();
                Ok(vec![Token::Uint(weight)])
            }
            "creator" => Ok(vec![Token::Address(stub.creator)]),
            "contributions" => {
                let account = args
                    .first()
                    .cloned()
                    .and_then(Token::into_address)
                    .ok_or_else(|| RpcError::internal("contributions needs an address"))?;
                Ok(vec![Token::Uint(stub.stake_of(&account))])
            }
            other => Err(RpcError::internal(format!("campaign has no view {other}"))),
        }
    }

    fn eth_send_transaction(&self, params: &Value) -> Result<Value, RpcError> {
        let tx = TxFields::parse(params)?;
        let from = tx
            .from
            .ok_or_else(|| RpcError::new(-32602, "missing from"))?;
        let Some((target, abi)) = self.target(tx.to) else {
            self.record("eth_sendTransaction");
            return Err(RpcError::internal("no contract at target address"));
        };
        let function = find_function(abi, &tx.data)?;
        self.record(format!("eth_sendTransaction:{}", function.name));
        let args = decode_args(function, &tx.data)?;
        let value = tx.value.unwrap_or_default();

        match target {
            Target::Factory if function.name == "createCampaign" => {
                let mut args = args.into_iter();
                let mut next = || args.next().ok_or_else(|| RpcError::internal("missing argument"));
                let title = next()?.into_string().unwrap_or_default();
                let description = next()?.into_string().unwrap_or_default();
                let goal = next()?.into_uint().unwrap_or_default();
                let duration = next()?.into_uint().unwrap_or_default();
                self.create_campaign(from, &title, &description, goal, duration.low_u64());
            }
            Target::Campaign(index) => {
                self.campaign_write(index, from, &function.name, &args, value)?;
            }
            _ => return Err(RpcError::internal(format!("{} is not writable here", function.name))),
        }

        let hash = H256::from_low_u64_be(self.next_tx.get());
        self.next_tx.set(self.next_tx.get() + 1);
        self.receipts.borrow_mut().insert(hash, true);
        Ok(json!(format!("{hash:#x}")))
    }

    fn campaign_write(
        &self,
        index: usize,
        from: Address,
        name: &str,
        args: &[Token],
        value: U256,
    ) -> Result<(), RpcError> {
        let mut campaigns = self.campaigns.borrow_mut();
        let stub = &mut campaigns[index];
        match name {
            "contribute" => {
                if value.is_zero() {
                    return Err(revert("Contribution must be greater than 0"));
                }
                stub.raised += value;
                stub.balance += value;
                stub.contributions.push((from, value));
            }
            "vote" => stub.vote(index_arg(args)?, from)?,
            "createMilestone" => {
                if from != stub.creator {
                    return Err(revert("Only creator can create milestones"));
                }
                let mut args = args.iter().cloned();
                let description = args.next().and_then(Token::into_string).unwrap_or_default();
                let amount = args.next().and_then(Token::into_uint).unwrap_or_default();
                stub.milestones.push(StubMilestone {
                    description,
                    amount,
                    weight: U256::zero(),
                    voters: Vec::new(),
                    approved: false,
                    released: false,
                });
            }
            "withdraw" => {
                if from != stub.creator {
                    return Err(revert("Only creator can withdraw"));
                }
                let milestone = stub
                    .milestones
                    .get_mut(index_arg(args)?)
                    .ok_or_else(|| revert("Invalid milestone"))?;
                if !milestone.approved {
                    return Err(revert("Milestone not approved"));
                }
                if milestone.released {
                    return Err(revert("Already released"));
                }
                milestone.released = true;
                let amount = milestone.amount;
                stub.balance = stub.balance.saturating_sub(amount);
            }
            other => return Err(RpcError::internal(format!("campaign has no function {other}"))),
        }
        Ok(())
    }

    fn eth_get_logs(&self, params: &Value) -> Result<Value, RpcError> {
        let address = params[0]["address"]
            .as_str()
            .and_then(|text| parse_address(text).ok())
            .ok_or_else(|| RpcError::new(-32602, "log filter needs an address"))?;
        let campaigns = self.campaigns.borrow();
        let Some(stub) = campaigns.iter().find(|stub| stub.address == address) else {
            return Ok(json!([]));
        };
        if stub.broken {
            return Err(RpcError::new(-32000, "query returned more than 10000 results"));
        }

        let signature = self
            .campaign_abi
            .event("Contributed")
            .map_err(|err| RpcError::internal(err.to_string()))?
            .signature();
        let logs: Vec<Value> = stub
            .contributions
            .iter()
            .map(|(from, amount)| {
                json!({
                    "address": address_hex(&stub.address),
                    "topics": [format!("{signature:#x}"), format!("{:#x}", H256::from(*from))],
                    "data": format!("0x{}", hex::encode(ethabi::encode(&[Token::Uint(*amount)]))),
                })
            })
            .collect();
        Ok(Value::Array(logs))
    }
}

#[async_trait(?Send)]
impl RpcTransport for StubChain {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "eth_call" => return self.eth_call(&params),
            "eth_sendTransaction" => return self.eth_send_transaction(&params),
            _ => self.record(method),
        }

        match method {
            "eth_chainId" => Ok(json!(ChainId(self.chain_id.get()).to_hex())),
            "eth_requestAccounts" => {
                if self.reject_accounts.get() {
                    return Err(RpcError::new(RpcError::USER_REJECTED, "User rejected the request."));
                }
                self.authorized.set(true);
                Ok(json!([address_hex(&self.active())]))
            }
            "eth_accounts" if self.authorized.get() => Ok(json!([address_hex(&self.active())])),
            "eth_accounts" => Ok(json!([])),
            "wallet_switchEthereumChain" => {
                if self.reject_switch.get() {
                    return Err(RpcError::new(RpcError::USER_REJECTED, "User rejected the request."));
                }
                let chain = chain_param(&params)?;
                if !self.known_chains.borrow().contains(&chain) {
                    return Err(RpcError::new(
                        RpcError::UNRECOGNIZED_CHAIN,
                        format!("Unrecognized chain ID \"{}\".", ChainId(chain).to_hex()),
                    ));
                }
                self.chain_id.set(chain);
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                let chain = chain_param(&params)?;
                self.known_chains.borrow_mut().push(chain);
                Ok(Value::Null)
            }
            "eth_getTransactionReceipt" => {
                let hash = params[0]
                    .as_str()
                    .and_then(|text| text.strip_prefix("0x"))
                    .and_then(|digits| hex::decode(digits).ok())
                    .filter(|bytes| bytes.len() == 32)
                    .map(|bytes| H256::from_slice(&bytes))
                    .ok_or_else(|| RpcError::new(-32602, "invalid transaction hash"))?;
                Ok(match self.receipts.borrow().get(&hash) {
                    Some(true) => json!({ "status": "0x1", "blockNumber": "0x2" }),
                    Some(false) => json!({ "status": "0x0", "blockNumber": "0x2" }),
                    None => Value::Null,
                })
            }
            "eth_getLogs" => self.eth_get_logs(&params),
            "eth_getBalance" => Ok(json!(format!("{:#x}", eth(100) + eth(1) / 2))),
            "eth_getCode" => {
                let address = params[0]
                    .as_str()
                    .and_then(|text| parse_address(text).ok())
                    .ok_or_else(|| RpcError::new(-32602, "invalid address"))?;
                let code = if self.target(address).is_some() { "0x6080604052" } else { "0x" };
                Ok(json!(code))
            }
            other => Err(RpcError::new(-32601, format!("method {other} not found"))),
        }
    }
}

impl WalletProvider for StubChain {
    fn subscribe(&self, handler: WalletEventHandler) {
        self.handlers.borrow_mut().push(handler);
    }
}

struct TxFields {
    to: Address,
    from: Option<Address>,
    data: Vec<u8>,
    value: Option<U256>,
}

impl TxFields {
    fn parse(params: &Value) -> Result<Self, RpcError> {
        let tx = &params[0];
        let address = |key: &str| {
            tx[key]
                .as_str()
                .map(|text| parse_address(text).map_err(|err| RpcError::new(-32602, err.to_string())))
                .transpose()
        };
        let to = address("to")?.ok_or_else(|| RpcError::new(-32602, "missing to"))?;
        let data = tx["data"]
            .as_str()
            .map(|text| text.trim_start_matches("0x"))
            .map(hex::decode)
            .transpose()
            .map_err(|err| RpcError::new(-32602, err.to_string()))?
            .unwrap_or_default();
        let value = tx["value"]
            .as_str()
            .map(|text| U256::from_str_radix(text.trim_start_matches("0x"), 16))
            .transpose()
            .map_err(|_| RpcError::new(-32602, "invalid value"))?;
        Ok(Self {
            to,
            from: address("from")?,
            data,
            value,
        })
    }
}

fn find_function<'a>(abi: &'a Contract, data: &[u8]) -> Result<&'a Function, RpcError> {
    let selector = data
        .get(..4)
        .ok_or_else(|| RpcError::new(-32602, "calldata shorter than a selector"))?;
    abi.functions()
        .find(|function| function.short_signature()[..] == *selector)
        .ok_or_else(|| revert("function selector was not recognized"))
}

fn decode_args(function: &Function, data: &[u8]) -> Result<Vec<Token>, RpcError> {
    function
        .decode_input(&data[4..])
        .map_err(|err| RpcError::new(-32602, err.to_string()))
}

fn index_arg(args: &[Token]) -> Result<usize, RpcError> {
    args.first()
        .cloned()
        .and_then(Token::into_uint)
        .map(|value| value.low_u64() as usize)
        .ok_or_else(|| RpcError::new(-32602, "expected an index argument"))
}

fn chain_param(params: &Value) -> Result<u64, RpcError> {
    params[0]["chainId"]
        .as_str()
        .and_then(ChainId::from_hex)
        .map(|chain| chain.0)
        .ok_or_else(|| RpcError::new(-32602, "chainId missing"))
}

fn revert(reason: &str) -> RpcError {
    RpcError::internal(format!(
        "Error: VM Exception while processing transaction: reverted with reason string '{reason}'"
    ))
}
