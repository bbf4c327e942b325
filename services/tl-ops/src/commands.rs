use anyhow::{Result, bail};
use ethabi::Token;
use serde_json::json;
use tl_chain_client::{ContractKind, RpcTransport};
use tl_dapp_core::{
    ActionKind, ActionObserver, ActionOutcome, ActionPhase, CampaignForm, CampaignListView,
    DetailPage,
};
use tl_types::{Address, address_hex, format_ether, parse_address, parse_ether};
use tracing::{info, warn};

use crate::context::Context;

const FALLBACK_FUNDING_ETH: &str = "1000";

/// Prints progress the way the deploy scripts did.
struct Progress;

impl ActionObserver for Progress {
    fn on_phase(&self, kind: ActionKind, phase: &ActionPhase) {
        match phase {
            ActionPhase::Signing => info!("{:?}: waiting for signature", kind),
            ActionPhase::Submitted(hash) => println!("Transaction sent: {hash:#x}"),
            ActionPhase::Confirmed(receipt) => match receipt.block_number {
                Some(block) => println!("Included in block {block}"),
                None => println!("Included"),
            },
        }
    }
}

fn address_arg(input: &str) -> Result<Address> {
    parse_address(input).map_err(|err| anyhow::anyhow!("{input}: {err}"))
}

pub async fn campaigns(ctx: &Context) -> Result<()> {
    match ctx.dapp.load_campaigns().await {
        CampaignListView::Loaded { cards, skipped } => {
            println!("Deployed campaigns: {}", cards.len() + skipped.len());
            for card in &cards {
                println!(
                    " - {} {:?}: {} / {} ETH ({:.0}%)",
                    card.address, card.title, card.raised_eth, card.goal_eth, card.progress_percent
                );
            }
            for address in &skipped {
                println!(" - {address} (summary unreadable, skipped)");
            }
            Ok(())
        }
        CampaignListView::Failed { message } => bail!("Failed to get campaigns: {message}"),
    }
}

pub async fn campaign(ctx: &Context, address: &str) -> Result<()> {
    let campaign = address_arg(address)?;
    match ctx.dapp.view_campaign(campaign).await {
        DetailPage::Loaded { mut view } => {
            view.set_backers(ctx.dapp.backer_count(campaign).await);
            println!("{}", serde_json::to_string_pretty(&view)?);
            Ok(())
        }
        DetailPage::NotFound { address } => bail!("Campaign not found at {address}"),
        DetailPage::Unavailable { message } => bail!("{message}"),
    }
}

pub async fn check_code(ctx: &Context, address: &str) -> Result<()> {
    let address = address_arg(address)?;
    let code = ctx.code(address).await?;
    println!("Code at {}: {}", address_hex(&address), code);
    Ok(())
}

pub async fn network_state(ctx: &Context) -> Result<()> {
    let factory = ctx.factory();
    println!("Checking Factory at {}...", address_hex(&factory));
    if ctx.code(factory).await? == "0x" {
        bail!("No contract code at Factory address! Did you forget to deploy?");
    }
    println!("Factory contract found.");

    if let Err(err) = campaigns(ctx).await {
        warn!("{:#}", err);
    }

    if let Err(err) = token_state(ctx, factory).await {
        println!("Failed to get token info: {err:#}");
    }
    Ok(())
}

async fn token_state(ctx: &Context, factory: Address) -> Result<()> {
    let handle = ctx.reader(factory, ContractKind::Factory)?;
    let Some(token) = ctx.view(&handle, "token").await?.into_address() else {
        bail!("token() did not return an address");
    };
    println!("Token Address: {}", address_hex(&token));
    if token.is_zero() {
        println!("Reward token not deployed.");
        return Ok(());
    }
    if ctx.code(token).await? == "0x" {
        bail!("No code at Token address!");
    }

    let handle = ctx.reader(token, ContractKind::RewardToken)?;
    match ctx.view(&handle, "name").await? {
        Token::String(name) => println!("Token Name: {name}"),
        other => bail!("name() returned {other:?}"),
    }
    Ok(())
}

pub async fn send_eth(ctx: &Context, to: &str, amount: &str) -> Result<()> {
    let to = address_arg(to)?;
    let amount = parse_ether(amount)?;
    println!("Sending {} ETH to {}...", format_ether(amount), address_hex(&to));
    ctx.transfer(to, amount).await?;
    println!("Success! Funds transferred.");
    Ok(())
}

pub async fn fund_user(ctx: &Context, address: &str, amount: &str) -> Result<()> {
    let user = address_arg(address)?;
    let amount = parse_ether(amount)?;
    println!("Setting balance for {} to {} ETH...", address_hex(&user), format_ether(amount));

    let set = ctx
        .node
        .request(
            "hardhat_setBalance",
            json!([address_hex(&user), format!("{amount:#x}")]),
        )
        .await;
    match set {
        Ok(_) => println!("Balance set successfully!"),
        Err(err) => {
            warn!("hardhat_setBalance failed: {}", err.detail());
            println!("Fallback: sending {FALLBACK_FUNDING_ETH} ETH from the signing account");
            ctx.transfer(user, parse_ether(FALLBACK_FUNDING_ETH)?).await?;
            println!("Sent {FALLBACK_FUNDING_ETH} ETH.");
        }
    }
    Ok(())
}

async fn connect(ctx: &Context) -> Result<()> {
    let session = ctx.dapp.connect().await?;
    if let Some(account) = session.address {
        info!("signing as {}", address_hex(&account));
    }
    Ok(())
}

fn report(outcome: ActionOutcome) {
    println!("{}", outcome.message);
}

pub async fn create_campaign(ctx: &Context, form: &CampaignForm) -> Result<()> {
    connect(ctx).await?;
    report(ctx.dapp.create_campaign(form, &Progress).await?);
    campaigns(ctx).await
}

pub async fn contribute(ctx: &Context, campaign: &str, amount: &str) -> Result<()> {
    connect(ctx).await?;
    report(ctx.dapp.contribute(campaign, amount, &Progress).await?);
    Ok(())
}

pub async fn vote(ctx: &Context, campaign: &str, milestone: u64) -> Result<()> {
    connect(ctx).await?;
    report(ctx.dapp.vote(campaign, milestone, &Progress).await?);
    Ok(())
}

pub async fn create_milestone(
    ctx: &Context,
    campaign: &str,
    description: &str,
    amount: &str,
) -> Result<()> {
    connect(ctx).await?;
    report(
        ctx.dapp
            .create_milestone(campaign, description, amount, &Progress)
            .await?,
    );
    Ok(())
}

pub async fn withdraw(ctx: &Context, campaign: &str, milestone: u64) -> Result<()> {
    connect(ctx).await?;
    report(ctx.dapp.withdraw(campaign, milestone, &Progress).await?);
    Ok(())
}
