use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tl_dapp_core::{CampaignForm, DappConfig};

mod commands;
mod context;

use context::Context;

#[derive(Parser)]
#[command(name = "tl-ops")]
#[command(about = "TrustLayer ops: inspect and drive a local crowdfunding deployment")]
#[command(version)]
struct Cli {
    /// JSON config file layered over the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Node JSON-RPC URL
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Factory contract address
    #[arg(long, global = true)]
    factory: Option<String>,

    /// Directory holding TrustLayer.json, Campaign.json and RewardToken.json
    #[arg(long, global = true)]
    abi_dir: Option<PathBuf>,

    /// Index of the node-managed account that signs writes
    #[arg(long, global = true, default_value_t = 0)]
    account: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate campaigns from the factory with their summaries
    Campaigns,

    /// Show one campaign with milestones and backer count
    Campaign { address: String },

    /// Print the bytecode deployed at an address
    CheckCode { address: String },

    /// Factory code, deployed campaigns and the reward token
    NetworkState,

    /// Transfer ether from the signing account
    SendEth {
        to: String,
        #[arg(long, default_value = "1000")]
        amount: String,
    },

    /// Set a balance with hardhat_setBalance, falling back to a 1000 ETH transfer
    FundUser {
        address: String,
        #[arg(long, default_value = "100000")]
        amount: String,
    },

    /// Create a campaign through the factory
    CreateCampaign {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// Goal in ETH
        #[arg(long)]
        goal: String,
        /// Duration in whole days
        #[arg(long)]
        days: String,
    },

    /// Contribute ETH to a campaign
    Contribute { campaign: String, amount: String },

    /// Vote to approve a milestone
    Vote { campaign: String, milestone: u64 },

    /// Propose a milestone (campaign creator only)
    CreateMilestone {
        campaign: String,
        #[arg(long)]
        description: String,
        /// Amount in ETH
        #[arg(long)]
        amount: String,
    },

    /// Release an approved milestone's funds (campaign creator only)
    Withdraw { campaign: String, milestone: u64 },
}

impl Cli {
    /// Defaults, then `--config`, then `TRUSTLAYER_*`, then flags.
    fn settings<F>(&self, lookup: F) -> Result<DappConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match &self.config {
            Some(path) => DappConfig::from_file(path)?,
            None => DappConfig::default(),
        };
        let mut config = base.overlay(lookup)?;

        if let Some(url) = &self.rpc_url {
            config.network.rpc_url = url.clone();
        }
        if let Some(factory) = &self.factory {
            config.factory_address = factory.clone();
        }
        if let Some(dir) = &self.abi_dir {
            config.abi_dir = dir.display().to_string();
        }
        config.factory().context("--factory")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = cli.settings(|key| std::env::var(key).ok())?;
    let ctx = Context::new(config, cli.account)?;

    match cli.command {
        Commands::Campaigns => commands::campaigns(&ctx).await,
        Commands::Campaign { address } => commands::campaign(&ctx, &address).await,
        Commands::CheckCode { address } => commands::check_code(&ctx, &address).await,
        Commands::NetworkState => commands::network_state(&ctx).await,
        Commands::SendEth { to, amount } => commands::send_eth(&ctx, &to, &amount).await,
        Commands::FundUser { address, amount } => {
            commands::fund_user(&ctx, &address, &amount).await
        }
        Commands::CreateCampaign {
            title,
            description,
            goal,
            days,
        } => {
            let form = CampaignForm {
                title,
                description,
                goal_eth: goal,
                duration_days: days,
            };
            commands::create_campaign(&ctx, &form).await
        }
        Commands::Contribute { campaign, amount } => {
            commands::contribute(&ctx, &campaign, &amount).await
        }
        Commands::Vote {
            campaign,
            milestone,
        } => commands::vote(&ctx, &campaign, milestone).await,
        Commands::CreateMilestone {
            campaign,
            description,
            amount,
        } => commands::create_milestone(&ctx, &campaign, &description, &amount).await,
        Commands::Withdraw {
            campaign,
            milestone,
        } => commands::withdraw(&ctx, &campaign, milestone).await,
    }
}
