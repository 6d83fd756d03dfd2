//! Command line surface.

use std::str::FromStr;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use solana_sdk::pubkey::Pubkey;

use crate::keys::{InputKeypair, InputPubkey};

#[derive(Parser)]
#[command(
    name = "quarry-admin",
    version,
    about = "Administers Quarry rewarders behind direct, operator and smart wallet authorities"
)]
pub struct Opts {
    /// Cluster: localnet, devnet, mainnet or an RPC url.
    #[arg(short = 'c', long)]
    pub cluster: Option<String>,

    /// Commitment level: processed, confirmed or finalized.
    #[arg(long)]
    pub commitment: Option<String>,

    /// Wallet keypair paying fees and, by default, signing.
    #[arg(short = 'k', long)]
    pub keypair: Option<String>,

    /// Dry-run every transaction instead of submitting.
    #[arg(short = 's', long)]
    pub simulate: bool,

    #[arg(long, default_value = "~/.config/quarry-admin.toml")]
    pub config: String,

    #[command(subcommand)]
    pub job: Job,
}

#[derive(Subcommand)]
pub enum Job {
    /// Create a quarry for a stake mint on a rewarder.
    CreateQuarry(CreateQuarryOpts),
    /// Update quarry shares and/or the rewarder's total rate.
    SetRewards(SetRewardsOpts),
    /// Create an operator record and accept the rewarder authority.
    CreateOperator(CreateOperatorOpts),
    /// Create an N-of-M smart wallet.
    CreateMultisig(CreateMultisigOpts),
    /// Approve a stored smart wallet transaction.
    Approve(WalletTransactionOpts),
    /// Execute a stored smart wallet transaction.
    Execute(WalletTransactionOpts),
    /// Nominate a new rewarder authority.
    TransferAuthority(TransferAuthorityOpts),
    /// Accept a pending rewarder authority handover.
    AcceptAuthority(AcceptAuthorityOpts),
    /// Print a rewarder, its resolved authority and its quarries.
    ShowRewarder(ShowRewarderOpts),
}

#[derive(Args)]
pub struct CreateQuarryOpts {
    #[arg(long)]
    pub rewarder: Option<Pubkey>,

    /// Stake token mint.
    #[arg(long)]
    pub stake: Pubkey,

    /// Quarry creator keypair, when it is not the wallet.
    #[arg(long)]
    pub admin: Option<InputKeypair>,

    /// Rent payer: keypair file or plain address.
    #[arg(long)]
    pub rent_payer: Option<InputPubkey>,

    /// Smart wallet proposer keypair.
    #[arg(long)]
    pub proposer: Option<InputKeypair>,

    /// Log the would-be proposal instead of creating it.
    #[arg(long)]
    pub log_only: bool,

    /// Leave the proposal for wallet members to review, never auto-execute.
    #[arg(long)]
    pub community: bool,
}

#[derive(Args)]
pub struct SetRewardsOpts {
    #[arg(long)]
    pub rewarder: Option<Pubkey>,

    /// Quarry share as mint:weight; repeatable.
    #[arg(long = "share", value_name = "MINT:WEIGHT")]
    pub shares: Vec<ShareArg>,

    #[arg(long)]
    pub rewards_per_share: Option<u64>,

    #[arg(long)]
    pub total_rewards: Option<u64>,

    /// Figures are per day.
    #[arg(long)]
    pub daily: bool,

    /// Figures are per week.
    #[arg(long)]
    pub weekly: bool,

    /// Figures are per year (the default).
    #[arg(long)]
    pub annual: bool,

    #[arg(long)]
    pub share_allocator: Option<InputKeypair>,

    #[arg(long)]
    pub rate_setter: Option<InputKeypair>,

    #[arg(long)]
    pub rent_payer: Option<InputKeypair>,

    #[arg(long)]
    pub proposer: Option<InputKeypair>,

    #[arg(long)]
    pub log_only: bool,

    #[arg(long)]
    pub community: bool,
}

#[derive(Args)]
pub struct CreateOperatorOpts {
    #[arg(long)]
    pub rewarder: Option<Pubkey>,

    /// Base keypair the operator address is derived from.
    #[arg(long)]
    pub base: InputKeypair,

    /// Role admin; defaults to the wallet.
    #[arg(long)]
    pub admin: Option<Pubkey>,
}

#[derive(Args)]
pub struct CreateMultisigOpts {
    #[arg(long)]
    pub threshold: u64,

    #[arg(required = true)]
    pub owners: Vec<Pubkey>,

    /// Base keypair the wallet address is derived from; generated when
    /// omitted.
    #[arg(long)]
    pub base: Option<InputKeypair>,
}

#[derive(Args)]
pub struct WalletTransactionOpts {
    #[arg(long)]
    pub wallet: Pubkey,

    /// Stored transaction index.
    #[arg(long)]
    pub index: u64,

    /// Owner keypair; defaults to the wallet keypair.
    #[arg(long)]
    pub owner: Option<InputKeypair>,
}

#[derive(Args)]
pub struct TransferAuthorityOpts {
    #[arg(long)]
    pub rewarder: Option<Pubkey>,

    #[arg(long)]
    pub new_authority: Pubkey,

    /// Current authority keypair, when it is not the wallet.
    #[arg(long)]
    pub admin: Option<InputKeypair>,
}

#[derive(Args)]
pub struct AcceptAuthorityOpts {
    #[arg(long)]
    pub rewarder: Option<Pubkey>,

    /// Pending authority keypair, when it is not the wallet.
    #[arg(long)]
    pub authority: Option<InputKeypair>,
}

#[derive(Args)]
pub struct ShowRewarderOpts {
    #[arg(long)]
    pub rewarder: Option<Pubkey>,
}

/// `mint:weight` pair from `--share`.
#[derive(Clone, Debug)]
pub struct ShareArg {
    pub mint: Pubkey,
    pub weight: u64,
}

impl FromStr for ShareArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mint, weight) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("expected MINT:WEIGHT, got {}", s))?;
        Ok(ShareArg {
            mint: Pubkey::from_str(mint)?,
            weight: weight.parse()?,
        })
    }
}
