use std::rc::Rc;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};

use quarry_admin_client::config::{self, AdminConfig};
use quarry_admin_client::service::{AdminService, CreateQuarryParams, SetRewardsParams};

use cli::{Job, Opts};

mod cli;
mod keys;

fn main() -> Result<()> {
    solana_logger::setup_with_default("solana=info");
    let opts = Opts::parse();

    let mut config = config::load(&opts.config)?;
    if let Some(cluster) = opts.cluster {
        config.cluster = cluster;
    }
    if let Some(commitment) = &opts.commitment {
        config.commitment = CommitmentConfig::from_str(commitment)?.commitment;
    }
    if let Some(keypair) = opts.keypair {
        config.wallet = keypair;
    }

    let payer: Rc<dyn Signer> = Rc::new(quarry_admin_client::load_payer(&config.wallet)?);
    let service = quarry_admin_client::load_service(&config, payer);
    run_job(opts.job, &service, &config, opts.simulate)
}

fn run_job(job: Job, service: &AdminService, config: &AdminConfig, simulate: bool) -> Result<()> {
    match job {
        Job::CreateQuarry(cmd) => {
            let quarry = service.create_quarry(CreateQuarryParams {
                rewarder: rewarder_arg(cmd.rewarder, config)?,
                stake: cmd.stake,
                admin: cmd.admin.map(|keypair| keypair.as_signer()),
                rent_payer: cmd.rent_payer.map(|payer| payer.to_rent_payer()),
                proposer: cmd.proposer.map(|keypair| keypair.as_signer()),
                log_only: cmd.log_only,
                community: cmd.community,
                simulate,
            })?;
            println!("Quarry: {}", quarry);
        }
        Job::SetRewards(cmd) => {
            let multiplier = match (cmd.daily, cmd.weekly, cmd.annual) {
                (true, false, false) => 365,
                (false, true, false) => 52,
                (false, false, _) => 1,
                _ => bail!("Only one of daily, weekly and annual must be set"),
            };
            service.set_rewards(SetRewardsParams {
                rewarder: rewarder_arg(cmd.rewarder, config)?,
                shares: cmd
                    .shares
                    .iter()
                    .map(|share| (share.mint, share.weight))
                    .collect(),
                rewards_per_share: cmd.rewards_per_share,
                total_rewards: cmd.total_rewards,
                multiplier,
                share_allocator: cmd.share_allocator.map(|keypair| keypair.as_signer()),
                rate_setter: cmd.rate_setter.map(|keypair| keypair.as_signer()),
                rent_payer: cmd.rent_payer.map(|keypair| keypair.as_signer()),
                proposer: cmd.proposer.map(|keypair| keypair.as_signer()),
                log_only: cmd.log_only,
                community: cmd.community,
                simulate,
            })?;
        }
        Job::CreateOperator(cmd) => {
            let operator = service.create_operator(
                rewarder_arg(cmd.rewarder, config)?,
                cmd.base.as_signer(),
                cmd.admin,
                simulate,
            )?;
            println!("Operator: {}", operator);
        }
        Job::CreateMultisig(cmd) => {
            let base = match cmd.base {
                Some(keypair) => keypair.as_signer(),
                None => {
                    let generated = Keypair::new();
                    println!("Wallet base: {}", generated.pubkey());
                    Rc::new(generated) as Rc<dyn Signer>
                }
            };
            let wallet =
                service.create_smart_wallet(base, cmd.threshold, cmd.owners, simulate)?;
            println!("Smart wallet: {}", wallet);
        }
        Job::Approve(cmd) => {
            service.approve(
                cmd.wallet,
                cmd.index,
                cmd.owner.map(|keypair| keypair.as_signer()),
                simulate,
            )?;
        }
        Job::Execute(cmd) => {
            service.execute(
                cmd.wallet,
                cmd.index,
                cmd.owner.map(|keypair| keypair.as_signer()),
                simulate,
            )?;
        }
        Job::TransferAuthority(cmd) => {
            service.transfer_authority(
                rewarder_arg(cmd.rewarder, config)?,
                cmd.new_authority,
                cmd.admin.map(|keypair| keypair.as_signer()),
                simulate,
            )?;
        }
        Job::AcceptAuthority(cmd) => {
            service.accept_authority(
                rewarder_arg(cmd.rewarder, config)?,
                cmd.authority.map(|keypair| keypair.as_signer()),
                simulate,
            )?;
        }
        Job::ShowRewarder(cmd) => {
            service.show_rewarder(rewarder_arg(cmd.rewarder, config)?)?;
        }
    }
    Ok(())
}

fn rewarder_arg(arg: Option<Pubkey>, config: &AdminConfig) -> Result<Pubkey> {
    arg.or(config.rewarder)
        .ok_or_else(|| anyhow!("--rewarder is required (none configured)"))
}
