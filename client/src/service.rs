//! Business logic built on top of the program clients: the create-quarry and
//! set-rewards flows, and the explicit create/maintenance actions for
//! operators and smart wallets.

use std::collections::BTreeMap;
use std::rc::Rc;

use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signer;

use crate::error::AdminError;
use crate::gateway::ChainGateway;
use crate::middleware::{install_middleware, MultisigMiddleware};
use crate::programs::smart_wallet::{self, SmartWallet, WalletTransaction};
use crate::programs::{mine, operator, registry};
use crate::resolver::{self, Authority, Role, RoleAuthority};

pub struct AdminService {
    pub gateway: ChainGateway,
}

/// Rent payer for record creation: a funding address, or a keypair that also
/// signs.
#[derive(Clone)]
pub enum RentPayer {
    Address(Pubkey),
    Signer(Rc<dyn Signer>),
}

impl RentPayer {
    pub fn pubkey(&self) -> Pubkey {
        match self {
            RentPayer::Address(address) => *address,
            RentPayer::Signer(signer) => signer.pubkey(),
        }
    }

    fn signer(&self) -> Option<Rc<dyn Signer>> {
        match self {
            RentPayer::Address(_) => None,
            RentPayer::Signer(signer) => Some(signer.clone()),
        }
    }
}

pub struct CreateQuarryParams {
    pub rewarder: Pubkey,
    pub stake: Pubkey,
    pub admin: Option<Rc<dyn Signer>>,
    pub rent_payer: Option<RentPayer>,
    pub proposer: Option<Rc<dyn Signer>>,
    pub log_only: bool,
    pub community: bool,
    pub simulate: bool,
}

pub struct SetRewardsParams {
    pub rewarder: Pubkey,
    pub shares: Vec<(Pubkey, u64)>,
    pub rewards_per_share: Option<u64>,
    pub total_rewards: Option<u64>,
    /// Period multiplier: 365 for daily figures, 52 for weekly, 1 for annual.
    pub multiplier: u64,
    pub share_allocator: Option<Rc<dyn Signer>>,
    pub rate_setter: Option<Rc<dyn Signer>>,
    pub rent_payer: Option<Rc<dyn Signer>>,
    pub proposer: Option<Rc<dyn Signer>>,
    pub log_only: bool,
    pub community: bool,
    pub simulate: bool,
}

/// How a role's instructions get their authority signature.
enum RoleRouting {
    /// The payer is the authority and signs anyway.
    Payer,
    /// An explicitly supplied keypair, already validated against the role.
    Signed(Rc<dyn Signer>),
    /// A smart wallet; the group is rewrapped by the middleware at `usize`.
    Wallet(usize),
}

impl AdminService {
    /// Creates a quarry for a stake mint on a rewarder, routing through the
    /// operator delegate call and/or a smart wallet proposal as the resolved
    /// authority demands. Returns the quarry address.
    pub fn create_quarry(&self, params: CreateQuarryParams) -> Result<Pubkey, AdminError> {
        let gateway = &self.gateway;
        let rewarder: mine::Rewarder = gateway.expect(&params.rewarder)?;
        let authority = resolver::resolve(gateway, rewarder.authority)?;
        let creator = resolver::resolve_role_authority(gateway, &authority, Role::QuarryCreator)?;

        // Local precondition, checked before any instruction is built.
        resolver::ensure_role_signer(
            Role::QuarryCreator,
            creator.address(),
            params.admin.as_ref().map(|signer| signer.pubkey()),
        )?;

        let mut middleware: Vec<MultisigMiddleware> = Vec::new();
        let route = self.route_role(
            &mut middleware,
            Role::QuarryCreator,
            &creator,
            params.admin.clone(),
            params.proposer.clone(),
            params.rent_payer.as_ref().and_then(RentPayer::signer),
            params.log_only,
            params.community,
        )?;

        let rent_payer_key = params
            .rent_payer
            .as_ref()
            .map(RentPayer::pubkey)
            .unwrap_or_else(|| gateway.payer_pubkey());
        let (quarry, _) = mine::find_quarry_address(&params.rewarder, &params.stake);
        let (registry_key, _) = registry::find_registry_address(&params.rewarder);

        // Main group: the quarry creation followed by the registry sync.
        let mut main = gateway.envelope();
        match authority.operator() {
            Some((operator_key, _)) => main.push(operator::delegate_create_quarry_v2(
                operator_key,
                &creator.address(),
                &params.rewarder,
                &params.stake,
                &rent_payer_key,
            )),
            None => main.push(mine::create_quarry_v2(
                &params.rewarder,
                &creator.address(),
                &params.stake,
                &rent_payer_key,
            )),
        }
        main.push(registry::sync_quarry(&quarry, &registry_key));
        if let Some(RentPayer::Signer(signer)) = &params.rent_payer {
            main.add_signer(signer.clone());
        }
        if let RoleRouting::Signed(signer) = &route {
            main.add_signer(signer.clone());
        }

        // Registry provisioning precedes the main group and never needs the
        // rewarder authority, so it stays outside any wallet proposal.
        let mut prelude = gateway.envelope();
        if gateway.fetch::<registry::Registry>(&registry_key)?.is_none() {
            println!("Creating rewarder registry");
            prelude.push(registry::new_registry(
                registry::DEFAULT_MAX_QUARRIES,
                &params.rewarder,
                &gateway.payer_pubkey(),
            ));
        }

        // Preflight the unwrapped batch; a program error aborts here.
        let preview = prelude.clone().combine(main.clone());
        let logs = gateway.dry_run(&preview)?;
        if params.simulate {
            for partition_logs in logs {
                for line in partition_logs {
                    println!("{}", line);
                }
            }
        }

        let mut routed = main;
        if let RoleRouting::Wallet(index) = &route {
            routed = middleware[*index].apply(routed)?;
        }
        if params.simulate {
            return Ok(quarry);
        }

        let full = prelude.combine(routed);
        if full.is_empty() {
            return Ok(quarry);
        }
        gateway.submit(&full)?;

        if matches!(route, RoleRouting::Payer | RoleRouting::Signed(_)) {
            let created: mine::Quarry = gateway.wait_for(&quarry)?;
            log::info!(
                "created quarry #{} for mint {}",
                created.index,
                created.token_mint_key
            );
        }
        Ok(quarry)
    }

    /// Applies share and rate changes to a rewarder. Only quarries whose
    /// live share differs from the requested one are touched; running the
    /// same shares twice emits nothing the second time.
    pub fn set_rewards(&self, params: SetRewardsParams) -> Result<(), AdminError> {
        let gateway = &self.gateway;
        let rewarder: mine::Rewarder = gateway.expect(&params.rewarder)?;
        let quarries = gateway.quarries_of(&params.rewarder)?;

        for (mint, _) in &params.shares {
            if !quarries.iter().any(|(_, quarry)| quarry.token_mint_key == *mint) {
                log::warn!("no quarry for mint {} on rewarder {}", mint, params.rewarder);
            }
        }

        let share_map = merge_shares(&quarries, &params.shares);
        let updates = plan_share_updates(&quarries, &share_map);
        let total_rewards = compute_total_rewards(
            params.total_rewards,
            params.rewards_per_share,
            total_shares(&share_map)?,
            params.multiplier,
        )?;

        let authority = resolver::resolve(gateway, rewarder.authority)?;
        let share_authority =
            resolver::resolve_role_authority(gateway, &authority, Role::ShareAllocator)?;
        let rate_authority =
            resolver::resolve_role_authority(gateway, &authority, Role::RateSetter)?;

        // Both preconditions run before any instruction is built.
        resolver::ensure_role_signer(
            Role::ShareAllocator,
            share_authority.address(),
            params.share_allocator.as_ref().map(|signer| signer.pubkey()),
        )?;
        resolver::ensure_role_signer(
            Role::RateSetter,
            rate_authority.address(),
            params.rate_setter.as_ref().map(|signer| signer.pubkey()),
        )?;

        let mut middleware: Vec<MultisigMiddleware> = Vec::new();

        // Share update group.
        let mut share_env = gateway.envelope();
        let mut share_route = None;
        if !updates.is_empty() {
            let route = self.route_role(
                &mut middleware,
                Role::ShareAllocator,
                &share_authority,
                params.share_allocator.clone(),
                params.proposer.clone(),
                params.rent_payer.clone(),
                params.log_only,
                params.community,
            )?;
            for update in &updates {
                println!(
                    "Quarry for {} change share {} -> {}",
                    update.mint, update.current, update.target
                );
                share_env.push(share_update_instruction(
                    &params.rewarder,
                    &authority,
                    &share_authority.address(),
                    &update.quarry,
                    update.target,
                ));
            }
            if let RoleRouting::Signed(signer) = &route {
                share_env.add_signer(signer.clone());
            }
            share_route = Some(route);
        }

        // Rate update group, ordered after the share updates.
        let mut rate_env = gateway.envelope();
        let mut rate_route = None;
        if let Some(new_rate) = total_rewards {
            let route = self.route_role(
                &mut middleware,
                Role::RateSetter,
                &rate_authority,
                params.rate_setter.clone(),
                params.proposer.clone(),
                params.rent_payer.clone(),
                params.log_only,
                params.community,
            )?;
            println!(
                "Rewarder {} change annual rate {} -> {}",
                params.rewarder, rewarder.annual_rewards_rate, new_rate
            );
            rate_env.push(annual_rate_instruction(
                &params.rewarder,
                &authority,
                &rate_authority.address(),
                new_rate,
            ));
            if let RoleRouting::Signed(signer) = &route {
                rate_env.add_signer(signer.clone());
            }
            rate_route = Some(route);
        }

        if share_env.is_empty() && rate_env.is_empty() {
            println!("No reward changes to apply");
            return Ok(());
        }

        if let Some(RoleRouting::Wallet(index)) = share_route {
            share_env = middleware[index].apply(share_env)?;
        }
        if let Some(RoleRouting::Wallet(index)) = rate_route {
            rate_env = middleware[index].apply(rate_env)?;
        }

        let full = share_env.combine(rate_env);
        gateway.process(&full, params.simulate)
    }

    /// Creates an operator record for a rewarder whose pending authority
    /// already points at the operator PDA, and accepts the authority.
    pub fn create_operator(
        &self,
        rewarder_key: Pubkey,
        base: Rc<dyn Signer>,
        admin: Option<Pubkey>,
        simulate: bool,
    ) -> Result<Pubkey, AdminError> {
        let gateway = &self.gateway;
        let rewarder: mine::Rewarder = gateway.expect(&rewarder_key)?;
        let (operator_key, _) = operator::find_operator_address(&base.pubkey());
        if rewarder.pending_authority != operator_key {
            return Err(AdminError::PendingAuthorityNotSet {
                expected: operator_key,
                actual: rewarder.pending_authority,
            });
        }

        let admin = admin.unwrap_or_else(|| gateway.payer_pubkey());
        let mut env = gateway.envelope();
        env.push(operator::create_operator_v2(
            &base.pubkey(),
            &rewarder_key,
            &admin,
            &gateway.payer_pubkey(),
        ));
        env.add_signer(base);
        gateway.process(&env, simulate)?;

        if !simulate {
            gateway.wait_for::<operator::Operator>(&operator_key)?;
        }
        Ok(operator_key)
    }

    /// Creates an N-of-M smart wallet. Returns the wallet address.
    pub fn create_smart_wallet(
        &self,
        base: Rc<dyn Signer>,
        threshold: u64,
        owners: Vec<Pubkey>,
        simulate: bool,
    ) -> Result<Pubkey, AdminError> {
        if threshold == 0 || threshold > owners.len() as u64 {
            return Err(AdminError::InvalidThreshold {
                threshold,
                owners: owners.len(),
            });
        }
        let gateway = &self.gateway;
        let (wallet, _) = smart_wallet::find_smart_wallet_address(&base.pubkey());
        // Leave room for the owner list to grow without reallocation.
        let max_owners = owners.len().saturating_add(5).min(u8::MAX as usize) as u8;

        let mut env = gateway.envelope();
        env.push(smart_wallet::create_smart_wallet(
            &base.pubkey(),
            &gateway.payer_pubkey(),
            max_owners,
            owners,
            threshold,
        ));
        env.add_signer(base);
        gateway.process(&env, simulate)?;

        if !simulate {
            gateway.wait_for::<SmartWallet>(&wallet)?;
        }
        Ok(wallet)
    }

    /// Approves a stored wallet transaction as one of the wallet owners.
    pub fn approve(
        &self,
        wallet_key: Pubkey,
        index: u64,
        owner: Option<Rc<dyn Signer>>,
        simulate: bool,
    ) -> Result<(), AdminError> {
        let gateway = &self.gateway;
        let wallet: SmartWallet = gateway.expect(&wallet_key)?;
        let (transaction_key, _) = smart_wallet::find_transaction_address(&wallet_key, index);
        // The proposal may have landed a heartbeat ago; wait for it to show.
        gateway.wait_for::<WalletTransaction>(&transaction_key)?;

        let signer = owner.unwrap_or_else(|| gateway.payer());
        if !wallet.is_owner(&signer.pubkey()) {
            return Err(AdminError::NotWalletOwner {
                wallet: wallet_key,
                supplied: signer.pubkey(),
            });
        }

        let mut env = gateway.envelope();
        env.push(smart_wallet::approve(
            &wallet_key,
            &transaction_key,
            &signer.pubkey(),
        ));
        env.add_signer(signer);
        gateway.process(&env, simulate)
    }

    /// Executes a stored wallet transaction once threshold approvals are in.
    pub fn execute(
        &self,
        wallet_key: Pubkey,
        index: u64,
        owner: Option<Rc<dyn Signer>>,
        simulate: bool,
    ) -> Result<(), AdminError> {
        let gateway = &self.gateway;
        let wallet: SmartWallet = gateway.expect(&wallet_key)?;
        let (transaction_key, _) = smart_wallet::find_transaction_address(&wallet_key, index);
        let stored: WalletTransaction = gateway.wait_for(&transaction_key)?;

        let have = stored.num_approvals();
        if (have as u64) < wallet.threshold {
            return Err(AdminError::ThresholdNotMet {
                have,
                need: wallet.threshold,
            });
        }

        let signer = owner.unwrap_or_else(|| gateway.payer());
        if !wallet.is_owner(&signer.pubkey()) {
            return Err(AdminError::NotWalletOwner {
                wallet: wallet_key,
                supplied: signer.pubkey(),
            });
        }

        let mut env = gateway.envelope();
        env.push(smart_wallet::execute_transaction(
            &wallet_key,
            &transaction_key,
            &signer.pubkey(),
            &stored.instructions,
        ));
        env.add_signer(signer);
        gateway.process(&env, simulate)
    }

    /// Nominates a new rewarder authority (two-step handover).
    pub fn transfer_authority(
        &self,
        rewarder_key: Pubkey,
        new_authority: Pubkey,
        admin: Option<Rc<dyn Signer>>,
        simulate: bool,
    ) -> Result<(), AdminError> {
        let gateway = &self.gateway;
        let rewarder: mine::Rewarder = gateway.expect(&rewarder_key)?;
        resolver::ensure_role_signer(
            Role::Admin,
            rewarder.authority,
            admin.as_ref().map(|signer| signer.pubkey()),
        )?;
        if admin.is_none() && rewarder.authority != gateway.payer_pubkey() {
            return Err(AdminError::SignerRequired {
                role: Role::Admin,
                authority: rewarder.authority,
            });
        }

        let mut env = gateway.envelope();
        env.push(mine::transfer_authority(
            &rewarder_key,
            &rewarder.authority,
            &new_authority,
        ));
        if let Some(signer) = admin {
            env.add_signer(signer);
        }
        gateway.process(&env, simulate)
    }

    /// Accepts a pending rewarder authority handover.
    pub fn accept_authority(
        &self,
        rewarder_key: Pubkey,
        authority: Option<Rc<dyn Signer>>,
        simulate: bool,
    ) -> Result<(), AdminError> {
        let gateway = &self.gateway;
        let rewarder: mine::Rewarder = gateway.expect(&rewarder_key)?;
        resolver::ensure_role_signer(
            Role::Admin,
            rewarder.pending_authority,
            authority.as_ref().map(|signer| signer.pubkey()),
        )?;
        if authority.is_none() && rewarder.pending_authority != gateway.payer_pubkey() {
            return Err(AdminError::SignerRequired {
                role: Role::Admin,
                authority: rewarder.pending_authority,
            });
        }

        let mut env = gateway.envelope();
        env.push(mine::accept_authority(
            &rewarder_key,
            &rewarder.pending_authority,
        ));
        if let Some(signer) = authority {
            env.add_signer(signer);
        }
        gateway.process(&env, simulate)
    }

    /// Prints a rewarder, its resolved authority variant and its quarries.
    pub fn show_rewarder(&self, rewarder_key: Pubkey) -> Result<(), AdminError> {
        let gateway = &self.gateway;
        let rewarder: mine::Rewarder = gateway.expect(&rewarder_key)?;
        let authority = resolver::resolve(gateway, rewarder.authority)?;

        println!("Rewarder {}", rewarder_key);
        println!("  annual rewards rate: {}", rewarder.annual_rewards_rate);
        println!("  total rewards shares: {}", rewarder.total_rewards_shares);
        println!("  quarries: {}", rewarder.num_quarries);
        println!("  paused: {}", rewarder.is_paused);
        match &authority {
            Authority::Direct(address) => println!("  authority: {} (direct)", address),
            Authority::Operator { address, record } => {
                println!("  authority: {} (operator)", address);
                println!("    admin: {}", record.admin);
                println!("    quarry creator: {}", record.quarry_creator);
                println!("    rate setter: {}", record.rate_setter);
                println!("    share allocator: {}", record.share_allocator);
            }
            Authority::Multisig { address, wallet } => {
                println!(
                    "  authority: {} (smart wallet, {}-of-{}, {} transactions)",
                    address,
                    wallet.threshold,
                    wallet.owners.len(),
                    wallet.num_transactions
                );
            }
        }

        for (address, quarry) in gateway.quarries_of(&rewarder_key)? {
            println!(
                "  quarry #{} {} mint {} share {} rate {}",
                quarry.index, address, quarry.token_mint_key, quarry.rewards_share,
                quarry.annual_rewards_rate
            );
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn route_role(
        &self,
        middleware: &mut Vec<MultisigMiddleware>,
        role: Role,
        authority: &RoleAuthority,
        explicit: Option<Rc<dyn Signer>>,
        proposer: Option<Rc<dyn Signer>>,
        rent_payer: Option<Rc<dyn Signer>>,
        log_only: bool,
        community: bool,
    ) -> Result<RoleRouting, AdminError> {
        if let Some(signer) = explicit {
            return Ok(RoleRouting::Signed(signer));
        }
        if let Some(index) = install_middleware(
            middleware,
            role,
            authority,
            &self.gateway.payer(),
            proposer,
            rent_payer,
            log_only,
            community,
        )? {
            return Ok(RoleRouting::Wallet(index));
        }
        if authority.address() == self.gateway.payer_pubkey() {
            return Ok(RoleRouting::Payer);
        }
        Err(AdminError::SignerRequired {
            role,
            authority: authority.address(),
        })
    }
}

/// One pending share change, in quarry index order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShareUpdate {
    pub quarry: Pubkey,
    pub mint: Pubkey,
    pub current: u64,
    pub target: u64,
}

/// Live shares per mint, overlaid with the requested overrides.
pub fn merge_shares(
    quarries: &[(Pubkey, mine::Quarry)],
    overrides: &[(Pubkey, u64)],
) -> BTreeMap<Pubkey, u64> {
    let mut map: BTreeMap<Pubkey, u64> = quarries
        .iter()
        .map(|(_, quarry)| (quarry.token_mint_key, quarry.rewards_share))
        .collect();
    for (mint, share) in overrides {
        map.insert(*mint, *share);
    }
    map
}

pub fn total_shares(shares: &BTreeMap<Pubkey, u64>) -> Result<u64, AdminError> {
    shares
        .values()
        .try_fold(0u64, |acc, share| acc.checked_add(*share))
        .ok_or(AdminError::RateOverflow)
}

/// The quarries whose live share differs from the requested one. Quarries
/// already at their target are skipped, so a re-run with identical shares
/// plans nothing.
pub fn plan_share_updates(
    quarries: &[(Pubkey, mine::Quarry)],
    shares: &BTreeMap<Pubkey, u64>,
) -> Vec<ShareUpdate> {
    quarries
        .iter()
        .filter_map(|(address, quarry)| {
            let target = *shares.get(&quarry.token_mint_key)?;
            (target != quarry.rewards_share).then_some(ShareUpdate {
                quarry: *address,
                mint: quarry.token_mint_key,
                current: quarry.rewards_share,
                target,
            })
        })
        .collect()
}

/// The target total annual rate: an explicit total, or per-share times the
/// total share weight; either is scaled by the period multiplier.
pub fn compute_total_rewards(
    total_rewards: Option<u64>,
    rewards_per_share: Option<u64>,
    total_shares: u64,
    multiplier: u64,
) -> Result<Option<u64>, AdminError> {
    let base = match (total_rewards, rewards_per_share) {
        (Some(total), _) => Some(total),
        (None, Some(per_share)) => Some(
            total_shares
                .checked_mul(per_share)
                .ok_or(AdminError::RateOverflow)?,
        ),
        (None, None) => None,
    };
    base.map(|rate| {
        rate.checked_mul(multiplier)
            .ok_or(AdminError::RateOverflow)
    })
    .transpose()
}

fn share_update_instruction(
    rewarder: &Pubkey,
    authority: &Authority,
    role_address: &Pubkey,
    quarry: &Pubkey,
    share: u64,
) -> Instruction {
    match authority.operator() {
        Some((operator_key, _)) => operator::delegate_set_rewards_share(
            operator_key,
            role_address,
            rewarder,
            quarry,
            share,
        ),
        None => mine::set_rewards_share(rewarder, role_address, quarry, share),
    }
}

fn annual_rate_instruction(
    rewarder: &Pubkey,
    authority: &Authority,
    role_address: &Pubkey,
    new_rate: u64,
) -> Instruction {
    match authority.operator() {
        Some((operator_key, _)) => {
            operator::delegate_set_annual_rewards(operator_key, role_address, rewarder, new_rate)
        }
        None => mine::set_annual_rewards(rewarder, role_address, new_rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::mine::quarry_annual_rate;

    fn quarry_fixture(shares: &[u64]) -> Vec<(Pubkey, mine::Quarry)> {
        shares
            .iter()
            .enumerate()
            .map(|(index, share)| {
                (
                    Pubkey::new_unique(),
                    mine::Quarry {
                        token_mint_key: Pubkey::new_unique(),
                        index: index as u16,
                        rewards_share: *share,
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_identical_shares_plan_nothing() {
        let quarries = quarry_fixture(&[5, 10, 0]);
        let overrides: Vec<(Pubkey, u64)> = quarries
            .iter()
            .map(|(_, quarry)| (quarry.token_mint_key, quarry.rewards_share))
            .collect();
        let map = merge_shares(&quarries, &overrides);
        assert!(plan_share_updates(&quarries, &map).is_empty());
    }

    #[test]
    fn test_only_changed_shares_are_planned() {
        let quarries = quarry_fixture(&[5, 10, 20]);
        let overrides = vec![(quarries[1].1.token_mint_key, 11u64)];
        let map = merge_shares(&quarries, &overrides);
        let updates = plan_share_updates(&quarries, &map);

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].quarry, quarries[1].0);
        assert_eq!(updates[0].current, 10);
        assert_eq!(updates[0].target, 11);
    }

    #[test]
    fn test_updates_follow_quarry_index_order() {
        let quarries = quarry_fixture(&[1, 2, 3, 4]);
        let overrides: Vec<(Pubkey, u64)> = quarries
            .iter()
            .map(|(_, quarry)| (quarry.token_mint_key, quarry.rewards_share + 1))
            .collect();
        let map = merge_shares(&quarries, &overrides);
        let updates = plan_share_updates(&quarries, &map);
        let order: Vec<Pubkey> = updates.iter().map(|update| update.quarry).collect();
        let expected: Vec<Pubkey> = quarries.iter().map(|(address, _)| *address).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_total_rewards_from_per_share() {
        // 1000 total shares at 1000 per share, annual.
        assert_eq!(
            compute_total_rewards(None, Some(1_000), 1_000, 1).unwrap(),
            Some(1_000_000)
        );
        // Explicit total wins over per-share.
        assert_eq!(
            compute_total_rewards(Some(7), Some(1_000), 1_000, 1).unwrap(),
            Some(7)
        );
        // Daily figures scale by 365.
        assert_eq!(
            compute_total_rewards(Some(10), None, 0, 365).unwrap(),
            Some(3_650)
        );
        assert_eq!(compute_total_rewards(None, None, 1_000, 365).unwrap(), None);
    }

    #[test]
    fn test_total_rewards_overflow_is_fatal() {
        assert!(matches!(
            compute_total_rewards(Some(u64::MAX), None, 0, 2),
            Err(AdminError::RateOverflow)
        ));
        assert!(matches!(
            compute_total_rewards(None, Some(u64::MAX), 2, 1),
            Err(AdminError::RateOverflow)
        ));
    }

    #[test]
    fn test_rate_distribution_round_trip() {
        // Shares summing to 1000 and a 1,000,000 total: each quarry's rate
        // is exactly its proportional cut.
        let shares = [43u64, 10, 345, 29, 287, 76, 22, 17, 81, 90];
        let quarries = quarry_fixture(&shares);
        let map = merge_shares(&quarries, &[]);
        let total = total_shares(&map).unwrap();
        assert_eq!(total, 1_000);

        let rate = compute_total_rewards(Some(1_000_000), None, total, 1)
            .unwrap()
            .unwrap();
        assert_eq!(quarry_annual_rate(rate, shares[0], total), 43_000);
        for (_, quarry) in &quarries {
            assert_eq!(
                quarry_annual_rate(rate, quarry.rewards_share, total),
                quarry.rewards_share * 1_000
            );
        }
    }

    #[test]
    fn test_reweighting_keeps_existing_total_rate() {
        // Weights summing to 10000 with no explicit total: each quarry ends
        // up at weight * existing_total / 10000.
        let existing_total: u64 = 123_456_789;
        let weights = [2_376u64, 2_387, 2_737, 2_500];
        let total: u64 = weights.iter().sum();
        assert_eq!(total, 10_000);

        assert_eq!(
            quarry_annual_rate(existing_total, weights[0], total),
            (existing_total as u128 * 2_376 / 10_000) as u64
        );
    }

    #[test]
    fn test_direct_vs_delegated_share_instruction() {
        let rewarder = Pubkey::new_unique();
        let quarry = Pubkey::new_unique();
        let role = Pubkey::new_unique();

        let direct = share_update_instruction(
            &rewarder,
            &Authority::Direct(role),
            &role,
            &quarry,
            5,
        );
        assert_eq!(direct.program_id, mine::ID);

        let operator_key = Pubkey::new_unique();
        let delegated = share_update_instruction(
            &rewarder,
            &Authority::Operator {
                address: operator_key,
                record: operator::Operator::default(),
            },
            &role,
            &quarry,
            5,
        );
        assert_eq!(delegated.program_id, operator::ID);
        assert_eq!(delegated.accounts[0].pubkey, operator_key);
    }

    #[test]
    fn test_direct_vs_delegated_rate_instruction() {
        let rewarder = Pubkey::new_unique();
        let role = Pubkey::new_unique();

        let direct = annual_rate_instruction(&rewarder, &Authority::Direct(role), &role, 9);
        assert_eq!(direct.program_id, mine::ID);
        // The rate setter, not the share allocator, signs the direct call.
        assert_eq!(direct.accounts[0].pubkey, role);
        assert!(direct.accounts[0].is_signer);

        let delegated = annual_rate_instruction(
            &rewarder,
            &Authority::Operator {
                address: Pubkey::new_unique(),
                record: operator::Operator::default(),
            },
            &role,
            9,
        );
        assert_eq!(delegated.program_id, operator::ID);
    }
}
