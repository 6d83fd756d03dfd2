//! Client for the quarry-mine program: rewarder and quarry state plus the
//! direct (authority-signed) instruction set.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

use crate::instruction_data::{instruction_data, instruction_data_with, ProgramAccount};

pub const ID: Pubkey = solana_sdk::pubkey!("QMNeHCGYnLVDn1icRAfQZpjPLBNkfGbSKRB83G5d8KB");

/// Controls token rewards distribution to all quarries. The single
/// `authority` field is what the resolver classifies.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rewarder {
    pub base: Pubkey,
    pub bump: u8,
    pub authority: Pubkey,
    pub pending_authority: Pubkey,
    pub num_quarries: u16,
    pub annual_rewards_rate: u64,
    pub total_rewards_shares: u64,
    pub mint_wrapper: Pubkey,
    pub rewards_token_mint: Pubkey,
    pub claim_fee_token_account: Pubkey,
    pub max_claim_fee_millibps: u64,
    pub pause_authority: Pubkey,
    pub is_paused: bool,
}

impl Rewarder {
    pub const LEN: usize = 32 + 1 + 32 + 32 + 2 + 8 + 8 + 32 + 32 + 32 + 8 + 32 + 1;
}

impl ProgramAccount for Rewarder {
    const ACCOUNT_NAME: &'static str = "Rewarder";
    const OWNER: Pubkey = ID;
}

/// A pool distributing a share of its rewarder's emission to one stake mint.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Quarry {
    pub rewarder: Pubkey,
    pub token_mint_key: Pubkey,
    pub bump: u8,
    pub index: u16,
    pub token_mint_decimals: u8,
    pub famine_ts: i64,
    pub last_update_ts: i64,
    pub rewards_per_token_stored: u128,
    pub annual_rewards_rate: u64,
    pub rewards_share: u64,
    pub total_tokens_deposited: u64,
    pub num_miners: u64,
}

impl Quarry {
    pub const LEN: usize = 32 + 32 + 1 + 2 + 1 + 8 + 8 + 16 + 8 + 8 + 8 + 8;

    /// Byte offset of the `rewarder` field inside the account, for memcmp
    /// filtering (right behind the 8-byte discriminator).
    pub const REWARDER_OFFSET: usize = 8;
}

impl ProgramAccount for Quarry {
    const ACCOUNT_NAME: &'static str = "Quarry";
    const OWNER: Pubkey = ID;
}

pub fn find_quarry_address(rewarder: &Pubkey, token_mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"Quarry", rewarder.as_ref(), token_mint.as_ref()], &ID)
}

/// The annual rate a quarry ends up with for a given share, mirroring the
/// program's own computation. Used for change previews and display only.
pub fn quarry_annual_rate(
    annual_rewards_rate: u64,
    rewards_share: u64,
    total_rewards_shares: u64,
) -> u64 {
    if total_rewards_shares == 0 || annual_rewards_rate == 0 || rewards_share == 0 {
        return 0;
    }
    let rate = (annual_rewards_rate as u128) * (rewards_share as u128)
        / (total_rewards_shares as u128);
    // The quotient is bounded by annual_rewards_rate.
    rate as u64
}

pub fn create_quarry_v2(
    rewarder: &Pubkey,
    authority: &Pubkey,
    token_mint: &Pubkey,
    payer: &Pubkey,
) -> Instruction {
    let (quarry, _) = find_quarry_address(rewarder, token_mint);
    Instruction {
        program_id: ID,
        accounts: vec![
            AccountMeta::new(quarry, false),
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*rewarder, false),
            AccountMeta::new_readonly(*token_mint, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data: instruction_data("create_quarry_v2"),
    }
}

pub fn set_annual_rewards(rewarder: &Pubkey, authority: &Pubkey, new_rate: u64) -> Instruction {
    Instruction {
        program_id: ID,
        accounts: vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*rewarder, false),
        ],
        data: instruction_data_with("set_annual_rewards", &new_rate),
    }
}

pub fn set_rewards_share(
    rewarder: &Pubkey,
    authority: &Pubkey,
    quarry: &Pubkey,
    new_share: u64,
) -> Instruction {
    Instruction {
        program_id: ID,
        accounts: vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*rewarder, false),
            AccountMeta::new(*quarry, false),
        ],
        data: instruction_data_with("set_rewards_share", &new_share),
    }
}

pub fn transfer_authority(
    rewarder: &Pubkey,
    authority: &Pubkey,
    new_authority: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: ID,
        accounts: vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*rewarder, false),
        ],
        data: instruction_data_with("transfer_authority", new_authority),
    }
}

pub fn accept_authority(rewarder: &Pubkey, pending_authority: &Pubkey) -> Instruction {
    Instruction {
        program_id: ID,
        accounts: vec![
            AccountMeta::new_readonly(*pending_authority, true),
            AccountMeta::new(*rewarder, false),
        ],
        data: instruction_data("accept_authority"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction_data::instruction_sighash;

    #[test]
    fn test_state_len() {
        assert_eq!(
            Rewarder::default().try_to_vec().unwrap().len(),
            Rewarder::LEN
        );
        assert_eq!(Quarry::default().try_to_vec().unwrap().len(), Quarry::LEN);
    }

    #[test]
    fn test_rewarder_account_round_trip() {
        let rewarder = Rewarder {
            authority: Pubkey::new_unique(),
            num_quarries: 3,
            annual_rewards_rate: 1_000_000,
            total_rewards_shares: 1_000,
            ..Default::default()
        };
        let data = rewarder.to_account_data();
        assert_eq!(Rewarder::try_from_account(&ID, &data), Some(rewarder));
        assert_eq!(Quarry::try_from_account(&ID, &data), None);
    }

    #[test]
    fn test_create_quarry_v2_shape() {
        let rewarder = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let payer = Pubkey::new_unique();

        let ix = create_quarry_v2(&rewarder, &authority, &mint, &payer);
        assert_eq!(ix.program_id, ID);
        assert_eq!(ix.data, instruction_sighash("create_quarry_v2"));
        assert_eq!(ix.accounts.len(), 6);
        assert_eq!(ix.accounts[0].pubkey, find_quarry_address(&rewarder, &mint).0);
        // The rewarder authority and the payer are the only signers.
        let signers: Vec<Pubkey> = ix
            .accounts
            .iter()
            .filter(|meta| meta.is_signer)
            .map(|meta| meta.pubkey)
            .collect();
        assert_eq!(signers, vec![authority, payer]);
    }

    #[test]
    fn test_set_rewards_share_args() {
        let ix = set_rewards_share(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            9_000,
        );
        assert_eq!(ix.data[..8], instruction_sighash("set_rewards_share"));
        assert_eq!(u64::try_from_slice(&ix.data[8..]).unwrap(), 9_000);
        assert!(ix.accounts[0].is_signer);
        assert!(ix.accounts[1].is_writable);
        assert!(ix.accounts[2].is_writable);
    }

    #[test]
    fn test_quarry_annual_rate_is_proportional() {
        // Integer shares summing to 1000 at a 1,000,000 total rate.
        let shares = [43u64, 10, 345, 29, 287, 76, 22, 17, 81, 90];
        let total: u64 = shares.iter().sum();
        assert_eq!(total, 1_000);

        assert_eq!(quarry_annual_rate(1_000_000, shares[0], total), 43_000);
        let distributed: u64 = shares
            .iter()
            .map(|share| quarry_annual_rate(1_000_000, *share, total))
            .sum();
        assert_eq!(distributed, 1_000_000);
    }

    #[test]
    fn test_quarry_annual_rate_zero_cases() {
        assert_eq!(quarry_annual_rate(0, 10, 100), 0);
        assert_eq!(quarry_annual_rate(100, 0, 100), 0);
        assert_eq!(quarry_annual_rate(100, 10, 0), 0);
    }
}
