//! Client for the quarry-operator program: the delegation record splitting a
//! rewarder authority into independently assignable roles, and the
//! delegate-call instruction set routed through it.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

use crate::instruction_data::{instruction_data, instruction_data_with, ProgramAccount};
use crate::programs::mine;

pub const ID: Pubkey = solana_sdk::pubkey!("QoP6NfrQbaGnccXQrMLUkog2tQZ4C1RFgJcwDnT8Kmz");

/// The operator record. Its own address is the rewarder's recorded
/// authority; the three role fields are what actions are routed through.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Operator {
    pub base: Pubkey,
    pub bump: u8,
    pub rewarder: Pubkey,
    /// Can reassign the roles below.
    pub admin: Pubkey,
    pub rate_setter: Pubkey,
    pub quarry_creator: Pubkey,
    pub share_allocator: Pubkey,
    pub last_modified_ts: i64,
    pub generation: u64,
}

impl Operator {
    pub const LEN: usize = 32 + 1 + 32 + 32 + 32 + 32 + 32 + 8 + 8;
}

impl ProgramAccount for Operator {
    const ACCOUNT_NAME: &'static str = "Operator";
    const OWNER: Pubkey = ID;
}

pub fn find_operator_address(base: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"Operator", base.as_ref()], &ID)
}

/// Accounts shared by every delegate call: operator, the signing delegate in
/// one of its roles, the rewarder, and the quarry-mine program.
fn with_delegate(operator: &Pubkey, delegate: &Pubkey, rewarder: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(*operator, false),
        AccountMeta::new_readonly(*delegate, true),
        AccountMeta::new(*rewarder, false),
        AccountMeta::new_readonly(mine::ID, false),
    ]
}

/// Creates the operator record and accepts the rewarder authority. The
/// rewarder's pending authority must already point at the operator PDA.
pub fn create_operator_v2(
    base: &Pubkey,
    rewarder: &Pubkey,
    admin: &Pubkey,
    payer: &Pubkey,
) -> Instruction {
    let (operator, _) = find_operator_address(base);
    Instruction {
        program_id: ID,
        accounts: vec![
            AccountMeta::new_readonly(*base, true),
            AccountMeta::new(operator, false),
            AccountMeta::new(*rewarder, false),
            AccountMeta::new_readonly(*admin, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(mine::ID, false),
        ],
        data: instruction_data("create_operator_v2"),
    }
}

pub fn delegate_create_quarry_v2(
    operator: &Pubkey,
    delegate: &Pubkey,
    rewarder: &Pubkey,
    token_mint: &Pubkey,
    payer: &Pubkey,
) -> Instruction {
    let (quarry, _) = mine::find_quarry_address(rewarder, token_mint);
    let mut accounts = with_delegate(operator, delegate, rewarder);
    accounts.extend([
        AccountMeta::new(quarry, false),
        AccountMeta::new_readonly(*token_mint, false),
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(system_program::ID, false),
    ]);
    Instruction {
        program_id: ID,
        accounts,
        data: instruction_data("delegate_create_quarry_v2"),
    }
}

pub fn delegate_set_annual_rewards(
    operator: &Pubkey,
    delegate: &Pubkey,
    rewarder: &Pubkey,
    new_rate: u64,
) -> Instruction {
    Instruction {
        program_id: ID,
        accounts: with_delegate(operator, delegate, rewarder),
        data: instruction_data_with("delegate_set_annual_rewards", &new_rate),
    }
}

pub fn delegate_set_rewards_share(
    operator: &Pubkey,
    delegate: &Pubkey,
    rewarder: &Pubkey,
    quarry: &Pubkey,
    new_share: u64,
) -> Instruction {
    let mut accounts = with_delegate(operator, delegate, rewarder);
    accounts.push(AccountMeta::new(*quarry, false));
    Instruction {
        program_id: ID,
        accounts,
        data: instruction_data_with("delegate_set_rewards_share", &new_share),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction_data::instruction_sighash;

    #[test]
    fn test_state_len() {
        assert_eq!(
            Operator::default().try_to_vec().unwrap().len(),
            Operator::LEN
        );
    }

    #[test]
    fn test_operator_round_trip() {
        let operator = Operator {
            admin: Pubkey::new_unique(),
            rate_setter: Pubkey::new_unique(),
            quarry_creator: Pubkey::new_unique(),
            share_allocator: Pubkey::new_unique(),
            ..Default::default()
        };
        let data = operator.to_account_data();
        assert_eq!(Operator::try_from_account(&ID, &data), Some(operator));
        // Owned by the wrong program it is not an operator.
        assert_eq!(Operator::try_from_account(&mine::ID, &data), None);
    }

    #[test]
    fn test_delegate_create_quarry_v2_shape() {
        let operator = Pubkey::new_unique();
        let delegate = Pubkey::new_unique();
        let rewarder = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let payer = Pubkey::new_unique();

        let ix = delegate_create_quarry_v2(&operator, &delegate, &rewarder, &mint, &payer);
        assert_eq!(ix.program_id, ID);
        assert_eq!(ix.data, instruction_sighash("delegate_create_quarry_v2"));
        assert_eq!(ix.accounts.len(), 8);
        // The delegated role signs, never the operator record itself.
        assert!(ix.accounts[1].is_signer);
        assert_eq!(ix.accounts[1].pubkey, delegate);
        assert!(!ix.accounts[0].is_signer);
        assert_eq!(
            ix.accounts[4].pubkey,
            mine::find_quarry_address(&rewarder, &mint).0
        );
    }

    #[test]
    fn test_delegate_set_rewards_share_appends_quarry() {
        let quarry = Pubkey::new_unique();
        let ix = delegate_set_rewards_share(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &quarry,
            17,
        );
        assert_eq!(ix.accounts.len(), 5);
        assert_eq!(ix.accounts[4].pubkey, quarry);
        assert_eq!(u64::try_from_slice(&ix.data[8..]).unwrap(), 17);
    }
}
