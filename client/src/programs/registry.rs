//! Client for the quarry-registry program, which mirrors the set of active
//! quarry mints per rewarder so frontends can locate them.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

use crate::instruction_data::{instruction_data, instruction_data_with, ProgramAccount};

pub const ID: Pubkey = solana_sdk::pubkey!("QREGBnEj9Sa5uR91AV8u3FxThgP5ZCvdZUW2bHAkfNc");

/// Default registry capacity when one is provisioned on the fly.
pub const DEFAULT_MAX_QUARRIES: u16 = 256;

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Registry {
    pub bump: u8,
    pub rewarder: Pubkey,
    pub tokens: Vec<Pubkey>,
}

impl ProgramAccount for Registry {
    const ACCOUNT_NAME: &'static str = "Registry";
    const OWNER: Pubkey = ID;
}

pub fn find_registry_address(rewarder: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"QuarryRegistry", rewarder.as_ref()], &ID)
}

#[derive(BorshSerialize)]
struct NewRegistryArgs {
    max_quarries: u16,
    bump: u8,
}

pub fn new_registry(max_quarries: u16, rewarder: &Pubkey, payer: &Pubkey) -> Instruction {
    let (registry, bump) = find_registry_address(rewarder);
    Instruction {
        program_id: ID,
        accounts: vec![
            AccountMeta::new_readonly(*rewarder, false),
            AccountMeta::new(registry, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data: instruction_data_with("new_registry", &NewRegistryArgs { max_quarries, bump }),
    }
}

pub fn sync_quarry(quarry: &Pubkey, registry: &Pubkey) -> Instruction {
    Instruction {
        program_id: ID,
        accounts: vec![
            AccountMeta::new_readonly(*quarry, false),
            AccountMeta::new(*registry, false),
        ],
        data: instruction_data("sync_quarry"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction_data::instruction_sighash;

    #[test]
    fn test_registry_round_trip_with_padding() {
        let registry = Registry {
            bump: 250,
            rewarder: Pubkey::new_unique(),
            tokens: vec![Pubkey::new_unique(), Pubkey::default()],
        };
        // Registry accounts are allocated with slack beyond the encoding.
        let mut data = registry.to_account_data();
        data.extend([0u8; 100]);
        assert_eq!(Registry::try_from_account(&ID, &data), Some(registry));
    }

    #[test]
    fn test_new_registry_args() {
        let rewarder = Pubkey::new_unique();
        let payer = Pubkey::new_unique();
        let ix = new_registry(256, &rewarder, &payer);
        let (registry, bump) = find_registry_address(&rewarder);

        assert_eq!(ix.data[..8], instruction_sighash("new_registry"));
        assert_eq!(ix.data[8..10], 256u16.to_le_bytes());
        assert_eq!(ix.data[10], bump);
        assert_eq!(ix.accounts[1].pubkey, registry);
        assert!(ix.accounts[2].is_signer);
    }
}
