//! Anchor-compatible discriminators for instruction data and account state.
//!
//! The external programs this crate talks to are Anchor programs: every
//! instruction's data starts with the 8-byte sighash of `global:<name>` and
//! every account starts with the 8-byte sighash of `account:<Name>`.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::hash;
use solana_sdk::pubkey::Pubkey;

/// Discriminator of an instruction named `name` (snake case).
pub fn instruction_sighash(name: &str) -> [u8; 8] {
    sighash("global", name)
}

/// Discriminator of an account struct named `name` (camel case).
pub fn account_discriminator(name: &str) -> [u8; 8] {
    sighash("account", name)
}

fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let preimage = format!("{}:{}", namespace, name);

    let mut result = [0u8; 8];
    result.copy_from_slice(&hash::hash(preimage.as_bytes()).to_bytes()[..8]);
    result
}

/// Instruction data made of the sighash alone (no arguments).
pub fn instruction_data(name: &str) -> Vec<u8> {
    instruction_sighash(name).to_vec()
}

/// Instruction data made of the sighash followed by borsh-encoded arguments.
pub fn instruction_data_with<T: BorshSerialize>(name: &str, args: &T) -> Vec<u8> {
    let mut data = instruction_data(name);
    data.extend(
        args.try_to_vec()
            .expect("borsh serialization of instruction arguments cannot fail"),
    );
    data
}

/// A typed view over an Anchor account owned by a known program.
pub trait ProgramAccount: BorshDeserialize + Sized {
    /// The Anchor struct name, as hashed into the discriminator.
    const ACCOUNT_NAME: &'static str;
    /// The program that owns accounts of this type.
    const OWNER: Pubkey;

    /// Parses raw account contents. `None` when the owner or the
    /// discriminator does not match, or the payload does not parse; absence
    /// of a matching record is a normal branch for callers, not an error.
    fn try_from_account(owner: &Pubkey, data: &[u8]) -> Option<Self> {
        if owner != &Self::OWNER || data.len() < 8 {
            return None;
        }
        if data[..8] != account_discriminator(Self::ACCOUNT_NAME)[..] {
            return None;
        }
        // Anchor allocations may carry trailing padding, so the payload is
        // allowed to be longer than the borsh encoding.
        Self::deserialize(&mut &data[8..]).ok()
    }

    /// Serializes the account the way it appears on chain.
    fn to_account_data(&self) -> Vec<u8>
    where
        Self: BorshSerialize,
    {
        let mut data = account_discriminator(Self::ACCOUNT_NAME).to_vec();
        data.extend(
            self.try_to_vec()
                .expect("borsh serialization of account state cannot fail"),
        );
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(BorshSerialize, BorshDeserialize, Debug, PartialEq, Eq)]
    struct Sample {
        owner: Pubkey,
        value: u64,
    }

    impl ProgramAccount for Sample {
        const ACCOUNT_NAME: &'static str = "Sample";
        const OWNER: Pubkey = solana_sdk::pubkey!("QMNeHCGYnLVDn1icRAfQZpjPLBNkfGbSKRB83G5d8KB");
    }

    #[test]
    fn test_sighash_is_namespaced() {
        assert_ne!(
            instruction_sighash("create_quarry_v2"),
            account_discriminator("create_quarry_v2")
        );
        assert_ne!(
            instruction_sighash("set_rewards_share"),
            instruction_sighash("set_annual_rewards")
        );
    }

    #[test]
    fn test_instruction_data_layout() {
        let data = instruction_data_with("set_annual_rewards", &42u64);
        assert_eq!(data.len(), 16);
        assert_eq!(data[..8], instruction_sighash("set_annual_rewards"));
        assert_eq!(u64::try_from_slice(&data[8..]).unwrap(), 42);
    }

    #[test]
    fn test_account_round_trip() {
        let sample = Sample {
            owner: Pubkey::new_unique(),
            value: 7,
        };
        let data = sample.to_account_data();
        assert_eq!(
            Sample::try_from_account(&Sample::OWNER, &data),
            Some(Sample {
                owner: sample.owner,
                value: 7
            })
        );
        // Wrong owner and wrong discriminator are both "not this account".
        assert_eq!(Sample::try_from_account(&Pubkey::new_unique(), &data), None);
        assert_eq!(Sample::try_from_account(&Sample::OWNER, &data[1..]), None);
    }

    #[test]
    fn test_trailing_padding_is_tolerated() {
        let sample = Sample {
            owner: Pubkey::new_unique(),
            value: 1,
        };
        let mut data = sample.to_account_data();
        data.extend([0u8; 100]);
        assert!(Sample::try_from_account(&Sample::OWNER, &data).is_some());
    }
}
