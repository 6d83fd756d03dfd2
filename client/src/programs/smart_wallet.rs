//! Client for the Goki-style smart wallet program: an N-of-M approval wallet
//! that stores proposed transactions and releases them for execution once
//! threshold approvals are collected.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

use crate::instruction_data::{instruction_data, instruction_data_with, ProgramAccount};

pub const ID: Pubkey = solana_sdk::pubkey!("GokivDYuQXPZCWRkwMhdH2h91KpDQXBEmpgBgs55bnpH");

/// The wallet itself. Its own address is what resources record as their
/// authority; inner instructions are signed by it at execution time.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SmartWallet {
    pub base: Pubkey,
    pub bump: u8,
    /// Number of approvals required to execute a stored transaction.
    pub threshold: u64,
    pub minimum_delay: i64,
    pub grace_period: i64,
    /// Bumped on every owner-set change; stale approvals are invalidated.
    pub owner_set_seqno: u32,
    /// Monotonically increasing count, which is also the next index.
    pub num_transactions: u64,
    pub owners: Vec<Pubkey>,
    pub reserved: [u64; 16],
}

impl SmartWallet {
    pub fn is_owner(&self, key: &Pubkey) -> bool {
        self.owners.contains(key)
    }
}

impl ProgramAccount for SmartWallet {
    const ACCOUNT_NAME: &'static str = "SmartWallet";
    const OWNER: Pubkey = ID;
}

/// A stored pending transaction, addressed by `(smart_wallet, index)`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletTransaction {
    pub smart_wallet: Pubkey,
    pub index: u64,
    pub bump: u8,
    pub proposer: Pubkey,
    pub instructions: Vec<TxInstruction>,
    /// Approval bitmap, one entry per wallet owner. The proposer's entry is
    /// set at creation.
    pub signers: Vec<bool>,
    pub owner_set_seqno: u32,
    pub eta: i64,
    pub executor: Pubkey,
    pub executed_at: i64,
}

impl WalletTransaction {
    pub fn num_approvals(&self) -> usize {
        self.signers.iter().filter(|approved| **approved).count()
    }

    pub fn is_executed(&self) -> bool {
        self.executed_at >= 0 && self.executor != Pubkey::default()
    }
}

impl ProgramAccount for WalletTransaction {
    const ACCOUNT_NAME: &'static str = "Transaction";
    const OWNER: Pubkey = ID;
}

/// One instruction as stored inside a [WalletTransaction].
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TxInstruction {
    pub program_id: Pubkey,
    pub keys: Vec<TxAccountMeta>,
    pub data: Vec<u8>,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxAccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl From<&Instruction> for TxInstruction {
    fn from(ix: &Instruction) -> Self {
        TxInstruction {
            program_id: ix.program_id,
            keys: ix
                .accounts
                .iter()
                .map(|meta| TxAccountMeta {
                    pubkey: meta.pubkey,
                    is_signer: meta.is_signer,
                    is_writable: meta.is_writable,
                })
                .collect(),
            data: ix.data.clone(),
        }
    }
}

pub fn find_smart_wallet_address(base: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"GokiSmartWallet", base.as_ref()], &ID)
}

pub fn find_transaction_address(smart_wallet: &Pubkey, index: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            b"GokiTransaction",
            smart_wallet.as_ref(),
            &index.to_le_bytes(),
        ],
        &ID,
    )
}

#[derive(BorshSerialize)]
struct CreateSmartWalletArgs {
    bump: u8,
    max_owners: u8,
    owners: Vec<Pubkey>,
    threshold: u64,
    minimum_delay: i64,
}

pub fn create_smart_wallet(
    base: &Pubkey,
    payer: &Pubkey,
    max_owners: u8,
    owners: Vec<Pubkey>,
    threshold: u64,
) -> Instruction {
    let (smart_wallet, bump) = find_smart_wallet_address(base);
    Instruction {
        program_id: ID,
        accounts: vec![
            AccountMeta::new_readonly(*base, true),
            AccountMeta::new(smart_wallet, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data: instruction_data_with(
            "create_smart_wallet",
            &CreateSmartWalletArgs {
                bump,
                max_owners,
                owners,
                threshold,
                minimum_delay: 0,
            },
        ),
    }
}

#[derive(BorshSerialize)]
struct NewTransactionArgs {
    bump: u8,
    instructions: Vec<TxInstruction>,
}

/// Stores `instructions` as the wallet's pending transaction at `index`.
/// The proposer must be a wallet owner; its approval is recorded at creation.
pub fn new_transaction(
    smart_wallet: &Pubkey,
    index: u64,
    proposer: &Pubkey,
    payer: &Pubkey,
    instructions: Vec<TxInstruction>,
) -> Instruction {
    let (transaction, bump) = find_transaction_address(smart_wallet, index);
    Instruction {
        program_id: ID,
        accounts: vec![
            AccountMeta::new(*smart_wallet, false),
            AccountMeta::new(transaction, false),
            AccountMeta::new_readonly(*proposer, true),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data: instruction_data_with("new_transaction", &NewTransactionArgs { bump, instructions }),
    }
}

pub fn approve(smart_wallet: &Pubkey, transaction: &Pubkey, owner: &Pubkey) -> Instruction {
    Instruction {
        program_id: ID,
        accounts: vec![
            AccountMeta::new_readonly(*smart_wallet, false),
            AccountMeta::new(*transaction, false),
            AccountMeta::new_readonly(*owner, true),
        ],
        data: instruction_data("approve"),
    }
}

/// Executes a stored transaction. Every account touched by the inner
/// instructions rides along as a remaining account, with the wallet itself
/// demoted to non-signer (the program signs for it with its PDA seeds), plus
/// each inner program id.
pub fn execute_transaction(
    smart_wallet: &Pubkey,
    transaction: &Pubkey,
    owner: &Pubkey,
    instructions: &[TxInstruction],
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new_readonly(*smart_wallet, false),
        AccountMeta::new(*transaction, false),
        AccountMeta::new_readonly(*owner, true),
    ];
    for ix in instructions {
        for key in &ix.keys {
            accounts.push(AccountMeta {
                pubkey: key.pubkey,
                is_signer: if key.pubkey == *smart_wallet {
                    false
                } else {
                    key.is_signer
                },
                is_writable: key.is_writable,
            });
        }
        accounts.push(AccountMeta::new_readonly(ix.program_id, false));
    }
    Instruction {
        program_id: ID,
        accounts,
        data: instruction_data("execute_transaction"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet_with_owners(owners: Vec<Pubkey>) -> SmartWallet {
        SmartWallet {
            threshold: 2,
            owners,
            ..Default::default()
        }
    }

    #[test]
    fn test_transaction_addresses_differ_by_index() {
        let wallet = Pubkey::new_unique();
        let (a, _) = find_transaction_address(&wallet, 0);
        let (b, _) = find_transaction_address(&wallet, 1);
        assert_ne!(a, b);
        assert_eq!(a, find_transaction_address(&wallet, 0).0);
    }

    #[test]
    fn test_wallet_round_trip() {
        let wallet = wallet_with_owners(vec![Pubkey::new_unique(), Pubkey::new_unique()]);
        let data = wallet.to_account_data();
        assert_eq!(SmartWallet::try_from_account(&ID, &data), Some(wallet));
    }

    #[test]
    fn test_new_transaction_signers() {
        let wallet = Pubkey::new_unique();
        let proposer = Pubkey::new_unique();
        let payer = Pubkey::new_unique();
        let ix = new_transaction(&wallet, 3, &proposer, &payer, vec![]);

        assert_eq!(ix.accounts[1].pubkey, find_transaction_address(&wallet, 3).0);
        let signers: Vec<Pubkey> = ix
            .accounts
            .iter()
            .filter(|meta| meta.is_signer)
            .map(|meta| meta.pubkey)
            .collect();
        assert_eq!(signers, vec![proposer, payer]);
    }

    #[test]
    fn test_execute_demotes_wallet_signer() {
        let wallet = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let inner = TxInstruction {
            program_id: Pubkey::new_unique(),
            keys: vec![
                TxAccountMeta {
                    pubkey: wallet,
                    is_signer: true,
                    is_writable: false,
                },
                TxAccountMeta {
                    pubkey: Pubkey::new_unique(),
                    is_signer: true,
                    is_writable: true,
                },
            ],
            data: vec![1, 2, 3],
        };
        let (transaction, _) = find_transaction_address(&wallet, 0);
        let ix = execute_transaction(&wallet, &transaction, &owner, &[inner.clone()]);

        // wallet demoted, other signer untouched, program id appended
        assert!(!ix.accounts[3].is_signer);
        assert_eq!(ix.accounts[3].pubkey, wallet);
        assert!(ix.accounts[4].is_signer);
        assert_eq!(ix.accounts[5].pubkey, inner.program_id);
    }

    #[test]
    fn test_num_approvals() {
        let tx = WalletTransaction {
            signers: vec![true, false, true],
            ..Default::default()
        };
        assert_eq!(tx.num_approvals(), 2);
    }
}
