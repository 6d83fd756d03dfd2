//! Thin layer over the ledger RPC: typed account reads, bounded polling for
//! read-side convergence, and the simulation/submission driver.

use std::rc::Rc;
use std::thread;
use std::time::Duration;

use solana_account_decoder::UiAccountEncoding;
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_config::{
    RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcSimulateTransactionConfig,
};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Signature, Signer};

use crate::envelope::TransactionEnvelope;
use crate::error::AdminError;
use crate::instruction_data::ProgramAccount;
use crate::programs::mine::{self, Quarry};
use crate::resolver::AccountSource;

/// Bounded total wait for read-side convergence, with a fixed retry step.
const WAIT_TIMEOUT_MS: u64 = 40_000;
const WAIT_STEP_MS: u64 = 250;

pub struct ChainGateway {
    rpc: RpcClient,
    payer: Rc<dyn Signer>,
    commitment: CommitmentConfig,
}

impl ChainGateway {
    pub fn new(url: String, payer: Rc<dyn Signer>, commitment: CommitmentConfig) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(url, commitment),
            payer,
            commitment,
        }
    }

    pub fn payer(&self) -> Rc<dyn Signer> {
        self.payer.clone()
    }

    pub fn payer_pubkey(&self) -> Pubkey {
        self.payer.pubkey()
    }

    /// A fresh envelope with this gateway's payer as the fee payer.
    pub fn envelope(&self) -> TransactionEnvelope {
        TransactionEnvelope::new(self.payer.clone())
    }

    /// Raw account read as `(owner, data)`. `None` when the account does not
    /// exist, which callers treat as a normal branch.
    pub fn account(&self, address: &Pubkey) -> Result<Option<(Pubkey, Vec<u8>)>, AdminError> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.commitment)?;
        Ok(response
            .value
            .map(|account| (account.owner, account.data)))
    }

    pub fn fetch<T: ProgramAccount>(&self, address: &Pubkey) -> Result<Option<T>, AdminError> {
        Ok(self
            .account(address)?
            .and_then(|(owner, data)| T::try_from_account(&owner, &data)))
    }

    pub fn expect<T: ProgramAccount>(&self, address: &Pubkey) -> Result<T, AdminError> {
        self.fetch(address)?.ok_or(AdminError::AccountNotFound {
            kind: T::ACCOUNT_NAME,
            address: *address,
        })
    }

    /// All quarries of a rewarder, in index order.
    pub fn quarries_of(&self, rewarder: &Pubkey) -> Result<Vec<(Pubkey, Quarry)>, AdminError> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![
                RpcFilterType::DataSize((8 + Quarry::LEN) as u64),
                RpcFilterType::Memcmp(Memcmp::new_raw_bytes(
                    Quarry::REWARDER_OFFSET,
                    rewarder.to_bytes().to_vec(),
                )),
            ]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment),
                ..Default::default()
            },
            ..Default::default()
        };
        let accounts = self
            .rpc
            .get_program_accounts_with_config(&mine::ID, config)?;

        let mut quarries: Vec<(Pubkey, Quarry)> = accounts
            .into_iter()
            .filter_map(|(address, account)| {
                Quarry::try_from_account(&account.owner, &account.data)
                    .map(|quarry| (address, quarry))
            })
            .collect();
        quarries.sort_by_key(|(_, quarry)| quarry.index);
        Ok(quarries)
    }

    /// Dry-runs every partition in order without touching chain state,
    /// returning the simulated logs per partition. A program-level failure
    /// aborts with the full log output.
    pub fn dry_run(&self, env: &TransactionEnvelope) -> Result<Vec<Vec<String>>, AdminError> {
        let mut output = Vec::new();
        for part in env.partition()? {
            let tx = part.unsigned_transaction();
            let config = RpcSimulateTransactionConfig {
                sig_verify: false,
                replace_recent_blockhash: true,
                commitment: Some(self.commitment),
                ..Default::default()
            };
            let result = self.rpc.simulate_transaction_with_config(&tx, config)?.value;
            let logs = result.logs.unwrap_or_default();
            if let Some(err) = result.err {
                return Err(AdminError::SimulationError { err, logs });
            }
            output.push(logs);
        }
        Ok(output)
    }

    /// Confirms every partition strictly in series; later partitions may
    /// depend on state created by earlier ones. A failure surfaces the
    /// signatures that already landed; there is no rollback.
    pub fn submit(&self, env: &TransactionEnvelope) -> Result<Vec<Signature>, AdminError> {
        let mut confirmed = Vec::new();
        for (index, part) in env.partition()?.iter().enumerate() {
            let blockhash = self.rpc.get_latest_blockhash().map_err(AdminError::from)?;
            let tx = part.signed_transaction(blockhash)?;
            match self.rpc.send_and_confirm_transaction(&tx) {
                Ok(signature) => {
                    println!("Tx: {}", signature);
                    confirmed.push(signature);
                }
                Err(source) => {
                    return Err(AdminError::SubmissionError {
                        confirmed,
                        failed_partition: index,
                        source: Box::new(source),
                    })
                }
            }
        }
        Ok(confirmed)
    }

    /// The driver: dry-run and print logs, or submit and confirm.
    pub fn process(&self, env: &TransactionEnvelope, simulate: bool) -> Result<(), AdminError> {
        if env.is_empty() {
            log::info!("nothing to submit");
            return Ok(());
        }
        if simulate {
            for logs in self.dry_run(env)? {
                for line in logs {
                    println!("{}", line);
                }
            }
        } else {
            self.submit(env)?;
        }
        Ok(())
    }

    /// Polls until `address` becomes visible. The wait is bounded; reaching
    /// the bound is a [AdminError::ResolutionTimeout], distinct from a
    /// submission failure since the write may well have landed.
    pub fn wait_for_account(&self, address: &Pubkey) -> Result<(Pubkey, Vec<u8>), AdminError> {
        let mut waited_ms = 0u64;
        loop {
            if let Some(account) = self.account(address)? {
                return Ok(account);
            }
            if waited_ms >= WAIT_TIMEOUT_MS {
                return Err(AdminError::ResolutionTimeout {
                    account: *address,
                    waited_ms,
                });
            }
            thread::sleep(Duration::from_millis(WAIT_STEP_MS));
            waited_ms += WAIT_STEP_MS;
        }
    }

    pub fn wait_for<T: ProgramAccount>(&self, address: &Pubkey) -> Result<T, AdminError> {
        let (owner, data) = self.wait_for_account(address)?;
        T::try_from_account(&owner, &data).ok_or(AdminError::AccountNotFound {
            kind: T::ACCOUNT_NAME,
            address: *address,
        })
    }
}

impl AccountSource for ChainGateway {
    fn account(&self, address: &Pubkey) -> Result<Option<(Pubkey, Vec<u8>)>, AdminError> {
        ChainGateway::account(self, address)
    }
}
