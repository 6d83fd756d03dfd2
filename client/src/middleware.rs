//! Smart wallet middleware: when a resolved role authority is an N-of-M
//! wallet, instruction batches are not submitted directly but rewrapped into
//! stored wallet-transaction proposals.

use std::rc::Rc;

use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signer;

use crate::envelope::{TransactionEnvelope, MAX_TRANSACTION_SIZE};
use crate::error::AdminError;
use crate::programs::smart_wallet::{
    self, find_transaction_address, SmartWallet, TxInstruction,
};
use crate::resolver::{Role, RoleAuthority};

pub struct MultisigMiddleware {
    pub role: Role,
    wallet_address: Pubkey,
    /// Wallet state as read at install time. `num_transactions` advances
    /// locally as proposals are packed so consecutive applications (or two
    /// roles sharing one wallet) never collide on an index.
    wallet: SmartWallet,
    proposer: Pubkey,
    proposer_signer: Option<Rc<dyn Signer>>,
    rent_payer: Pubkey,
    rent_payer_signer: Option<Rc<dyn Signer>>,
    log_only: bool,
    community: bool,
}

/// Installs a middleware entry for `role` when its resolved authority is a
/// smart wallet. Returns the index of the (possibly shared) entry, or `None`
/// when the authority needs no wrapping. The proposer defaults to the payer
/// and must be a wallet owner.
#[allow(clippy::too_many_arguments)]
pub fn install_middleware(
    middleware: &mut Vec<MultisigMiddleware>,
    role: Role,
    authority: &RoleAuthority,
    payer: &Rc<dyn Signer>,
    proposer: Option<Rc<dyn Signer>>,
    rent_payer: Option<Rc<dyn Signer>>,
    log_only: bool,
    community: bool,
) -> Result<Option<usize>, AdminError> {
    let (address, wallet) = match authority {
        RoleAuthority::Direct(_) => return Ok(None),
        RoleAuthority::Multisig { address, wallet } => (*address, wallet.clone()),
    };

    // Two roles backed by the same wallet share one middleware entry so
    // their proposals draw from one index sequence.
    if let Some(existing) = middleware
        .iter()
        .position(|entry| entry.wallet_address == address)
    {
        return Ok(Some(existing));
    }

    let proposer_key = proposer
        .as_ref()
        .map(|signer| signer.pubkey())
        .unwrap_or_else(|| payer.pubkey());
    if !wallet.is_owner(&proposer_key) {
        return Err(AdminError::NotWalletOwner {
            wallet: address,
            supplied: proposer_key,
        });
    }

    let rent_payer_key = rent_payer
        .as_ref()
        .map(|signer| signer.pubkey())
        .unwrap_or_else(|| payer.pubkey());

    middleware.push(MultisigMiddleware {
        role,
        wallet_address: address,
        wallet,
        proposer: proposer_key,
        proposer_signer: proposer,
        rent_payer: rent_payer_key,
        rent_payer_signer: rent_payer,
        log_only,
        community,
    });
    Ok(Some(middleware.len() - 1))
}

impl MultisigMiddleware {
    pub fn wallet_address(&self) -> Pubkey {
        self.wallet_address
    }

    /// The threshold is already met by the proposer's own recorded approval,
    /// so the stored transaction can execute in the same breath. Community
    /// proposals are always left for members to review.
    fn auto_execute(&self) -> bool {
        !self.community && self.wallet.threshold <= 1
    }

    /// Rewraps `env` into one or more new-transaction proposals, greedily
    /// trimming from the full remaining batch down to a prefix that fits the
    /// transaction size budget. The returned envelope contains only calls on
    /// the wallet program; the wrapped instructions run later, when the
    /// stored transactions are executed.
    pub fn apply(&mut self, env: TransactionEnvelope) -> Result<TransactionEnvelope, AdminError> {
        if env.is_empty() {
            return Ok(env);
        }
        if self.log_only {
            println!(
                "Would propose to smart wallet {} ({} instructions):",
                self.wallet_address,
                env.instructions().len()
            );
            println!("{}", env.dump_base64()?);
            return Ok(TransactionEnvelope::new(env.payer_signer()));
        }

        let inner_signers = env.signers().to_vec();
        let mut remaining: Vec<Instruction> = env.instructions().to_vec();
        let mut out = TransactionEnvelope::new(env.payer_signer());

        while !remaining.is_empty() {
            let mut take = remaining.len();
            let proposal = loop {
                let candidate = self.proposal_envelope(&env, &remaining[..take]);
                if candidate.fits_one_transaction()? {
                    break candidate;
                }
                if take == 1 {
                    return Err(AdminError::SizeBudgetExceeded {
                        size: candidate.serialized_size()?,
                        limit: MAX_TRANSACTION_SIZE,
                    });
                }
                take -= 1;
            };

            let index = self.wallet.num_transactions;
            let (transaction, _) = find_transaction_address(&self.wallet_address, index);
            println!(
                "Creating smart wallet transaction #{} {} ({} of {} instructions)",
                index,
                transaction,
                take,
                remaining.len()
            );
            out = out.combine(proposal);
            self.wallet.num_transactions += 1;
            remaining.drain(..take);
        }

        if self.auto_execute() {
            // Executing in the same transaction replays the inner accounts,
            // so the inner signers still have to sign.
            for signer in inner_signers {
                out.add_signer(signer);
            }
        }
        Ok(out)
    }

    fn proposal_envelope(
        &self,
        env: &TransactionEnvelope,
        instructions: &[Instruction],
    ) -> TransactionEnvelope {
        let index = self.wallet.num_transactions;
        let inner: Vec<TxInstruction> = instructions.iter().map(TxInstruction::from).collect();

        let mut proposal = TransactionEnvelope::new(env.payer_signer());
        proposal.push(smart_wallet::new_transaction(
            &self.wallet_address,
            index,
            &self.proposer,
            &self.rent_payer,
            inner.clone(),
        ));
        if let Some(signer) = &self.proposer_signer {
            proposal.add_signer(signer.clone());
        }
        if let Some(signer) = &self.rent_payer_signer {
            proposal.add_signer(signer.clone());
        }
        if self.auto_execute() {
            let (transaction, _) = find_transaction_address(&self.wallet_address, index);
            proposal.push(smart_wallet::execute_transaction(
                &self.wallet_address,
                &transaction,
                &self.proposer,
                &inner,
            ));
        }
        proposal
    }
}
