//! Error taxonomy of the administration engine.

use solana_client::client_error::ClientError;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::signer::SignerError;
use solana_sdk::transaction::TransactionError;
use thiserror::Error;

use crate::resolver::Role;

#[derive(Error, Debug)]
pub enum AdminError {
    /// A supplied signer does not match the resolved authority for its role.
    /// Raised before any instruction is built or submitted.
    #[error("wrong {role} {supplied}, expected {expected}")]
    AuthorityMismatch {
        role: Role,
        supplied: Pubkey,
        expected: Pubkey,
    },

    /// A direct role authority that nobody present can sign for.
    #[error("{role} {authority} signature is required")]
    SignerRequired { role: Role, authority: Pubkey },

    /// The designated proposer is not a member of the target smart wallet.
    #[error("proposer {supplied} is not an owner of smart wallet {wallet}")]
    NotWalletOwner { wallet: Pubkey, supplied: Pubkey },

    /// Not even a single-instruction prefix fits the transaction size budget.
    #[error("transaction of {size} bytes exceeds the {limit} byte budget and cannot be split further")]
    SizeBudgetExceeded { size: usize, limit: usize },

    /// The ledger reported a program-level failure during a dry run.
    #[error("simulation failed: {err}\n{}", .logs.join("\n"))]
    SimulationError {
        err: TransactionError,
        logs: Vec<String>,
    },

    /// Confirmation failed after submission. Partitions confirmed before the
    /// failure have landed and stay landed; the operator resumes manually.
    #[error(
        "submission failed at partition {failed_partition} ({} already confirmed: {confirmed:?}): {source}",
        .confirmed.len()
    )]
    SubmissionError {
        confirmed: Vec<Signature>,
        failed_partition: usize,
        source: Box<ClientError>,
    },

    /// A post-submission poll never converged. Distinct from
    /// [AdminError::SubmissionError]: the transaction may well have landed.
    #[error("account {account} did not become visible within {waited_ms} ms")]
    ResolutionTimeout { account: Pubkey, waited_ms: u64 },

    #[error("{kind} account {address} not found")]
    AccountNotFound {
        kind: &'static str,
        address: Pubkey,
    },

    #[error("rewarder pending authority is {actual}, expected operator {expected}")]
    PendingAuthorityNotSet { expected: Pubkey, actual: Pubkey },

    #[error("threshold {threshold} is invalid for {owners} owners")]
    InvalidThreshold { threshold: u64, owners: usize },

    #[error("transaction has {have} of {need} required approvals")]
    ThresholdNotMet { have: usize, need: u64 },

    #[error("total rewards rate overflows u64")]
    RateOverflow,

    /// Only possible on an internal routing bug: an envelope was submitted
    /// directly while requiring a signature nobody attached.
    #[error("no signer available for required account {address}")]
    MissingSigner { address: Pubkey },

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Serialization(#[from] bincode::Error),

    #[error(transparent)]
    Rpc(Box<ClientError>),
}

impl From<ClientError> for AdminError {
    fn from(err: ClientError) -> Self {
        AdminError::Rpc(Box::new(err))
    }
}
