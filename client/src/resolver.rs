//! Resolution of a resource's recorded authority into one of three routing
//! variants: a plain account, an operator delegation record, or a smart
//! wallet. Absence of a record at a probe is a normal branch, never an error.

use std::collections::HashMap;
use std::fmt;

use solana_sdk::pubkey::Pubkey;

use crate::error::AdminError;
use crate::instruction_data::ProgramAccount;
use crate::programs::operator::Operator;
use crate::programs::smart_wallet::SmartWallet;

/// The administrative role an authority is being resolved for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    QuarryCreator,
    RateSetter,
    ShareAllocator,
    Proposer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::QuarryCreator => "quarry creator",
            Role::RateSetter => "rate setter",
            Role::ShareAllocator => "share allocator",
            Role::Proposer => "proposer",
        };
        f.write_str(name)
    }
}

/// Read access to raw accounts, as `(owner, data)`. Implemented by the RPC
/// gateway and by in-memory maps in tests.
pub trait AccountSource {
    fn account(&self, address: &Pubkey) -> Result<Option<(Pubkey, Vec<u8>)>, AdminError>;
}

impl AccountSource for HashMap<Pubkey, (Pubkey, Vec<u8>)> {
    fn account(&self, address: &Pubkey) -> Result<Option<(Pubkey, Vec<u8>)>, AdminError> {
        Ok(self.get(address).cloned())
    }
}

/// What a resource's recorded authority turned out to be.
#[derive(Clone, Debug)]
pub enum Authority {
    /// A plain account; the holder of the matching key signs directly.
    Direct(Pubkey),
    /// An operator delegation record; actions route through delegate calls.
    Operator { address: Pubkey, record: Operator },
    /// An N-of-M smart wallet; actions become stored pending transactions.
    Multisig { address: Pubkey, wallet: SmartWallet },
}

impl Authority {
    pub fn address(&self) -> Pubkey {
        match self {
            Authority::Direct(address) => *address,
            Authority::Operator { address, .. } => *address,
            Authority::Multisig { address, .. } => *address,
        }
    }

    pub fn operator(&self) -> Option<(&Pubkey, &Operator)> {
        match self {
            Authority::Operator { address, record } => Some((address, record)),
            _ => None,
        }
    }

    /// The address empowered to act in `role`. For an operator this is the
    /// matching sub-authority; otherwise the authority itself.
    pub fn role_address(&self, role: Role) -> Pubkey {
        match self {
            Authority::Operator { record, .. } => match role {
                Role::QuarryCreator => record.quarry_creator,
                Role::RateSetter => record.rate_setter,
                Role::ShareAllocator => record.share_allocator,
                Role::Admin | Role::Proposer => record.admin,
            },
            other => other.address(),
        }
    }
}

/// A role authority is itself either a plain account or a smart wallet;
/// operators never nest.
#[derive(Clone, Debug)]
pub enum RoleAuthority {
    Direct(Pubkey),
    Multisig { address: Pubkey, wallet: SmartWallet },
}

impl RoleAuthority {
    pub fn address(&self) -> Pubkey {
        match self {
            RoleAuthority::Direct(address) => *address,
            RoleAuthority::Multisig { address, .. } => *address,
        }
    }
}

/// Classifies `address` with a single account read: operator record first,
/// then smart wallet, else a plain account. Only transport failures
/// propagate.
pub fn resolve<S: AccountSource>(source: &S, address: Pubkey) -> Result<Authority, AdminError> {
    if let Some((owner, data)) = source.account(&address)? {
        if let Some(record) = Operator::try_from_account(&owner, &data) {
            return Ok(Authority::Operator { address, record });
        }
        if let Some(wallet) = SmartWallet::try_from_account(&owner, &data) {
            return Ok(Authority::Multisig { address, wallet });
        }
    }
    Ok(Authority::Direct(address))
}

/// Classifies a role sub-authority: smart wallet or plain account.
pub fn resolve_role<S: AccountSource>(
    source: &S,
    address: Pubkey,
) -> Result<RoleAuthority, AdminError> {
    if let Some((owner, data)) = source.account(&address)? {
        if let Some(wallet) = SmartWallet::try_from_account(&owner, &data) {
            return Ok(RoleAuthority::Multisig { address, wallet });
        }
    }
    Ok(RoleAuthority::Direct(address))
}

/// Resolves the authority empowered to act in `role` on a resource whose
/// overall authority already resolved to `authority`.
pub fn resolve_role_authority<S: AccountSource>(
    source: &S,
    authority: &Authority,
    role: Role,
) -> Result<RoleAuthority, AdminError> {
    match authority {
        Authority::Direct(address) => Ok(RoleAuthority::Direct(*address)),
        Authority::Multisig { address, wallet } => Ok(RoleAuthority::Multisig {
            address: *address,
            wallet: wallet.clone(),
        }),
        Authority::Operator { .. } => resolve_role(source, authority.role_address(role)),
    }
}

/// The local precondition check: an explicitly supplied signer must hold the
/// key the resolved role expects. Runs before any instruction is built.
pub fn ensure_role_signer(
    role: Role,
    expected: Pubkey,
    supplied: Option<Pubkey>,
) -> Result<(), AdminError> {
    match supplied {
        Some(supplied) if supplied != expected => Err(AdminError::AuthorityMismatch {
            role,
            supplied,
            expected,
        }),
        _ => Ok(()),
    }
}
