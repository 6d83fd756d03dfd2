//! Keyfile and address argument types for the command line.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;
use quarry_admin_client::service::RentPayer;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair, Signature, Signer};
use solana_sdk::signer::SignerError;

/// A signing keypair loaded from a (tilde-expanded) file path.
#[derive(Clone)]
pub struct InputKeypair {
    path: String,
    keypair: Arc<Keypair>,
}

impl InputKeypair {
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn as_signer(&self) -> Rc<dyn Signer> {
        Rc::new(SharedKeypair(self.keypair.clone()))
    }
}

impl fmt::Debug for InputKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputKeypair({}, {})", self.path, self.pubkey())
    }
}

impl FromStr for InputKeypair {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = shellexpand::tilde(s).into_owned();
        let keypair = read_keypair_file(&path)
            .map_err(|err| anyhow!("could not read keypair {}: {}", path, err))?;
        Ok(Self {
            path,
            keypair: Arc::new(keypair),
        })
    }
}

/// Bridges the clap-friendly [Arc<Keypair>] to envelope code that wants an
/// [Rc<dyn Signer>].
struct SharedKeypair(Arc<Keypair>);

impl Signer for SharedKeypair {
    fn try_pubkey(&self) -> Result<Pubkey, SignerError> {
        self.0.try_pubkey()
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        self.0.try_sign_message(message)
    }

    fn is_interactive(&self) -> bool {
        self.0.is_interactive()
    }
}

/// Either a plain address or a keypair file.
#[derive(Clone, Debug)]
pub enum InputPubkey {
    Pubkey(Pubkey),
    Keypair(InputKeypair),
}

impl InputPubkey {
    pub fn to_rent_payer(&self) -> RentPayer {
        match self {
            InputPubkey::Pubkey(address) => RentPayer::Address(*address),
            InputPubkey::Keypair(keypair) => RentPayer::Signer(keypair.as_signer()),
        }
    }
}

impl FromStr for InputPubkey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if let Ok(pubkey) = Pubkey::from_str(s) {
            Self::Pubkey(pubkey)
        } else {
            Self::Keypair(InputKeypair::from_str(s)?)
        })
    }
}
