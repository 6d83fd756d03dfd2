//! Client library for administering Quarry rewarders whose authority may be
//! a plain keypair, an operator delegation record, or an N-of-M smart
//! wallet. The CLI crate is a thin option-parsing layer over
//! [service::AdminService].

pub mod config;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod instruction_data;
pub mod middleware;
pub mod programs;
pub mod resolver;
pub mod service;

use std::rc::Rc;

use anyhow::{anyhow, Result};
use solana_sdk::signature::{read_keypair_file, Keypair, Signer};

use config::AdminConfig;
use gateway::ChainGateway;
use service::AdminService;

pub use error::AdminError;

/// Reads the wallet keypair behind a (tilde-expanded) path.
pub fn load_payer(path: &str) -> Result<Keypair> {
    let path = &*shellexpand::tilde(path);
    read_keypair_file(path).map_err(|err| anyhow!("could not read keypair {}: {}", path, err))
}

pub fn load_service(config: &AdminConfig, payer: Rc<dyn Signer>) -> AdminService {
    AdminService {
        gateway: ChainGateway::new(config.cluster_url(), payer, config.commitment()),
    }
}
