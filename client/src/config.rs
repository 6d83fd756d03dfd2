//! Process configuration: an explicit struct constructed once at startup and
//! passed into the engine, never ambient global state.

use std::io::ErrorKind;

use serde::Deserialize;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::pubkey::Pubkey;

use anyhow::Result;

/// Loads the optional TOML config file. A missing file yields the defaults;
/// any other I/O problem is an error naming the file.
pub fn load(path: &str) -> Result<AdminConfig> {
    let path = &*shellexpand::tilde(path);
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(AdminConfig::default()),
        Err(err) => Err(anyhow::anyhow!("could not read config {}: {}", path, err)),
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct AdminConfig {
    pub cluster: String,

    pub wallet: String,

    pub commitment: CommitmentLevel,

    /// Rewarder to administer when the command line does not name one.
    #[serde(with = "optional_display_fromstr")]
    pub rewarder: Option<Pubkey>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        AdminConfig {
            cluster: "localnet".to_string(),
            wallet: "~/.config/solana/id.json".to_string(),
            commitment: CommitmentLevel::Confirmed,
            rewarder: None,
        }
    }
}

impl AdminConfig {
    pub fn cluster_url(&self) -> String {
        match &*self.cluster.to_lowercase() {
            "l" | "localnet" | "localhost" => "http://localhost:8899".to_string(),
            "d" | "devnet" => "https://api.devnet.solana.com".to_string(),
            "m" | "mainnet" => "https://api.mainnet-beta.solana.com".to_string(),
            url => url.to_owned(),
        }
    }

    pub fn commitment(&self) -> CommitmentConfig {
        CommitmentConfig {
            commitment: self.commitment,
        }
    }
}

mod optional_display_fromstr {
    use super::Pubkey;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Pubkey>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper(#[serde(with = "serde_with::rust::display_fromstr")] Pubkey);

        let helper = Option::deserialize(deserializer)?;
        Ok(helper.map(|Helper(pubkey)| pubkey))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults() {
        let config = AdminConfig::default();
        assert_eq!(config.cluster_url(), "http://localhost:8899");
        assert_eq!(config.commitment, CommitmentLevel::Confirmed);
        assert!(config.rewarder.is_none());
    }

    #[test]
    fn test_parse() {
        let config: AdminConfig = toml::from_str(
            r#"
            cluster = "devnet"
            wallet = "~/wallets/admin.json"
            commitment = "finalized"
            rewarder = "J829VB5Fi7DMoMLK7bsVGFM82cRU61BKtiPz9PNFdL7b"
            "#,
        )
        .unwrap();
        assert_eq!(config.cluster_url(), "https://api.devnet.solana.com");
        assert_eq!(config.commitment, CommitmentLevel::Finalized);
        assert_eq!(
            config.rewarder,
            Some(Pubkey::from_str("J829VB5Fi7DMoMLK7bsVGFM82cRU61BKtiPz9PNFdL7b").unwrap())
        );
    }

    #[test]
    fn test_custom_cluster_passes_through() {
        let config = AdminConfig {
            cluster: "https://rpc.example.org".to_string(),
            ..Default::default()
        };
        assert_eq!(config.cluster_url(), "https://rpc.example.org");
    }
}
