//! Network configuration for the Ijarah SDK

use crate::constants::DEFAULT_APP_ID;
use crate::types::Address;
use eyre::{bail, Context, Result};
use std::fmt;
use std::str::FromStr;

/// Which Algorand network to target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    LocalNet,
    TestNet,
    MainNet,
}

impl FromStr for Network {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "localnet" | "local" => Ok(Network::LocalNet),
            "testnet" | "test" => Ok(Network::TestNet),
            "mainnet" | "main" => Ok(Network::MainNet),
            other => bail!("Unknown network: {}", other),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::LocalNet => "LocalNet",
            Network::TestNet => "TestNet",
            Network::MainNet => "MainNet",
        })
    }
}

/// Node endpoints and the deployed application
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network: Network,
    /// algod base URL including port
    pub algod_url: String,
    pub algod_token: String,
    /// Indexer base URL including port
    pub indexer_url: String,
    pub indexer_token: String,
    /// Tawf Sharia application id
    pub app_id: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::testnet()
    }
}

fn join_url(server: &str, port: &str) -> String {
    let server = server.trim_end_matches('/');
    if port.is_empty() {
        server.to_string()
    } else {
        format!("{}:{}", server, port)
    }
}

impl NetworkConfig {
    /// Local sandbox (AlgoKit LocalNet) with its well-known token
    pub fn localnet() -> Self {
        Self {
            network: Network::LocalNet,
            algod_url: "http://localhost:4001".to_string(),
            algod_token: "a".repeat(64),
            indexer_url: "http://localhost:8980".to_string(),
            indexer_token: "a".repeat(64),
            app_id: DEFAULT_APP_ID,
        }
    }

    /// Public TestNet nodes (default)
    pub fn testnet() -> Self {
        Self {
            network: Network::TestNet,
            algod_url: "https://testnet-api.algonode.cloud".to_string(),
            algod_token: String::new(),
            indexer_url: "https://testnet-idx.algonode.cloud".to_string(),
            indexer_token: String::new(),
            app_id: DEFAULT_APP_ID,
        }
    }

    pub fn mainnet() -> Self {
        Self {
            network: Network::MainNet,
            algod_url: "https://mainnet-api.algonode.cloud".to_string(),
            algod_token: String::new(),
            indexer_url: "https://mainnet-idx.algonode.cloud".to_string(),
            indexer_token: String::new(),
            app_id: DEFAULT_APP_ID,
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::LocalNet => Self::localnet(),
            Network::TestNet => Self::testnet(),
            Network::MainNet => Self::mainnet(),
        }
    }

    /// Resolve from environment variables, falling back to the network preset
    ///
    /// Reads `ALGOD_NETWORK`, `ALGOD_SERVER`, `ALGOD_PORT`, `ALGOD_TOKEN`,
    /// `INDEXER_SERVER`, `INDEXER_PORT`, `INDEXER_TOKEN` and `CONTRACT_APP_ID`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let network = match lookup("ALGOD_NETWORK") {
            Some(name) if !name.is_empty() => name.parse()?,
            _ => Network::TestNet,
        };
        let mut config = Self::for_network(network);

        if let Some(server) = lookup("ALGOD_SERVER").filter(|s| !s.is_empty()) {
            let port = lookup("ALGOD_PORT").unwrap_or_default();
            config.algod_url = join_url(&server, &port);
        }
        if let Some(token) = lookup("ALGOD_TOKEN") {
            config.algod_token = token;
        }
        if let Some(server) = lookup("INDEXER_SERVER").filter(|s| !s.is_empty()) {
            let port = lookup("INDEXER_PORT").unwrap_or_default();
            config.indexer_url = join_url(&server, &port);
        }
        if let Some(token) = lookup("INDEXER_TOKEN") {
            config.indexer_token = token;
        }
        if let Some(app_id) = lookup("CONTRACT_APP_ID").filter(|s| !s.is_empty()) {
            config.app_id = app_id
                .parse()
                .with_context(|| format!("Invalid CONTRACT_APP_ID: {}", app_id))?;
        }

        Ok(config)
    }

    /// Escrow address of the configured application
    pub fn app_address(&self) -> Address {
        Address::for_application(self.app_id)
    }

    pub fn with_algod(mut self, url: impl Into<String>, token: impl Into<String>) -> Self {
        self.algod_url = url.into();
        self.algod_token = token.into();
        self
    }

    pub fn with_indexer(mut self, url: impl Into<String>, token: impl Into<String>) -> Self {
        self.indexer_url = url.into();
        self.indexer_token = token.into();
        self
    }

    pub fn with_app_id(mut self, app_id: u64) -> Self {
        self.app_id = app_id;
        self
    }
}

/// Key management daemon used for signing on LocalNet
#[derive(Debug, Clone)]
pub struct KmdConfig {
    pub url: String,
    pub token: String,
    pub wallet_name: String,
    pub wallet_password: String,
}

impl Default for KmdConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:4002".to_string(),
            token: "a".repeat(64),
            wallet_name: "unencrypted-default-wallet".to_string(),
            wallet_password: String::new(),
        }
    }
}

impl KmdConfig {
    /// Reads `KMD_SERVER`, `KMD_PORT`, `KMD_TOKEN`, `KMD_WALLET` and `KMD_PASSWORD`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(server) = lookup("KMD_SERVER").filter(|s| !s.is_empty()) {
            let port = lookup("KMD_PORT").unwrap_or_default();
            config.url = join_url(&server, &port);
        }
        if let Some(token) = lookup("KMD_TOKEN") {
            config.token = token;
        }
        if let Some(wallet) = lookup("KMD_WALLET").filter(|s| !s.is_empty()) {
            config.wallet_name = wallet;
        }
        if let Some(password) = lookup("KMD_PASSWORD") {
            config.wallet_password = password;
        }
        config
    }
}
