//! # Node Configuration
//!
//! Loads the node's TOML configuration: which account the vault custodies,
//! who the signers are, how many approvals a transfer needs, what the
//! custodial account starts out holding, and where the node listens.
//!
//! ```toml
//! [wallet]
//! account = "0x..."
//! quorum = 3
//! signers = ["0x...", "0x...", "0x...", "0x..."]
//!
//! [[wallet.deposits]]
//! asset = "0x..."
//! amount = 10000
//!
//! [server]
//! rpc_port = 9841
//! metrics_port = 9842
//! log_level = "quorum_node=info,quorum_contracts=info"
//! log_format = "pretty"
//! ```
//!
//! Validation builds the [`SignerRegistry`] up front, so a bad signer set or
//! quorum is reported when the file is loaded, not when the first transfer
//! comes in.

use std::path::Path;

use quorum_contracts::signer_registry::{RegistryError, SignerRegistry};
use quorum_protocol::config::{DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};
use quorum_protocol::identity::Address;
use quorum_protocol::vault::AssetId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LogFormat;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found.
    #[error("config file not found: {0}")]
    NotFound(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The signer set or quorum is invalid.
    #[error("invalid signer registry: {0}")]
    Registry(#[from] RegistryError),

    /// Any other semantic problem.
    #[error("validation error: {0}")]
    Validation(String),
}

/// A starting balance credited to the custodial account at boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositConfig {
    /// Asset to credit.
    pub asset: AssetId,
    /// Amount in smallest units.
    pub amount: u64,
}

/// The `[wallet]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Custodial account address.
    pub account: Address,
    /// Approvals required to execute a transfer.
    pub quorum: usize,
    /// Authorized signers.
    pub signers: Vec<Address>,
    /// Balances seeded into the custodial account on startup.
    #[serde(default)]
    pub deposits: Vec<DepositConfig>,
}

/// The `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// REST/WebSocket API port.
    pub rpc_port: u16,
    /// Prometheus metrics port.
    pub metrics_port: u16,
    /// Default `EnvFilter` directive; `RUST_LOG` overrides it.
    pub log_level: String,
    /// `pretty` or `json`.
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rpc_port: DEFAULT_RPC_PORT,
            metrics_port: DEFAULT_METRICS_PORT,
            log_level: "quorum_node=info,quorum_contracts=info,tower_http=info".into(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Vault settings.
    pub wallet: WalletConfig,
    /// Listener and logging settings.
    #[serde(default)]
    pub server: ServerConfig,
}

impl NodeConfig {
    /// Loads and validates a config file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::load_str(&content)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parses and validates config text.
    pub fn load_str(content: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// A deterministic devnet configuration: `signers` derived signer
    /// addresses (`signer-1` .. `signer-N`), a derived vault account, and
    /// 1 000 000 units of a derived `USDC` asset.
    pub fn devnet(signers: usize, quorum: usize) -> Self {
        Self {
            wallet: WalletConfig {
                account: Address::derive("devnet-vault"),
                quorum,
                signers: (1..=signers)
                    .map(|i| Address::derive(&format!("signer-{i}")))
                    .collect(),
                deposits: vec![DepositConfig {
                    asset: AssetId::derive("USDC"),
                    amount: 1_000_000,
                }],
            },
            server: ServerConfig::default(),
        }
    }

    /// Renders the config as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Builds the signer registry described by the `[wallet]` section.
    pub fn signer_registry(&self) -> Result<SignerRegistry, ConfigError> {
        Ok(SignerRegistry::new(
            self.wallet.quorum,
            self.wallet.signers.clone(),
        )?)
    }

    /// Checks everything that can be checked without starting the node.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wallet.account.is_zero() {
            return Err(ConfigError::Validation(
                "wallet.account cannot be the zero address".into(),
            ));
        }

        self.signer_registry()?;

        for deposit in &self.wallet.deposits {
            if deposit.asset.is_zero() {
                return Err(ConfigError::Validation(
                    "wallet.deposits: asset cannot be the zero address".into(),
                ));
            }
        }

        if self.server.rpc_port == self.server.metrics_port {
            return Err(ConfigError::Validation(format!(
                "server.rpc_port and server.metrics_port are both {}",
                self.server.rpc_port
            )));
        }

        Ok(())
    }
}
