//! Client configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use aegis_crypto::keypair_from_hex;
use aegis_types::{AccountAddress, KeyPair, NetworkId, ParseError};
use aegis_utils::LogFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("set DEPLOYER_ADDRESS to the module publisher address")]
    MissingPublisher,

    #[error("publisher address: {0}")]
    InvalidPublisher(ParseError),

    #[error("DELEGATION_SECONDS must be a positive integer")]
    NonPositiveDuration,

    #[error("confirmation timeout must be at least one second")]
    ZeroTimeout,

    #[error("network {0} needs a node URL")]
    MissingNodeUrl(NetworkId),

    #[error("{role} private key: {source}")]
    InvalidKey {
        role: &'static str,
        source: ParseError,
    },
}

/// Settings for one client run.
///
/// Loaded from a TOML file via [`ClientConfig::from_toml_file`], then
/// overridden by command-line flags and environment variables.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Which ledger network to talk to.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// JSON-RPC endpoint of a node. Unused on `local`.
    #[serde(default)]
    pub node_url: Option<String>,

    /// Address that published the `delegated_signer` module.
    #[serde(default)]
    pub deployer_address: Option<String>,

    #[serde(default = "default_delegation_seconds")]
    pub delegation_seconds: u64,

    /// Hex-encoded owner key. A fresh key is generated when absent.
    #[serde(default)]
    pub owner_private_key: Option<String>,

    /// Hex-encoded delegate key. A fresh key is generated when absent.
    #[serde(default)]
    pub delegate_private_key: Option<String>,

    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Testnet
}

fn default_delegation_seconds() -> u64 {
    600
}

fn default_confirmation_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

/// A [`ClientConfig`] that passed validation, with every field parsed.
pub struct Settings {
    pub network: NetworkId,
    pub node_url: Option<String>,
    pub publisher: AccountAddress,
    pub delegation_seconds: u64,
    pub owner_key: Option<KeyPair>,
    pub delegate_key: Option<KeyPair>,
    pub confirmation_timeout: Duration,
}

impl ClientConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Check every field before any network call is made.
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let publisher = self
            .deployer_address
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingPublisher)?;
        let publisher =
            AccountAddress::from_hex_literal(publisher.trim()).map_err(ConfigError::InvalidPublisher)?;

        if self.delegation_seconds == 0 {
            return Err(ConfigError::NonPositiveDuration);
        }
        if self.confirmation_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let node_url = self.node_url.clone().filter(|u| !u.trim().is_empty());
        if self.network.is_remote() && node_url.is_none() {
            return Err(ConfigError::MissingNodeUrl(self.network));
        }

        Ok(Settings {
            network: self.network,
            node_url,
            publisher,
            delegation_seconds: self.delegation_seconds,
            owner_key: parse_key("owner", self.owner_private_key.as_deref())?,
            delegate_key: parse_key("delegate", self.delegate_private_key.as_deref())?,
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
        })
    }
}

fn parse_key(role: &'static str, hex: Option<&str>) -> Result<Option<KeyPair>, ConfigError> {
    match hex.filter(|h| !h.trim().is_empty()) {
        Some(hex) => keypair_from_hex(hex)
            .map(Some)
            .map_err(|source| ConfigError::InvalidKey { role, source }),
        None => Ok(None),
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            node_url: None,
            deployer_address: None,
            delegation_seconds: default_delegation_seconds(),
            owner_private_key: None,
            delegate_private_key: None,
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}
