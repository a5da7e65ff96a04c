//! Client configuration.
//!
//! Loads the engine configuration from YAML: the wallet provider endpoint,
//! the artifact store location, and the contract to bind.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Engine configuration. Every field has a default, so an empty config is
/// valid.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Wallet provider JSON-RPC endpoint.
    #[serde(default = "default_provider_url")]
    pub provider_url: String,
    /// Base URL of the artifact store, which serves `<base>/<Name>.json`.
    #[serde(default = "default_artifact_base_url")]
    pub artifact_base_url: String,
    /// Name of the contract artifact to bind.
    #[serde(default = "default_contract_name")]
    pub contract_name: String,
    /// Interval in milliseconds at which the provider is polled for account
    /// and network changes.
    #[serde(default = "default_event_poll_ms")]
    pub event_poll_ms: u64,
}

fn default_provider_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_artifact_base_url() -> String {
    "http://127.0.0.1:9000/contracts".to_string()
}

fn default_contract_name() -> String {
    "Faucet".to_string()
}

fn default_event_poll_ms() -> u64 {
    5_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            provider_url: default_provider_url(),
            artifact_base_url: default_artifact_base_url(),
            contract_name: default_contract_name(),
            event_poll_ms: default_event_poll_ms(),
        }
    }
}

impl ClientConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}
