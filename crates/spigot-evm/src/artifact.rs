//! Contract build artifacts.
//!
//! Resolves a contract name to its build artifact: the ABI plus the
//! per-network deployment addresses, served by the artifact store as
//! `<base>/<Name>.json`.

use std::collections::BTreeMap;

use alloy::json_abi::JsonAbi;
use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Errors from artifact resolution.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The store has no such artifact, or the body is not a parseable
    /// artifact. Either way the deployment packaging is broken, so this
    /// must reach the caller instead of being swallowed.
    #[error("artifact '{name}' not found: {reason}")]
    NotFound { name: String, reason: String },
    #[error("artifact store unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Where a contract is deployed on one network.
#[derive(Debug, Clone, Deserialize)]
pub struct Deployment {
    /// Deployed contract address.
    pub address: Address,
}

/// Immutable description of a contract: name, interface, and deployments.
/// Read-only once fetched.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    /// Contract name as emitted by the build.
    pub contract_name: String,
    /// Contract interface.
    pub abi: JsonAbi,
    /// Deployments keyed by decimal network id.
    #[serde(default)]
    pub networks: BTreeMap<String, Deployment>,
}

impl ContractArtifact {
    /// Parse an artifact from its JSON representation.
    pub fn from_json(name: &str, json: &str) -> Result<Self, ArtifactError> {
        serde_json::from_str(json).map_err(|e| ArtifactError::NotFound {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// The deployment address for a network id, if one exists.
    pub fn deployment(&self, network_id: u64) -> Option<Address> {
        self.networks
            .get(&network_id.to_string())
            .map(|deployment| deployment.address)
    }
}

/// A source of contract artifacts.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Fetch the artifact for `name`.
    async fn fetch(&self, name: &str) -> Result<ContractArtifact, ArtifactError>;
}

/// HTTP client for an artifact store serving `<base_url>/<Name>.json`.
#[derive(Debug, Clone)]
pub struct ArtifactClient {
    base_url: String,
    http: reqwest::Client,
}

impl ArtifactClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ArtifactSource for ArtifactClient {
    async fn fetch(&self, name: &str) -> Result<ContractArtifact, ArtifactError> {
        let url = format!("{}/{}.json", self.base_url.trim_end_matches('/'), name);
        tracing::debug!(%url, "fetching contract artifact");

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ArtifactError::NotFound {
                name: name.to_string(),
                reason: format!("store returned {}", response.status()),
            });
        }

        let body = response.text().await?;
        ContractArtifact::from_json(name, &body)
    }
}
