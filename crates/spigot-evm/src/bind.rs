//! Contract binding.
//!
//! Resolves an artifact against the provider's currently selected network,
//! yielding a bound instance whose calls are encoded from the artifact
//! interface.

use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes};
use thiserror::Error;

use crate::artifact::ContractArtifact;
use crate::provider::{ProviderError, WalletProvider};

/// Errors from binding and call encoding.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("interface has no function '{0}'")]
    UnknownFunction(String),
    #[error("ABI encoding error: {0}")]
    Abi(String),
}

/// An artifact resolved to one deployed instance on one network.
#[derive(Debug, Clone)]
pub struct BoundContract {
    name: String,
    address: Address,
    network_id: u64,
    abi: JsonAbi,
}

impl BoundContract {
    /// Contract name from the artifact.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deployed address on the bound network.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Network id this contract was bound on.
    pub fn network_id(&self) -> u64 {
        self.network_id
    }

    /// Look up a function in the bound interface.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.abi
            .functions
            .get(name)
            .and_then(|overloads| overloads.first())
    }

    /// Encode calldata for `name` with `args` using the artifact interface.
    pub fn encode_call(&self, name: &str, args: &[DynSolValue]) -> Result<Bytes, BindError> {
        let function = self
            .function(name)
            .ok_or_else(|| BindError::UnknownFunction(name.to_string()))?;
        let data = function
            .abi_encode_input(args)
            .map_err(|e| BindError::Abi(e.to_string()))?;
        Ok(Bytes::from(data))
    }
}

/// Resolve `artifact` to the instance deployed on the provider's current
/// network.
///
/// `Ok(None)` means the active network carries no deployment for this
/// artifact. That is an expected, user-recoverable condition (switch
/// network in the wallet), logged distinguishably and never raised.
pub async fn bind(
    artifact: &ContractArtifact,
    provider: &dyn WalletProvider,
) -> Result<Option<BoundContract>, BindError> {
    let network_id = provider.chain_id().await?;

    match artifact.deployment(network_id) {
        Some(address) => {
            tracing::info!(
                contract = %artifact.contract_name,
                network_id,
                %address,
                "contract bound"
            );
            Ok(Some(BoundContract {
                name: artifact.contract_name.clone(),
                address,
                network_id,
                abi: artifact.abi.clone(),
            }))
        }
        None => {
            tracing::warn!(
                contract = %artifact.contract_name,
                network_id,
                "connected to wrong network: artifact has no deployment here"
            );
            Ok(None)
        }
    }
}
