//! # spigot-evm
//!
//! EVM-facing layer for spigot: the wallet provider capability, artifact
//! resolution, contract binding, chain reads, and faucet mutations.
//!
//! ## Modules
//!
//! - [`provider`]: wallet provider capability and change events
//! - [`node`]: alloy-backed provider for a wallet-managed endpoint
//! - [`artifact`]: build artifact resolution
//! - [`bind`]: resolving an artifact to a deployed instance
//! - [`reader`]: account and balance reads
//! - [`faucet`]: deposit and withdraw execution
//! - [`units`]: smallest-unit and display-unit conversion

pub mod artifact;
pub mod bind;
pub mod faucet;
pub mod node;
pub mod provider;
pub mod reader;
pub mod units;

#[cfg(any(test, feature = "test-utils"))]
pub mod testutil;

// Re-export key types for convenience.
pub use artifact::{ArtifactClient, ArtifactError, ArtifactSource, ContractArtifact};
pub use bind::{bind, BindError, BoundContract};
pub use faucet::MutationError;
pub use node::{NodeDetector, NodeProvider};
pub use provider::{
    CallRequest, ProviderDetector, ProviderError, ProviderEvent, TxStatus, WalletProvider,
};

// Re-export alloy primitives used in the public API.
pub use alloy::primitives::{Address, B256, U256};
