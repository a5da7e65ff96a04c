//! Wallet provider capability.
//!
//! The narrow interface this engine consumes from a wallet: account access,
//! chain identity, balance reads, transaction submission, and change
//! notifications. The wallet itself (key custody, signing, user prompts) is
//! an external collaborator and is never implemented here.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors from provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("URL parse error: {0}")]
    UrlParse(String),
    /// The user declined the request in their wallet, or the wallet refused
    /// to sign. Distinct from transport faults: this one is expected.
    #[error("rejected by the wallet: {0}")]
    Rejected(String),
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// A change notification from the wallet.
///
/// Consumers must treat both kinds identically: either one silently
/// invalidates the bound contract and any cached balance, so the whole
/// session is rebuilt rather than repaired in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The authorized account set changed.
    AccountsChanged,
    /// The selected network changed.
    ChainChanged,
}

/// Settlement status of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Mined and executed successfully.
    Success,
    /// Mined but reverted.
    Reverted,
}

/// A contract call to submit through the wallet.
///
/// Carries the sender (`from`) and the value attached to the call; the
/// wallet populates everything else (nonce, gas, fees) and signs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Sending account.
    pub from: Address,
    /// Callee contract.
    pub to: Address,
    /// Value in wei attached to the call, if any.
    pub value: Option<U256>,
    /// ABI-encoded calldata, if any.
    pub data: Option<Bytes>,
}

/// The wallet provider capability.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Issue a user-facing permission request for account access
    /// (`eth_requestAccounts`). A decline surfaces as
    /// [`ProviderError::Rejected`].
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    /// The currently authorized account list (`eth_accounts`). Empty until
    /// access has been granted.
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// The provider's currently selected chain id.
    async fn chain_id(&self) -> Result<u64>;

    /// Native balance of `address` in wei.
    async fn balance_of(&self, address: Address) -> Result<U256>;

    /// Submit a transaction through the wallet. Returns the transaction
    /// hash once the wallet has accepted and broadcast it.
    async fn send_transaction(&self, call: CallRequest) -> Result<B256>;

    /// Settlement status of a submitted transaction, or `None` while no
    /// receipt is available yet.
    async fn transaction_status(&self, hash: B256) -> Result<Option<TxStatus>>;

    /// Subscribe to change notifications. Dropping the receiver ends the
    /// subscription.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Detects whether the environment has a wallet provider.
///
/// Detection is a single await bounded by the environment's own timeout; no
/// additional timeout is layered on top. `None` is a valid terminal outcome
/// (render "wallet not installed"), not an error.
#[async_trait]
pub trait ProviderDetector: Send + Sync {
    async fn detect(&self) -> Option<Arc<dyn WalletProvider>>;
}
