//! Chain state reads.
//!
//! Derives the active account and the bound contract's balance. Reads are
//! idempotent and side-effect-free: they run once after binding completes
//! and once after every successful mutation, and issuing them redundantly
//! is harmless.

use alloy::primitives::{Address, U256};

use crate::bind::BoundContract;
use crate::provider::{Result, WalletProvider};

/// The active account: first entry of the provider's authorized account
/// list, or `None` while nothing is authorized yet.
pub async fn read_account(provider: &dyn WalletProvider) -> Result<Option<Address>> {
    let accounts = provider.accounts().await?;
    Ok(accounts.into_iter().next())
}

/// The bound contract's holdings in wei.
///
/// An unbound session reads as exactly zero, for any account and network.
pub async fn read_balance(
    provider: &dyn WalletProvider,
    bound: Option<&BoundContract>,
) -> Result<U256> {
    match bound {
        Some(contract) => provider.balance_of(contract.address()).await,
        None => Ok(U256::ZERO),
    }
}
