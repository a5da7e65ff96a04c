//! Faucet mutations.
//!
//! Builds deposit and withdraw calls from the bound artifact interface,
//! submits them through the wallet, and waits for settlement.

use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256, U256};
use thiserror::Error;

use crate::bind::{BindError, BoundContract};
use crate::provider::{CallRequest, ProviderError, TxStatus, WalletProvider};

/// Entry point credited by value-carrying deposits.
pub const DEPOSIT_FUNCTION: &str = "addFunds";
/// Entry point debiting an explicit withdrawal amount.
pub const WITHDRAW_FUNCTION: &str = "withdraw";

const RECEIPT_ATTEMPTS: u32 = 10;
const RECEIPT_POLL: Duration = Duration::from_millis(500);

/// Errors from mutation submission.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("encode error: {0}")]
    Encode(#[from] BindError),
    /// The wallet or the chain rejected the submission: user cancelled
    /// signing, insufficient funds, or a transport fault.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("transaction {hash} reverted")]
    Reverted { hash: B256 },
}

/// Result alias for mutation operations.
pub type Result<T> = std::result::Result<T, MutationError>;

/// Deposit `amount_wei` into the contract as `from`.
///
/// A value-carrying call to the deposit entry point. Success means the
/// caller must trigger exactly one balance refresh; failure must not.
pub async fn deposit(
    provider: &dyn WalletProvider,
    bound: &BoundContract,
    from: Address,
    amount_wei: U256,
) -> Result<B256> {
    let data = bound.encode_call(DEPOSIT_FUNCTION, &[])?;
    let call = CallRequest {
        from,
        to: bound.address(),
        value: Some(amount_wei),
        data: Some(data),
    };
    submit(provider, call).await
}

/// Withdraw `amount_wei` from the contract as `from`.
pub async fn withdraw(
    provider: &dyn WalletProvider,
    bound: &BoundContract,
    from: Address,
    amount_wei: U256,
) -> Result<B256> {
    let data = bound.encode_call(WITHDRAW_FUNCTION, &[DynSolValue::Uint(amount_wei, 256)])?;
    let call = CallRequest {
        from,
        to: bound.address(),
        value: None,
        data: Some(data),
    };
    submit(provider, call).await
}

/// Submit the call and poll for settlement.
///
/// A receipt that never shows up within the polling window leaves the
/// transaction treated as submitted; only an explicit revert or a provider
/// rejection fails the mutation.
async fn submit(provider: &dyn WalletProvider, call: CallRequest) -> Result<B256> {
    let hash = provider.send_transaction(call).await?;
    tracing::info!(%hash, "transaction submitted");

    for _ in 0..RECEIPT_ATTEMPTS {
        match provider.transaction_status(hash).await? {
            Some(TxStatus::Success) => return Ok(hash),
            Some(TxStatus::Reverted) => {
                tracing::error!(%hash, "transaction reverted");
                return Err(MutationError::Reverted { hash });
            }
            None => tokio::time::sleep(RECEIPT_POLL).await,
        }
    }

    Ok(hash)
}
