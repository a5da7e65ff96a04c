//! # spigot
//!
//! Wallet-session engine for the Faucet dapp. Detects a wallet provider,
//! resolves the Faucet build artifact to the deployment on the provider's
//! current network, and drives deposit/withdraw against it while keeping an
//! observable account/balance view consistent with chain state.
//!
//! A frontend embeds [`SessionController`], watches its state channel, and
//! sends it [`AppCommand`]s. Any account or network change tears the whole
//! session down and re-runs detection.

pub use spigot_app::{AppCommand, AppView, ChainView, SessionController, SessionError};
pub use spigot_core::config::ClientConfig;
pub use spigot_core::phase::SessionPhase;
pub use spigot_evm::provider::{ProviderEvent, WalletProvider};

/// Returns the library version string.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
