//! Observable view state.
//!
//! Snapshots published to frontends through a watch channel. A snapshot is
//! always recomputed wholesale from chain state, never patched with deltas.

use spigot_core::phase::SessionPhase;
use spigot_evm::{units, Address, U256};

/// Chain-derived, non-authoritative snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainView {
    /// Active account, once one is authorized.
    pub account: Option<Address>,
    /// Bound contract's holdings in wei. Exactly zero while unbound.
    pub balance_wei: U256,
}

/// The full view a frontend renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppView {
    /// Where the session is in its lifecycle.
    pub phase: SessionPhase,
    /// Account and balance snapshot.
    pub chain: ChainView,
    /// True while a mutation is outstanding. Frontends disable the deposit
    /// and withdraw triggers while this is set, and re-enable on settle.
    pub busy: bool,
    /// Number of balance recomputations so far: once after binding, once
    /// after every successful mutation.
    pub refresh_count: u64,
    /// Bumped on every session reset, so observers can tell sessions apart.
    pub generation: u64,
    /// Last fault surfaced to the user, if any.
    pub last_error: Option<String>,
}

impl Default for AppView {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            chain: ChainView::default(),
            busy: false,
            refresh_count: 0,
            generation: 0,
            last_error: None,
        }
    }
}

impl AppView {
    /// The balance in display units.
    pub fn balance_display(&self) -> String {
        units::format_units(self.chain.balance_wei, units::ETHER_DECIMALS)
    }

    /// The account rendered for display, if one is active.
    pub fn account_display(&self) -> Option<String> {
        self.chain.account.map(|account| account.to_string())
    }
}
