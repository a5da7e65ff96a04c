//! Session lifecycle phases.
//!
//! The lifecycle is linear (detection, then binding) with one re-entrant
//! edge: any account or network change forces a fully established session
//! back to `Detecting` through a wholesale reset.

use std::fmt;

/// Phases of the wallet session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// No work has started yet.
    Uninitialized,
    /// Waiting for the environment to report a wallet provider.
    Detecting,
    /// Detection finished with no provider present. Rendered as an install
    /// prompt; not an error.
    NoProvider,
    /// A provider was found; binding has not started yet.
    ProviderFound,
    /// Resolving the artifact against the provider's current network.
    Binding,
    /// A deployed contract is bound on the active network.
    Bound,
    /// The active network has no deployment for the artifact. Recoverable by
    /// switching networks in the wallet.
    Unbound,
    /// Session setup hit a fault that is not user-recoverable, such as a
    /// missing artifact.
    Failed,
}

impl SessionPhase {
    /// Whether provider detection has finished in this phase.
    pub const fn detection_complete(self) -> bool {
        !matches!(self, Self::Uninitialized | Self::Detecting)
    }

    /// Whether contract interactions are possible in this phase.
    pub const fn interactive(self) -> bool {
        matches!(self, Self::Bound)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Detecting => "detecting",
            Self::NoProvider => "no-provider",
            Self::ProviderFound => "provider-found",
            Self::Binding => "binding",
            Self::Bound => "bound",
            Self::Unbound => "unbound",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Whether the lifecycle permits moving from `from` to `to`.
pub fn valid_transition(from: SessionPhase, to: SessionPhase) -> bool {
    use SessionPhase::*;
    matches!(
        (from, to),
        (Uninitialized, Detecting)
            | (Detecting, NoProvider | ProviderFound)
            | (ProviderFound, Binding)
            | (Binding, Bound | Unbound | Failed)
            // Invalidation or an explicit retry re-enters detection.
            | (NoProvider | ProviderFound | Binding | Bound | Unbound | Failed, Detecting)
    )
}
