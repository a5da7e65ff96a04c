//! Session lifecycle and control.
//!
//! Owns the session aggregate, drives detection, binding, reads, and
//! mutations, and publishes view snapshots. Any provider change event tears
//! the session down wholesale and re-runs detection; nothing is repaired in
//! place, because an account or network change silently invalidates the
//! bound contract and any cached balance.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};

use spigot_core::config::ClientConfig;
use spigot_core::phase::{valid_transition, SessionPhase};
use spigot_evm::artifact::{ArtifactClient, ArtifactError, ArtifactSource};
use spigot_evm::bind::{bind, BindError, BoundContract};
use spigot_evm::faucet::{self, MutationError};
use spigot_evm::node::NodeDetector;
use spigot_evm::provider::{ProviderDetector, ProviderError, ProviderEvent, WalletProvider};
use spigot_evm::{reader, units, U256};

use crate::view::{AppView, ChainView};

/// User-triggerable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Ask the wallet for account access.
    Connect,
    /// Deposit one ether into the faucet.
    Deposit,
    /// Withdraw a tenth of an ether from the faucet.
    Withdraw,
}

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("bind error: {0}")]
    Bind(#[from] BindError),
    #[error("mutation error: {0}")]
    Mutation(#[from] MutationError),
    #[error("no wallet provider in this session")]
    NoProvider,
    #[error("no contract bound on the active network")]
    NotBound,
    #[error("no account authorized")]
    NoAccount,
}

/// Amount deposited per deposit action: 1 ether.
pub fn deposit_amount() -> U256 {
    units::wei_per_ether()
}

/// Amount withdrawn per withdraw action: 0.1 ether.
pub fn withdraw_amount() -> U256 {
    units::wei_per_ether() / U256::from(10u64)
}

#[derive(Debug, Clone, Copy)]
enum MutationKind {
    Deposit,
    Withdraw,
}

/// Aggregate session state.
///
/// The provider handle and the bound contract are set together during
/// initialization and replaced wholesale on invalidation, never mutated
/// field by field.
#[derive(Default)]
pub struct Session {
    provider: Option<Arc<dyn WalletProvider>>,
    bound: Option<BoundContract>,
    detection_complete: bool,
}

impl Session {
    /// Whether provider detection has finished for this session.
    pub fn detection_complete(&self) -> bool {
        self.detection_complete
    }

    /// The provider handle, if one was detected.
    pub fn provider(&self) -> Option<&Arc<dyn WalletProvider>> {
        self.provider.as_ref()
    }

    /// The bound contract, if the active network carries a deployment.
    pub fn bound(&self) -> Option<&BoundContract> {
        self.bound.as_ref()
    }
}

/// Composes detection, binding, reads, and mutations into observable state
/// and user-triggerable actions.
pub struct SessionController<D, A> {
    detector: D,
    artifacts: A,
    contract_name: String,
    session: Session,
    view: AppView,
    updates: watch::Sender<AppView>,
}

impl SessionController<NodeDetector, ArtifactClient> {
    /// Wire a controller from configuration: node-backed detection plus the
    /// HTTP artifact store.
    pub fn from_config(config: &ClientConfig) -> Self {
        let detector = NodeDetector::new(
            &config.provider_url,
            Duration::from_millis(config.event_poll_ms),
        );
        let artifacts = ArtifactClient::new(&config.artifact_base_url);
        Self::new(detector, artifacts, &config.contract_name)
    }
}

impl<D: ProviderDetector, A: ArtifactSource> SessionController<D, A> {
    pub fn new(detector: D, artifacts: A, contract_name: impl Into<String>) -> Self {
        let view = AppView::default();
        let (updates, _) = watch::channel(view.clone());
        Self {
            detector,
            artifacts,
            contract_name: contract_name.into(),
            session: Session::default(),
            view,
            updates,
        }
    }

    /// Subscribe to view snapshots.
    pub fn watch(&self) -> watch::Receiver<AppView> {
        self.updates.subscribe()
    }

    /// The current view snapshot.
    pub fn view(&self) -> &AppView {
        &self.view
    }

    /// The current session aggregate.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run detection and binding, then derive the first account/balance
    /// snapshot. Returns the provider's event stream when a provider was
    /// found, so the caller can feed invalidations back in.
    ///
    /// An absent provider is a valid terminal outcome (NoProvider phase),
    /// not an error. A missing or malformed artifact is a packaging defect:
    /// the phase moves to Failed and the fault propagates to the caller.
    pub async fn initialize(
        &mut self,
    ) -> Result<Option<broadcast::Receiver<ProviderEvent>>, SessionError> {
        if self.view.phase != SessionPhase::Detecting {
            self.set_phase(SessionPhase::Detecting);
        }

        let provider = self.detector.detect().await;
        self.session.detection_complete = true;

        let Some(provider) = provider else {
            tracing::info!("no wallet provider detected");
            self.set_phase(SessionPhase::NoProvider);
            return Ok(None);
        };

        let events = provider.subscribe();
        self.session.provider = Some(provider.clone());
        self.set_phase(SessionPhase::ProviderFound);
        self.set_phase(SessionPhase::Binding);

        let artifact = match self.artifacts.fetch(&self.contract_name).await {
            Ok(artifact) => artifact,
            Err(e) => {
                self.view.last_error = Some(e.to_string());
                self.set_phase(SessionPhase::Failed);
                return Err(e.into());
            }
        };

        let bound = match bind(&artifact, provider.as_ref()).await {
            Ok(bound) => bound,
            Err(e) => {
                self.view.last_error = Some(e.to_string());
                self.set_phase(SessionPhase::Failed);
                return Err(e.into());
            }
        };

        self.session.bound = bound;
        let phase = if self.session.bound.is_some() {
            SessionPhase::Bound
        } else {
            SessionPhase::Unbound
        };
        self.set_phase(phase);

        self.refresh(provider.as_ref()).await?;
        Ok(Some(events))
    }

    /// Tear the session down wholesale and return to detection.
    ///
    /// Discards the provider handle and the bound contract together,
    /// clears the chain snapshot, and bumps the generation.
    pub fn reset(&mut self) {
        tracing::info!(generation = self.view.generation + 1, "session reset");
        self.session = Session::default();
        self.view.chain = ChainView::default();
        self.view.busy = false;
        self.view.last_error = None;
        self.view.generation += 1;
        self.set_phase(SessionPhase::Detecting);
    }

    /// Request account access from the wallet.
    ///
    /// A user decline leaves the session in its pre-connection state:
    /// logged, never surfaced as a fault. Transport errors still propagate.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        let provider = self
            .session
            .provider
            .clone()
            .ok_or(SessionError::NoProvider)?;

        match provider.request_accounts().await {
            Ok(_) => {
                let account = reader::read_account(provider.as_ref()).await?;
                self.view.chain = ChainView {
                    account,
                    ..self.view.chain.clone()
                };
                self.publish();
                Ok(())
            }
            Err(ProviderError::Rejected(reason)) => {
                tracing::warn!(%reason, "account access declined");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deposit one ether into the faucet as the active account.
    pub async fn deposit(&mut self) -> Result<(), SessionError> {
        self.mutate(MutationKind::Deposit).await
    }

    /// Withdraw a tenth of an ether from the faucet as the active account.
    pub async fn withdraw(&mut self) -> Result<(), SessionError> {
        self.mutate(MutationKind::Withdraw).await
    }

    /// Drive the controller as a single-task actor.
    ///
    /// Mutations are serialized by construction: the loop processes one
    /// command at a time, so two mutating operations never run in parallel
    /// and a reset never interleaves with an in-flight call. Any provider
    /// change event tears the whole session down and re-runs detection.
    pub async fn run(mut self, mut commands: mpsc::Receiver<AppCommand>) {
        let mut events = self.initialize_logged().await;

        loop {
            tokio::select! {
                maybe_command = commands.recv() => {
                    let Some(command) = maybe_command else { break };
                    if let Err(e) = self.dispatch(command).await {
                        tracing::error!(error = %e, ?command, "command failed");
                    }
                }
                changed = next_event(&mut events) => {
                    if changed.is_none() {
                        // The provider stopped reporting changes; keep
                        // serving commands against the current session.
                        events = None;
                        continue;
                    }
                    self.reset();
                    events = self.initialize_logged().await;
                }
            }
        }
    }

    async fn dispatch(&mut self, command: AppCommand) -> Result<(), SessionError> {
        match command {
            AppCommand::Connect => self.connect().await,
            AppCommand::Deposit => self.deposit().await,
            AppCommand::Withdraw => self.withdraw().await,
        }
    }

    async fn initialize_logged(&mut self) -> Option<broadcast::Receiver<ProviderEvent>> {
        match self.initialize().await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(error = %e, "session initialization failed");
                None
            }
        }
    }

    async fn mutate(&mut self, kind: MutationKind) -> Result<(), SessionError> {
        let provider = self
            .session
            .provider
            .clone()
            .ok_or(SessionError::NoProvider)?;
        let bound = self.session.bound.clone().ok_or(SessionError::NotBound)?;
        let account = self.view.chain.account.ok_or(SessionError::NoAccount)?;

        self.view.busy = true;
        self.publish();

        let result = match kind {
            MutationKind::Deposit => {
                faucet::deposit(provider.as_ref(), &bound, account, deposit_amount()).await
            }
            MutationKind::Withdraw => {
                faucet::withdraw(provider.as_ref(), &bound, account, withdraw_amount()).await
            }
        };

        self.view.busy = false;
        match result {
            Ok(hash) => {
                tracing::info!(%hash, ?kind, "mutation confirmed");
                self.view.last_error = None;
                self.refresh_balance(provider.as_ref()).await?;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, ?kind, "mutation failed");
                self.view.last_error = Some(e.to_string());
                self.publish();
                Err(e.into())
            }
        }
    }

    /// Derive a fresh account and balance snapshot.
    async fn refresh(&mut self, provider: &dyn WalletProvider) -> Result<(), SessionError> {
        let account = reader::read_account(provider).await?;
        let balance_wei = reader::read_balance(provider, self.session.bound.as_ref()).await?;
        self.view.chain = ChainView {
            account,
            balance_wei,
        };
        self.view.refresh_count += 1;
        self.publish();
        Ok(())
    }

    /// Recompute the balance part of the snapshot. Runs exactly once after
    /// each successful mutation.
    async fn refresh_balance(&mut self, provider: &dyn WalletProvider) -> Result<(), SessionError> {
        let balance_wei = reader::read_balance(provider, self.session.bound.as_ref()).await?;
        self.view.chain = ChainView {
            balance_wei,
            ..self.view.chain.clone()
        };
        self.view.refresh_count += 1;
        self.publish();
        Ok(())
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        debug_assert!(
            valid_transition(self.view.phase, phase),
            "invalid phase transition {} -> {}",
            self.view.phase,
            phase
        );
        tracing::debug!(from = %self.view.phase, to = %phase, "phase transition");
        self.view.phase = phase;
        self.publish();
    }

    fn publish(&self) {
        let _ = self.updates.send_replace(self.view.clone());
    }
}

/// Wait for the next invalidation signal.
///
/// Which of the two change kinds fired is deliberately ignored: either one
/// invalidates the session. A lagged receiver also counts, since changes
/// were definitely missed. `None` means the stream is gone.
async fn next_event(events: &mut Option<broadcast::Receiver<ProviderEvent>>) -> Option<()> {
    let Some(receiver) = events.as_mut() else {
        return std::future::pending().await;
    };
    match receiver.recv().await {
        Ok(event) => {
            tracing::info!(?event, "provider change, session invalidated");
            Some(())
        }
        Err(broadcast::error::RecvError::Lagged(missed)) => {
            tracing::warn!(missed, "event stream lagged, session invalidated");
            Some(())
        }
        Err(broadcast::error::RecvError::Closed) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spigot_evm::testutil::{
        faucet_artifact, faucet_contract, FixtureArtifacts, MockDetector, MockProvider,
        FAUCET_NETWORK_ID,
    };
    use spigot_evm::Address;

    fn account() -> Address {
        "0x00a329c0648769a73afac7f9381e08fb43dbea72"
            .parse()
            .unwrap()
    }

    fn controller(
        provider: Arc<MockProvider>,
    ) -> SessionController<MockDetector, FixtureArtifacts> {
        SessionController::new(
            MockDetector::found(provider),
            FixtureArtifacts::new().with(faucet_artifact()),
            "Faucet",
        )
    }

    #[test]
    fn from_config_starts_uninitialized() {
        let controller = SessionController::from_config(&ClientConfig::default());
        assert_eq!(controller.view().phase, SessionPhase::Uninitialized);
        assert!(!controller.session().detection_complete());
    }

    #[tokio::test]
    async fn initialize_binds_and_reads_state() {
        let provider = MockProvider::new(FAUCET_NETWORK_ID);
        provider.set_accounts(vec![account()]);
        provider.authorize();
        provider.set_balance(faucet_contract(), units::wei_per_ether());

        let mut controller = controller(provider);
        let events = controller.initialize().await.unwrap();

        assert!(events.is_some());
        let view = controller.view();
        assert_eq!(view.phase, SessionPhase::Bound);
        assert_eq!(view.chain.account, Some(account()));
        assert_eq!(view.chain.balance_wei, units::wei_per_ether());
        assert_eq!(view.refresh_count, 1);
        assert!(controller.session().detection_complete());
    }

    #[tokio::test]
    async fn absent_provider_is_terminal_not_an_error() {
        let mut controller = SessionController::new(
            MockDetector::absent(),
            FixtureArtifacts::new().with(faucet_artifact()),
            "Faucet",
        );

        let events = controller.initialize().await.unwrap();
        assert!(events.is_none());
        assert_eq!(controller.view().phase, SessionPhase::NoProvider);
        assert!(controller.session().detection_complete());
        assert!(controller.session().provider().is_none());
    }

    #[tokio::test]
    async fn wrong_network_is_unbound_with_zero_balance() {
        let provider = MockProvider::new(1);
        provider.set_accounts(vec![account()]);
        provider.authorize();
        provider.set_balance(faucet_contract(), units::wei_per_ether());

        let mut controller = controller(provider);
        controller.initialize().await.unwrap();

        let view = controller.view();
        assert_eq!(view.phase, SessionPhase::Unbound);
        assert_eq!(view.chain.balance_wei, U256::ZERO);
        assert_eq!(view.balance_display(), "0.0");
    }

    #[tokio::test]
    async fn missing_artifact_fails_and_propagates() {
        let provider = MockProvider::new(FAUCET_NETWORK_ID);
        let mut controller = SessionController::new(
            MockDetector::found(provider),
            FixtureArtifacts::new(),
            "Faucet",
        );

        let err = controller.initialize().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Artifact(ArtifactError::NotFound { .. })
        ));
        assert_eq!(controller.view().phase, SessionPhase::Failed);
        assert!(controller.view().last_error.is_some());
    }

    #[tokio::test]
    async fn connect_authorizes_and_fills_account() {
        let provider = MockProvider::new(FAUCET_NETWORK_ID);
        provider.set_accounts(vec![account()]);

        let mut controller = controller(provider);
        controller.initialize().await.unwrap();
        assert_eq!(controller.view().chain.account, None);

        controller.connect().await.unwrap();
        assert_eq!(controller.view().chain.account, Some(account()));
    }

    #[tokio::test]
    async fn declined_connect_is_not_a_fault() {
        let provider = MockProvider::new(FAUCET_NETWORK_ID);
        provider.set_accounts(vec![account()]);
        provider.decline_access(true);

        let mut controller = controller(provider);
        controller.initialize().await.unwrap();

        controller.connect().await.unwrap();
        assert_eq!(controller.view().chain.account, None);
        assert_eq!(controller.view().phase, SessionPhase::Bound);
    }

    #[tokio::test]
    async fn deposit_increases_balance_by_exactly_one_ether() {
        let provider = MockProvider::new(FAUCET_NETWORK_ID);
        provider.set_accounts(vec![account()]);
        provider.authorize();

        let mut controller = controller(provider);
        controller.initialize().await.unwrap();
        let before = controller.view().chain.balance_wei;

        controller.deposit().await.unwrap();

        let after = controller.view().chain.balance_wei;
        assert_eq!(after - before, deposit_amount());
        assert_eq!(controller.view().balance_display(), "1.0");
    }

    #[tokio::test]
    async fn withdraw_decreases_balance_by_exactly_a_tenth() {
        let provider = MockProvider::new(FAUCET_NETWORK_ID);
        provider.set_accounts(vec![account()]);
        provider.authorize();
        provider.set_balance(faucet_contract(), units::wei_per_ether());

        let mut controller = controller(provider);
        controller.initialize().await.unwrap();

        controller.withdraw().await.unwrap();

        let expected = units::wei_per_ether() - withdraw_amount();
        assert_eq!(controller.view().chain.balance_wei, expected);
        assert_eq!(controller.view().balance_display(), "0.9");
    }

    #[tokio::test]
    async fn each_successful_mutation_refreshes_exactly_once() {
        let provider = MockProvider::new(FAUCET_NETWORK_ID);
        provider.set_accounts(vec![account()]);
        provider.authorize();

        let mut controller = controller(provider);
        controller.initialize().await.unwrap();
        assert_eq!(controller.view().refresh_count, 1);

        controller.deposit().await.unwrap();
        assert_eq!(controller.view().refresh_count, 2);

        controller.deposit().await.unwrap();
        assert_eq!(controller.view().refresh_count, 3);
    }

    #[tokio::test]
    async fn failed_mutation_keeps_balance_and_surfaces_fault() {
        let provider = MockProvider::new(FAUCET_NETWORK_ID);
        provider.set_accounts(vec![account()]);
        provider.authorize();
        provider.set_balance(faucet_contract(), units::wei_per_ether());

        let mut controller = controller(provider.clone());
        controller.initialize().await.unwrap();
        let refreshes_before = controller.view().refresh_count;

        provider.reject_sends(true);
        let err = controller.deposit().await.unwrap_err();

        assert!(matches!(err, SessionError::Mutation(_)));
        assert_eq!(controller.view().chain.balance_wei, units::wei_per_ether());
        assert_eq!(controller.view().refresh_count, refreshes_before);
        assert!(controller.view().last_error.is_some());
        assert!(!controller.view().busy);
    }

    #[tokio::test]
    async fn mutation_without_bound_contract_is_rejected() {
        let provider = MockProvider::new(1);
        provider.set_accounts(vec![account()]);
        provider.authorize();

        let mut controller = controller(provider);
        controller.initialize().await.unwrap();

        let err = controller.deposit().await.unwrap_err();
        assert!(matches!(err, SessionError::NotBound));
    }

    #[tokio::test]
    async fn mutation_without_account_is_rejected() {
        let provider = MockProvider::new(FAUCET_NETWORK_ID);

        let mut controller = controller(provider);
        controller.initialize().await.unwrap();

        let err = controller.deposit().await.unwrap_err();
        assert!(matches!(err, SessionError::NoAccount));
    }

    #[tokio::test]
    async fn reset_discards_everything_and_reenters_detection() {
        let provider = MockProvider::new(FAUCET_NETWORK_ID);
        provider.set_accounts(vec![account()]);
        provider.authorize();
        provider.set_balance(faucet_contract(), units::wei_per_ether());

        let mut controller = controller(provider);
        controller.initialize().await.unwrap();
        assert_eq!(controller.view().generation, 0);

        controller.reset();

        let view = controller.view();
        assert_eq!(view.phase, SessionPhase::Detecting);
        assert_eq!(view.generation, 1);
        assert_eq!(view.chain, ChainView::default());
        assert!(controller.session().provider().is_none());
        assert!(controller.session().bound().is_none());
        assert!(!controller.session().detection_complete());
    }

    #[tokio::test]
    async fn reinitialize_after_reset_rebinds_against_current_network() {
        let provider = MockProvider::new(FAUCET_NETWORK_ID);
        provider.set_accounts(vec![account()]);
        provider.authorize();

        let mut controller = controller(provider.clone());
        controller.initialize().await.unwrap();
        assert_eq!(controller.view().phase, SessionPhase::Bound);

        // The wallet switches to a network without a deployment.
        provider.set_chain_id(1);
        controller.reset();
        controller.initialize().await.unwrap();

        assert_eq!(controller.view().phase, SessionPhase::Unbound);
        assert_eq!(controller.view().generation, 1);
    }
}
