//! End-to-end tests for spigot.
//!
//! Drives the full session lifecycle against the scripted provider and
//! artifact doubles: detection, binding, reads, mutations, and the
//! reset-on-change path, both through direct controller calls and through
//! the actor loop.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use spigot::SessionPhase;
    use spigot_app::session::{deposit_amount, withdraw_amount};
    use spigot_app::{AppCommand, SessionController, SessionError};
    use spigot_evm::artifact::{ArtifactError, ArtifactSource};
    use spigot_evm::testutil::{
        faucet_artifact, faucet_contract, FixtureArtifacts, MockDetector, MockProvider,
        FAUCET_NETWORK_ID,
    };
    use spigot_evm::{units, Address, ProviderEvent, U256};
    use tokio::sync::mpsc;

    fn account() -> Address {
        "0x00a329c0648769a73afac7f9381e08fb43dbea72"
            .parse()
            .unwrap()
    }

    /// A provider on the deployed network with one authorized account.
    fn ready_provider() -> Arc<MockProvider> {
        let provider = MockProvider::new(FAUCET_NETWORK_ID);
        provider.set_accounts(vec![account()]);
        provider.authorize();
        provider
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

    #[tokio::test]
    async fn full_lifecycle_detect_bind_deposit_withdraw() {
        let provider = ready_provider();
        let mut controller = controller(provider.clone());

        controller.initialize().await.unwrap();
        assert_eq!(controller.view().phase, SessionPhase::Bound);
        assert_eq!(controller.view().chain.account, Some(account()));
        assert_eq!(controller.view().balance_display(), "0.0");

        controller.deposit().await.unwrap();
        assert_eq!(controller.view().balance_display(), "1.0");

        controller.withdraw().await.unwrap();
        assert_eq!(controller.view().balance_display(), "0.9");

        // The double saw exactly the two submissions, from the account.
        let submitted = provider.submitted();
        assert_eq!(submitted.len(), 2);
        assert!(submitted.iter().all(|call| call.from == account()));
        assert_eq!(submitted[0].value, Some(deposit_amount()));
        assert!(submitted[1].value.is_none());
    }

    #[tokio::test]
    async fn balance_tracks_the_accumulating_double_exactly() {
        let provider = ready_provider();
        let mut controller = controller(provider.clone());
        controller.initialize().await.unwrap();

        let before = controller.view().chain.balance_wei;
        controller.deposit().await.unwrap();
        let after_deposit = controller.view().chain.balance_wei;
        assert_eq!(after_deposit - before, deposit_amount());

        controller.withdraw().await.unwrap();
        let after_withdraw = controller.view().chain.balance_wei;
        assert_eq!(after_deposit - after_withdraw, withdraw_amount());

        // The view never drifts from the double's own accounting.
        assert_eq!(after_withdraw, provider.balance(faucet_contract()));
    }

    #[tokio::test]
    async fn rejecting_double_leaves_balance_and_raises() {
        let provider = ready_provider();
        provider.set_balance(faucet_contract(), units::wei_per_ether());
        let mut controller = controller(provider.clone());
        controller.initialize().await.unwrap();

        provider.reject_sends(true);
        let err = controller.deposit().await.unwrap_err();
        assert!(matches!(err, SessionError::Mutation(_)));
        assert_eq!(controller.view().balance_display(), "1.0");

        let err = controller.withdraw().await.unwrap_err();
        assert!(matches!(err, SessionError::Mutation(_)));
        assert_eq!(controller.view().balance_display(), "1.0");
    }

    #[tokio::test]
    async fn fetch_against_empty_store_never_yields_an_artifact() {
        let store = FixtureArtifacts::new();
        let err = store.fetch("Faucet").await.unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound { name, .. } if name == "Faucet"));
    }

    #[tokio::test]
    async fn actor_serves_commands_and_publishes_views() {
        let provider = ready_provider();
        let controller = controller(provider.clone());
        let mut views = controller.watch();
        let (commands, receiver) = mpsc::channel(8);

        let actor = tokio::spawn(controller.run(receiver));

        views
            .wait_for(|view| view.phase == SessionPhase::Bound)
            .await
            .unwrap();

        commands.send(AppCommand::Deposit).await.unwrap();
        let view = views
            .wait_for(|view| view.refresh_count == 2)
            .await
            .unwrap()
            .clone();
        assert_eq!(view.chain.balance_wei, deposit_amount());

        commands.send(AppCommand::Withdraw).await.unwrap();
        let view = views
            .wait_for(|view| view.refresh_count == 3)
            .await
            .unwrap()
            .clone();
        assert_eq!(view.chain.balance_wei, deposit_amount() - withdraw_amount());

        // Closing the command channel shuts the actor down.
        drop(commands);
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn chain_change_resets_the_whole_session() {
        let provider = ready_provider();
        let controller = controller(provider.clone());
        let mut views = controller.watch();
        let (commands, receiver) = mpsc::channel(8);

        let actor = tokio::spawn(controller.run(receiver));
        views
            .wait_for(|view| view.phase == SessionPhase::Bound)
            .await
            .unwrap();

        // The wallet switches to a network with no deployment.
        provider.set_chain_id(1);
        provider.emit(ProviderEvent::ChainChanged);

        let view = views
            .wait_for(|view| view.generation == 1 && view.phase == SessionPhase::Unbound)
            .await
            .unwrap()
            .clone();
        assert_eq!(view.chain.balance_wei, U256::ZERO);
        assert_eq!(view.balance_display(), "0.0");

        drop(commands);
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn account_change_resets_and_rebinds() {
        let provider = ready_provider();
        provider.set_balance(faucet_contract(), units::wei_per_ether());
        let controller = controller(provider.clone());
        let mut views = controller.watch();
        let (commands, receiver) = mpsc::channel(8);

        let actor = tokio::spawn(controller.run(receiver));
        views
            .wait_for(|view| view.phase == SessionPhase::Bound)
            .await
            .unwrap();

        let other: Address = "0x0000000000000000000000000000000000000a11"
            .parse()
            .unwrap();
        provider.set_accounts(vec![other]);
        provider.emit(ProviderEvent::AccountsChanged);

        // The session comes back fully rebuilt on the same network: bound
        // again, new account, balance rederived rather than carried over.
        let view = views
            .wait_for(|view| view.generation == 1 && view.phase == SessionPhase::Bound)
            .await
            .unwrap()
            .clone();
        assert_eq!(view.chain.account, Some(other));
        assert_eq!(view.balance_display(), "1.0");

        drop(commands);
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn connect_command_flows_through_the_actor() {
        let provider = MockProvider::new(FAUCET_NETWORK_ID);
        provider.set_accounts(vec![account()]);
        // Not authorized yet: the account stays hidden until Connect.

        let controller = controller(provider.clone());
        let mut views = controller.watch();
        let (commands, receiver) = mpsc::channel(8);

        let actor = tokio::spawn(controller.run(receiver));
        let view = views
            .wait_for(|view| view.phase == SessionPhase::Bound)
            .await
            .unwrap()
            .clone();
        assert_eq!(view.chain.account, None);

        commands.send(AppCommand::Connect).await.unwrap();
        let view = views
            .wait_for(|view| view.chain.account.is_some())
            .await
            .unwrap()
            .clone();
        assert_eq!(view.chain.account, Some(account()));

        drop(commands);
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn version_is_exported() {
        assert!(!spigot::version().is_empty());
    }
}
