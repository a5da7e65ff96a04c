//! Wallet provider backed by a JSON-RPC node endpoint.
//!
//! Adapts a wallet-managed EVM endpoint to the [`WalletProvider`]
//! capability. Change notifications are produced by a background watcher
//! that polls the endpoint for chain and account changes and broadcasts a
//! [`ProviderEvent`] on every observed difference; the watcher is aborted
//! when the provider is dropped, so subscriptions never outlive a session.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::provider::{
    CallRequest, ProviderDetector, ProviderError, ProviderEvent, Result, TxStatus, WalletProvider,
};

/// JSON-RPC error code MetaMask-compatible wallets return when the user
/// rejects a request.
const USER_REJECTED_CODE: i64 = 4001;

const EVENT_CAPACITY: usize = 16;

/// A wallet provider connected to a specific RPC endpoint.
pub struct NodeProvider {
    provider: DynProvider<Ethereum>,
    rpc_url: String,
    events: broadcast::Sender<ProviderEvent>,
    watcher: JoinHandle<()>,
}

impl fmt::Debug for NodeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeProvider")
            .field("rpc_url", &self.rpc_url)
            .finish()
    }
}

impl NodeProvider {
    /// Connects to the given RPC endpoint and starts the change watcher.
    ///
    /// Connecting does not verify that the endpoint answers; use
    /// [`NodeProvider::detect`] for that.
    pub fn connect(rpc_url: &str, poll_interval: Duration) -> Result<Self> {
        let url: alloy::transports::http::reqwest::Url = rpc_url
            .parse()
            .map_err(|e| ProviderError::UrlParse(format!("{e}")))?;

        let provider = ProviderBuilder::new().connect_http(url).erased();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let watcher = tokio::spawn(watch_changes(
            provider.clone(),
            events.clone(),
            poll_interval,
        ));

        Ok(Self {
            provider,
            rpc_url: rpc_url.to_string(),
            events,
            watcher,
        })
    }

    /// Detects a wallet provider at `rpc_url` with a single probe.
    ///
    /// An endpoint that cannot be reached or does not answer a chain-id
    /// query means the environment has no provider. That is a valid
    /// terminal outcome logged at info level, never an error.
    pub async fn detect(rpc_url: &str, poll_interval: Duration) -> Option<Arc<Self>> {
        let node = match Self::connect(rpc_url, poll_interval) {
            Ok(node) => node,
            Err(e) => {
                tracing::info!(error = %e, "wallet provider not detected");
                return None;
            }
        };
        match node.chain_id().await {
            Ok(chain_id) => {
                tracing::info!(chain_id, url = %node.rpc_url(), "wallet provider detected");
                Some(Arc::new(node))
            }
            Err(e) => {
                tracing::info!(error = %e, url = %node.rpc_url(), "wallet provider not detected");
                None
            }
        }
    }

    /// The RPC endpoint this provider is connected to.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

impl Drop for NodeProvider {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

#[async_trait]
impl WalletProvider for NodeProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.provider
            .raw_request("eth_requestAccounts".into(), ())
            .await
            .map_err(map_rpc_err)
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.provider.get_accounts().await.map_err(map_rpc_err)
    }

    async fn chain_id(&self) -> Result<u64> {
        self.provider.get_chain_id().await.map_err(map_rpc_err)
    }

    async fn balance_of(&self, address: Address) -> Result<U256> {
        self.provider.get_balance(address).await.map_err(map_rpc_err)
    }

    async fn send_transaction(&self, call: CallRequest) -> Result<B256> {
        let mut tx = TransactionRequest::default().from(call.from).to(call.to);
        if let Some(value) = call.value {
            tx = tx.value(value);
        }
        if let Some(data) = call.data {
            tx = tx.input(data.into());
        }

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(map_rpc_err)?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_status(&self, hash: B256) -> Result<Option<TxStatus>> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(map_rpc_err)?;
        Ok(receipt.map(|r| {
            if r.status() {
                TxStatus::Success
            } else {
                TxStatus::Reverted
            }
        }))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// [`ProviderDetector`] for a node-backed wallet endpoint.
#[derive(Debug, Clone)]
pub struct NodeDetector {
    rpc_url: String,
    poll_interval: Duration,
}

impl NodeDetector {
    pub fn new(rpc_url: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            poll_interval,
        }
    }
}

#[async_trait]
impl ProviderDetector for NodeDetector {
    async fn detect(&self) -> Option<Arc<dyn WalletProvider>> {
        NodeProvider::detect(&self.rpc_url, self.poll_interval)
            .await
            .map(|node| node as Arc<dyn WalletProvider>)
    }
}

fn map_rpc_err(e: RpcError<TransportErrorKind>) -> ProviderError {
    if let Some(payload) = e.as_error_resp() {
        if payload.code == USER_REJECTED_CODE {
            return ProviderError::Rejected(payload.message.to_string());
        }
    }
    ProviderError::Rpc(e.to_string())
}

/// Polls the endpoint and broadcasts an event whenever the chain id or the
/// account list differs from the last observation. The first observation
/// only seeds the baseline.
async fn watch_changes(
    provider: DynProvider<Ethereum>,
    events: broadcast::Sender<ProviderEvent>,
    poll_interval: Duration,
) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut last_chain: Option<u64> = None;
    let mut last_accounts: Option<Vec<Address>> = None;

    loop {
        interval.tick().await;

        if let Ok(chain_id) = provider.get_chain_id().await {
            let changed = last_chain.is_some_and(|prev| prev != chain_id);
            last_chain = Some(chain_id);
            if changed {
                tracing::debug!(chain_id, "network change observed");
                let _ = events.send(ProviderEvent::ChainChanged);
            }
        }

        if let Ok(accounts) = provider.get_accounts().await {
            let changed = last_accounts.as_ref().is_some_and(|prev| prev != &accounts);
            last_accounts = Some(accounts);
            if changed {
                tracing::debug!("account set change observed");
                let _ = events.send(ProviderEvent::AccountsChanged);
            }
        }
    }
}
