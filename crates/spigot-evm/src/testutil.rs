//! Test doubles for the provider and artifact seams.
//!
//! Compiled for this crate's own tests and, via the `test-utils` feature,
//! for downstream crates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::json_abi::Function;
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::artifact::{ArtifactError, ArtifactSource, ContractArtifact};
use crate::provider::{
    CallRequest, ProviderDetector, ProviderError, ProviderEvent, Result, TxStatus, WalletProvider,
};

/// Network id the fixture Faucet artifact is deployed on.
pub const FAUCET_NETWORK_ID: u64 = 5777;

const FAUCET_CONTRACT: &str = "0x0dcd2f752394c41875e259e00bb44fd505297caf";

/// Address the fixture Faucet artifact is deployed at.
pub fn faucet_contract() -> Address {
    FAUCET_CONTRACT.parse().expect("fixture address parses")
}

/// Truffle-shaped Faucet build artifact with a single deployment on
/// [`FAUCET_NETWORK_ID`].
pub fn faucet_artifact_json() -> String {
    format!(
        r#"{{
  "contractName": "Faucet",
  "abi": [
    {{ "type": "function", "name": "addFunds", "inputs": [], "outputs": [], "stateMutability": "payable" }},
    {{ "type": "function", "name": "withdraw", "inputs": [{{ "name": "withdrawAmount", "type": "uint256" }}], "outputs": [], "stateMutability": "nonpayable" }}
  ],
  "networks": {{ "{FAUCET_NETWORK_ID}": {{ "address": "{FAUCET_CONTRACT}" }} }}
}}"#
    )
}

/// The parsed fixture artifact.
pub fn faucet_artifact() -> ContractArtifact {
    ContractArtifact::from_json("Faucet", &faucet_artifact_json()).expect("fixture parses")
}

fn withdraw_selector() -> [u8; 4] {
    Function::parse("withdraw(uint256)")
        .expect("valid signature")
        .selector()
        .0
}

struct MockState {
    chain_id: u64,
    accounts: Vec<Address>,
    authorized: bool,
    balances: HashMap<Address, U256>,
    reject_sends: bool,
    revert_sends: bool,
    decline_access: bool,
    submitted: Vec<CallRequest>,
    statuses: HashMap<B256, TxStatus>,
}

/// Scripted wallet provider double.
///
/// Accounts stay hidden until `request_accounts` authorizes them, mirroring
/// a real wallet's permission flow. Value-carrying sends credit the callee
/// and recognized `withdraw(uint256)` calldata debits it, so against this
/// double the faucet behaves like a contract that simply accumulates
/// deposits.
pub struct MockProvider {
    state: Mutex<MockState>,
    events: broadcast::Sender<ProviderEvent>,
    tx_counter: AtomicU64,
}

impl MockProvider {
    pub fn new(chain_id: u64) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            state: Mutex::new(MockState {
                chain_id,
                accounts: Vec::new(),
                authorized: false,
                balances: HashMap::new(),
                reject_sends: false,
                revert_sends: false,
                decline_access: false,
                submitted: Vec::new(),
                statuses: HashMap::new(),
            }),
            events,
            tx_counter: AtomicU64::new(0),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    /// Switch the selected network. Does not emit an event by itself.
    pub fn set_chain_id(&self, chain_id: u64) {
        self.lock().chain_id = chain_id;
    }

    /// Replace the wallet's account list.
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.lock().accounts = accounts;
    }

    /// Pre-authorize account access, as if the user had granted it earlier.
    pub fn authorize(&self) {
        self.lock().authorized = true;
    }

    /// Script the next permission requests to be declined.
    pub fn decline_access(&self, decline: bool) {
        self.lock().decline_access = decline;
    }

    /// Script all sends to be rejected before broadcast.
    pub fn reject_sends(&self, reject: bool) {
        self.lock().reject_sends = reject;
    }

    /// Script all sends to mine but revert.
    pub fn revert_sends(&self, revert: bool) {
        self.lock().revert_sends = revert;
    }

    /// Set an address balance directly.
    pub fn set_balance(&self, address: Address, wei: U256) {
        self.lock().balances.insert(address, wei);
    }

    /// Current balance of an address.
    pub fn balance(&self, address: Address) -> U256 {
        self.lock().balances.get(&address).copied().unwrap_or_default()
    }

    /// Every call submitted so far, in order.
    pub fn submitted(&self) -> Vec<CallRequest> {
        self.lock().submitted.clone()
    }

    /// Emit a change notification to all subscribers.
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    fn next_hash(&self) -> B256 {
        let n = self.tx_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let bytes: [u8; 32] = U256::from(n).to_be_bytes();
        B256::new(bytes)
    }
}

#[async_trait]
impl WalletProvider for MockProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        let mut state = self.lock();
        if state.decline_access {
            return Err(ProviderError::Rejected("user rejected the request".into()));
        }
        state.authorized = true;
        Ok(state.accounts.clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        let state = self.lock();
        if state.authorized {
            Ok(state.accounts.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.lock().chain_id)
    }

    async fn balance_of(&self, address: Address) -> Result<U256> {
        Ok(self.lock().balances.get(&address).copied().unwrap_or_default())
    }

    async fn send_transaction(&self, call: CallRequest) -> Result<B256> {
        let mut state = self.lock();
        if state.reject_sends {
            return Err(ProviderError::Rejected(
                "user rejected the transaction".into(),
            ));
        }

        let hash = self.next_hash();
        if state.revert_sends {
            state.statuses.insert(hash, TxStatus::Reverted);
            state.submitted.push(call);
            return Ok(hash);
        }

        if let Some(value) = call.value {
            let entry = state.balances.entry(call.to).or_default();
            *entry = entry.saturating_add(value);
        }
        if let Some(data) = &call.data {
            if data.len() >= 36 && data.starts_with(&withdraw_selector()) {
                let amount = U256::from_be_slice(&data[4..36]);
                let entry = state.balances.entry(call.to).or_default();
                *entry = entry.saturating_sub(amount);
            }
        }

        state.statuses.insert(hash, TxStatus::Success);
        state.submitted.push(call);
        Ok(hash)
    }

    async fn transaction_status(&self, hash: B256) -> Result<Option<TxStatus>> {
        Ok(self.lock().statuses.get(&hash).copied())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// Detector yielding a pre-built provider, or nothing at all.
pub struct MockDetector {
    provider: Option<Arc<MockProvider>>,
}

impl MockDetector {
    /// Detection will find the given provider.
    pub fn found(provider: Arc<MockProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Detection will conclude the environment has no provider.
    pub fn absent() -> Self {
        Self { provider: None }
    }
}

#[async_trait]
impl ProviderDetector for MockDetector {
    async fn detect(&self) -> Option<Arc<dyn WalletProvider>> {
        self.provider
            .clone()
            .map(|provider| provider as Arc<dyn WalletProvider>)
    }
}

/// In-memory artifact source.
#[derive(Default)]
pub struct FixtureArtifacts {
    artifacts: HashMap<String, ContractArtifact>,
}

impl FixtureArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an artifact, keyed by its contract name.
    pub fn with(mut self, artifact: ContractArtifact) -> Self {
        self.artifacts
            .insert(artifact.contract_name.clone(), artifact);
        self
    }
}

#[async_trait]
impl ArtifactSource for FixtureArtifacts {
    async fn fetch(&self, name: &str) -> std::result::Result<ContractArtifact, ArtifactError> {
        self.artifacts
            .get(name)
            .cloned()
            .ok_or_else(|| ArtifactError::NotFound {
                name: name.to_string(),
                reason: "no such fixture".to_string(),
            })
    }
}
