use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    message::v0,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{TransactionError, VersionedTransaction},
};
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};
use tokio::sync::Notify;
use txflow::{
    LedgerNode, LifetimeAnchor, PipelineError, PipelineResult, SignatureStatus, SimulationOutcome,
};

struct FakeState {
    last_valid_block_height: u64,
    block_height: u64,
    block_height_delay: Option<Duration>,
    simulation: SimulationOutcome,
    submit_rejection: Option<String>,
    statuses: HashMap<Signature, SignatureStatus>,
    any_status: Option<SignatureStatus>,
    accounts: HashSet<Pubkey>,
    submissions: Vec<VersionedTransaction>,
    simulated_drafts: Vec<v0::Message>,
    anchors_served: u64,
}

/// Scripted stand-in for a ledger node's query, ingestion, and status
/// subscription endpoints.
///
/// Every served anchor carries a unique blockhash, mirroring the real
/// endpoint. Submissions and simulated drafts are recorded so tests can
/// assert what did (or did not) reach the ledger.
pub struct FakeLedgerNode {
    state: Mutex<FakeState>,
    status_ready: Notify,
}

impl Default for FakeLedgerNode {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLedgerNode {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                last_valid_block_height: 100,
                block_height: 1,
                block_height_delay: None,
                simulation: SimulationOutcome {
                    err: None,
                    units_consumed: Some(5_000),
                    logs: vec![],
                },
                submit_rejection: None,
                statuses: HashMap::new(),
                any_status: None,
                accounts: HashSet::new(),
                submissions: Vec::new(),
                simulated_drafts: Vec::new(),
                anchors_served: 0,
            }),
            status_ready: Notify::new(),
        }
    }

    /// Script the units every simulation reports as consumed.
    pub fn simulate_units(&self, units: u64) {
        let mut state = self.state.lock().unwrap();
        state.simulation = SimulationOutcome {
            err: None,
            units_consumed: Some(units),
            logs: vec![],
        };
    }

    /// Script every simulation to report an on-ledger failure.
    pub fn simulate_failure(&self, err: TransactionError, logs: Vec<String>) {
        let mut state = self.state.lock().unwrap();
        state.simulation = SimulationOutcome {
            err: Some(err),
            units_consumed: None,
            logs,
        };
    }

    /// Script the ingestion endpoint to reject every submission.
    pub fn reject_submissions(&self, reason: &str) {
        self.state.lock().unwrap().submit_rejection = Some(reason.to_string());
    }

    /// Deliver the status notification any pending (or future) signature
    /// watch resolves with, regardless of signature. `err` carries the
    /// revert when the transaction landed but failed.
    pub fn resolve_status(&self, err: Option<TransactionError>) {
        self.state.lock().unwrap().any_status = Some(SignatureStatus { err });
        self.status_ready.notify_waiters();
    }

    /// Deliver a status notification for one specific signature. Watches on
    /// other signatures keep waiting.
    pub fn resolve_status_for(&self, signature: Signature, err: Option<TransactionError>) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(signature, SignatureStatus { err });
        self.status_ready.notify_waiters();
    }

    pub fn set_block_height(&self, height: u64) {
        self.state.lock().unwrap().block_height = height;
    }

    /// Delay every height query by `delay`, imitating a slow or hung query
    /// endpoint.
    pub fn set_block_height_delay(&self, delay: Duration) {
        self.state.lock().unwrap().block_height_delay = Some(delay);
    }

    /// Validity height stamped on every anchor served from now on.
    pub fn set_last_valid_block_height(&self, height: u64) {
        self.state.lock().unwrap().last_valid_block_height = height;
    }

    pub fn add_account(&self, address: Pubkey) {
        self.state.lock().unwrap().accounts.insert(address);
    }

    /// How many anchors the query endpoint has served. Each pipeline run
    /// must fetch its own.
    pub fn anchors_served(&self) -> u64 {
        self.state.lock().unwrap().anchors_served
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().unwrap().submissions.len()
    }

    pub fn submissions(&self) -> Vec<VersionedTransaction> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn simulated_drafts(&self) -> Vec<v0::Message> {
        self.state.lock().unwrap().simulated_drafts.clone()
    }
}

#[async_trait]
impl LedgerNode for FakeLedgerNode {
    async fn latest_blockhash(
        &self,
        _commitment: CommitmentConfig,
    ) -> PipelineResult<LifetimeAnchor> {
        let mut state = self.state.lock().unwrap();
        state.anchors_served += 1;
        Ok(LifetimeAnchor {
            blockhash: Hash::new_unique(),
            last_valid_block_height: state.last_valid_block_height,
        })
    }

    async fn block_height(&self, _commitment: CommitmentConfig) -> PipelineResult<u64> {
        let delay = self.state.lock().unwrap().block_height_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.state.lock().unwrap().block_height)
    }

    async fn simulate_message(
        &self,
        message: &v0::Message,
        _commitment: CommitmentConfig,
    ) -> PipelineResult<SimulationOutcome> {
        let mut state = self.state.lock().unwrap();
        state.simulated_drafts.push(message.clone());
        Ok(state.simulation.clone())
    }

    async fn submit_transaction(
        &self,
        transaction: &VersionedTransaction,
        _commitment: CommitmentConfig,
        _skip_preflight: bool,
    ) -> PipelineResult<Signature> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.submit_rejection {
            return Err(PipelineError::Rejected(reason.clone()));
        }
        state.submissions.push(transaction.clone());
        Ok(transaction.signatures[0])
    }

    async fn await_signature_status(
        &self,
        signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> PipelineResult<SignatureStatus> {
        loop {
            let notified = self.status_ready.notified();
            {
                let state = self.state.lock().unwrap();
                if let Some(status) = state
                    .statuses
                    .get(signature)
                    .or(state.any_status.as_ref())
                {
                    return Ok(status.clone());
                }
            }
            notified.await;
        }
    }

    async fn account_exists(
        &self,
        address: &Pubkey,
        _commitment: CommitmentConfig,
    ) -> PipelineResult<bool> {
        Ok(self.state.lock().unwrap().accounts.contains(address))
    }
}
