use crate::{
    error::{PipelineError, PipelineResult},
    lifetime::LifetimeAnchor,
};
use async_trait::async_trait;
use futures::{future::BoxFuture, StreamExt};
use solana_client::{
    nonblocking::{
        pubsub_client::{PubsubClient, PubsubClientError},
        rpc_client::RpcClient,
    },
    rpc_config::{
        RpcSendTransactionConfig, RpcSignatureSubscribeConfig, RpcSimulateTransactionConfig,
    },
    rpc_response::RpcSignatureResult,
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::{TransactionError, VersionedTransaction},
};
use std::sync::Arc;
use tracing::debug;

/// Result of simulating a draft message against current ledger state.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub err: Option<TransactionError>,
    pub units_consumed: Option<u64>,
    pub logs: Vec<String>,
}

/// A status notification for a watched signature at the requested commitment.
/// `err` is the on-ledger failure if the transaction landed but reverted.
#[derive(Debug, Clone)]
pub struct SignatureStatus {
    pub err: Option<TransactionError>,
}

/// Connection handle to a ledger network's query, ingestion, and status
/// subscription endpoints.
///
/// The pipeline takes this as an injected dependency so runs are testable
/// against a substitutable fake. Implementations must be safe for concurrent
/// use: independent pipeline runs share one node.
#[async_trait]
pub trait LedgerNode: Send + Sync {
    /// Fetch a fresh lifetime anchor. Implementations must not cache:
    /// every call issues a new query.
    async fn latest_blockhash(
        &self,
        commitment: CommitmentConfig,
    ) -> PipelineResult<LifetimeAnchor>;

    /// Current block height at the given commitment.
    async fn block_height(&self, commitment: CommitmentConfig) -> PipelineResult<u64>;

    /// Simulate `message` without committing it.
    async fn simulate_message(
        &self,
        message: &v0::Message,
        commitment: CommitmentConfig,
    ) -> PipelineResult<SimulationOutcome>;

    /// Submit raw signed bytes to the ingestion endpoint. A rejection of the
    /// bytes themselves surfaces as [`PipelineError::Rejected`].
    async fn submit_transaction(
        &self,
        transaction: &VersionedTransaction,
        commitment: CommitmentConfig,
        skip_preflight: bool,
    ) -> PipelineResult<Signature>;

    /// Block until the ledger reports `signature` processed at `commitment`.
    ///
    /// Each call watches exactly one signature, so concurrent waits on a
    /// shared node cannot misattribute a notification. The returned status
    /// carries the on-ledger error if the transaction reverted. Callers are
    /// expected to bound this wait themselves; see the driver.
    async fn await_signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> PipelineResult<SignatureStatus>;

    /// Whether an account exists at the given commitment. This is the probe
    /// behind the caller-side "check existence, conditionally create" idiom;
    /// the pipeline itself never calls it.
    async fn account_exists(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> PipelineResult<bool>;
}

type UnsubscribeFn = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Retires a signature subscription on the shared pubsub connection.
///
/// Dropping the notification stream alone leaves the subscription
/// registered client- and server-side, and a wait abandoned by the driver
/// (expiry, timeout, cancellation) drops it mid-await, so the guard sends
/// the unsubscribe request from `Drop` as well as from the normal path.
struct SubscriptionGuard {
    unsubscribe: Option<UnsubscribeFn>,
}

impl SubscriptionGuard {
    fn new(unsubscribe: UnsubscribeFn) -> Self {
        Self {
            unsubscribe: Some(unsubscribe),
        }
    }

    async fn finish(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe().await;
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(unsubscribe());
            }
        }
    }
}

/// [`LedgerNode`] backed by a JSON-RPC endpoint and a websocket pubsub
/// endpoint. Both inner clients are long-lived and shared across runs.
pub struct RpcLedgerNode {
    rpc: Arc<RpcClient>,
    pubsub: Arc<PubsubClient>,
}

impl RpcLedgerNode {
    /// Connect to the network's query endpoint (`rpc_url`) and status
    /// subscription endpoint (`ws_url`).
    pub async fn connect(
        rpc_url: &str,
        ws_url: &str,
        commitment: CommitmentConfig,
    ) -> PipelineResult<Self> {
        let rpc = Arc::new(RpcClient::new_with_commitment(
            rpc_url.to_string(),
            commitment,
        ));
        let pubsub = Arc::new(PubsubClient::new(ws_url).await?);
        Ok(Self { rpc, pubsub })
    }

    /// The underlying RPC client, for operations outside the pipeline.
    pub fn rpc_client(&self) -> &RpcClient {
        &self.rpc
    }
}

#[async_trait]
impl LedgerNode for RpcLedgerNode {
    async fn latest_blockhash(
        &self,
        commitment: CommitmentConfig,
    ) -> PipelineResult<LifetimeAnchor> {
        let (blockhash, last_valid_block_height) = self
            .rpc
            .get_latest_blockhash_with_commitment(commitment)
            .await?;
        Ok(LifetimeAnchor {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn block_height(&self, commitment: CommitmentConfig) -> PipelineResult<u64> {
        Ok(self.rpc.get_block_height_with_commitment(commitment).await?)
    }

    async fn simulate_message(
        &self,
        message: &v0::Message,
        commitment: CommitmentConfig,
    ) -> PipelineResult<SimulationOutcome> {
        // The draft is unsigned at this point; simulate the exact bytes that
        // will be signed, against the anchor already in the message.
        let transaction = VersionedTransaction {
            signatures: vec![
                Signature::default();
                message.header.num_required_signatures as usize
            ],
            message: VersionedMessage::V0(message.clone()),
        };

        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: false,
            commitment: Some(commitment),
            encoding: None,
            accounts: None,
            min_context_slot: None,
            inner_instructions: false,
        };

        let response = self
            .rpc
            .simulate_transaction_with_config(&transaction, config)
            .await?;
        let value = response.value;
        Ok(SimulationOutcome {
            err: value.err,
            units_consumed: value.units_consumed,
            logs: value.logs.unwrap_or_default(),
        })
    }

    async fn submit_transaction(
        &self,
        transaction: &VersionedTransaction,
        commitment: CommitmentConfig,
        skip_preflight: bool,
    ) -> PipelineResult<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight,
            preflight_commitment: Some(commitment.commitment),
            encoding: None,
            // The pipeline owns expiry handling; the RPC node must not
            // re-send on its own.
            max_retries: Some(0),
            min_context_slot: None,
        };

        match self
            .rpc
            .send_transaction_with_config(transaction, config)
            .await
        {
            Ok(signature) => Ok(signature),
            Err(e) => match e.get_transaction_error() {
                Some(err) => Err(PipelineError::Rejected(err.to_string())),
                None => Err(PipelineError::Rpc(e)),
            },
        }
    }

    async fn await_signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> PipelineResult<SignatureStatus> {
        let config = RpcSignatureSubscribeConfig {
            commitment: Some(commitment),
            enable_received_notification: Some(false),
        };
        let (mut stream, unsubscribe) = self
            .pubsub
            .signature_subscribe(signature, Some(config))
            .await?;
        let guard = SubscriptionGuard::new(unsubscribe);
        debug!(%signature, "watching signature status");

        let status = loop {
            match stream.next().await {
                Some(response) => match response.value {
                    RpcSignatureResult::ProcessedSignature(result) => {
                        break Ok(SignatureStatus { err: result.err });
                    }
                    RpcSignatureResult::ReceivedSignature(_) => continue,
                },
                None => {
                    break Err(PipelineError::Subscription(
                        PubsubClientError::ConnectionClosed(
                            "signature subscription ended before a status arrived".to_string(),
                        ),
                    ));
                }
            }
        };

        drop(stream);
        guard.finish().await;
        status
    }

    async fn account_exists(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> PipelineResult<bool> {
        let response = self
            .rpc
            .get_account_with_commitment(address, commitment)
            .await?;
        Ok(response.value.is_some())
    }
}
