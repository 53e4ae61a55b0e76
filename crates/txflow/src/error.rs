use solana_client::nonblocking::pubsub_client::PubsubClientError;
use solana_sdk::{signer::SignerError, transaction::TransactionError};
use std::time::Duration;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can abort a transaction pipeline run.
///
/// Variants up to and including `Signing` mean the transaction was never
/// broadcast. `Rejected` means the ingestion endpoint refused the bytes.
/// `Expired` and `ExecutionFailed` are terminal on-ledger outcomes.
/// `ConfirmationTimeout` and `Cancelled` leave the on-ledger outcome unknown:
/// the bytes were submitted and cannot be un-sent.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("RPC error: {0}")]
    Rpc(#[from] solana_client::client_error::ClientError),

    #[error("status subscription error: {0}")]
    Subscription(#[from] PubsubClientError),

    #[error("transaction simulation failed: {reason}")]
    Simulation { reason: String, logs: Vec<String> },

    #[error("assembly invariant violated: {0}")]
    Assembly(String),

    #[error("signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("ledger rejected transaction: {0}")]
    Rejected(String),

    #[error(
        "lifetime anchor expired before confirmation: valid through block height \
         {last_valid_block_height}, observed {observed_block_height}"
    )]
    Expired {
        last_valid_block_height: u64,
        observed_block_height: u64,
    },

    #[error("transaction reverted on ledger: {0}")]
    ExecutionFailed(TransactionError),

    #[error("confirmation not observed within {elapsed:?}")]
    ConfirmationTimeout { elapsed: Duration },

    #[error("cancelled while confirmation was pending; on-ledger outcome unknown")]
    Cancelled,
}

impl PipelineError {
    /// True when resubmitting the same signed bytes can never succeed and a
    /// fresh anchor (and therefore a fresh signature) is required.
    pub fn requires_fresh_anchor(&self) -> bool {
        matches!(self, PipelineError::Expired { .. })
    }
}
