use crate::{
    config::PipelineConfig,
    error::{PipelineError, PipelineResult},
    message::SignedTransaction,
    node::LedgerNode,
};
use solana_sdk::signature::Signature;
use tokio::sync::watch;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Caller-held cancellation for an in-flight pipeline run.
///
/// Cancelling abandons the confirmation wait, but the transaction may
/// already be on its way and cannot be un-sent. The driver therefore
/// reports [`PipelineError::Cancelled`] ("outcome unknown"), never a
/// definite failure.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// The sending half of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the paired handle has cancelled. Never resolves if the
    /// handle is dropped without cancelling.
    async fn cancelled(mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Submit `signed` and wait until the ledger reports it at the configured
/// commitment.
///
/// States: `Submitted` (bytes handed to the ingestion endpoint) →
/// `AwaitingConfirmation` (signature-keyed status watch open) → one of
/// `Confirmed`, `Expired`, or `Failed`.
///
/// The wait is bounded twice over: by `config.confirm_timeout` and by the
/// anchor's last-valid-block-height, polled every
/// `config.expiry_poll_interval`. Whichever bound is observed first ends the
/// wait, timeout as [`PipelineError::ConfirmationTimeout`] and expiry as
/// [`PipelineError::Expired`]. Expiry is terminal for these bytes; landing
/// the work again takes a fresh anchor and a fresh signature, never a replay.
pub async fn send_and_confirm<N: LedgerNode + ?Sized>(
    node: &N,
    signed: &SignedTransaction,
    config: &PipelineConfig,
    cancel: Option<CancelToken>,
) -> PipelineResult<Signature> {
    // Re-check the structural preconditions at the broadcast boundary. A
    // violation here is a construction bug upstream.
    signed.check_blockhash_lifetime()?;
    signed.check_sendable()?;

    if let Some(token) = &cancel {
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
    }

    let signature = node
        .submit_transaction(signed.transaction(), config.commitment, config.skip_preflight)
        .await?;
    debug!(%signature, "transaction submitted, awaiting confirmation");

    let anchor = *signed.anchor();
    let started = Instant::now();
    let deadline = started + config.confirm_timeout;

    let status_wait = node.await_signature_status(&signature, config.commitment);

    let cancelled = async move {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };

    // The height poll owns its interval and races as a whole, so a slow
    // height query never delays observation of a status notification, the
    // deadline, or cancellation.
    let expiry_watch = async {
        let mut expiry_check = interval(config.expiry_poll_interval);
        expiry_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            expiry_check.tick().await;
            let observed = node.block_height(config.commitment).await?;
            if anchor.is_expired_at(observed) {
                return Ok::<u64, PipelineError>(observed);
            }
        }
    };

    tokio::select! {
        status = status_wait => {
            let status = status?;
            match status.err {
                None => {
                    info!(%signature, "transaction confirmed");
                    Ok(signature)
                }
                Some(err) => {
                    warn!(%signature, %err, "transaction landed but reverted");
                    Err(PipelineError::ExecutionFailed(err))
                }
            }
        }
        expired = expiry_watch => {
            let observed = expired?;
            warn!(
                %signature,
                observed,
                last_valid = anchor.last_valid_block_height,
                "lifetime anchor expired before confirmation"
            );
            Err(PipelineError::Expired {
                last_valid_block_height: anchor.last_valid_block_height,
                observed_block_height: observed,
            })
        }
        _ = sleep_until(deadline) => {
            warn!(%signature, "confirmation wait timed out; on-ledger outcome unknown");
            Err(PipelineError::ConfirmationTimeout {
                elapsed: started.elapsed(),
            })
        }
        _ = cancelled => {
            warn!(%signature, "confirmation wait cancelled; on-ledger outcome unknown");
            Err(PipelineError::Cancelled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_token_observes_handle() {
        let (handle, token) = cancel_pair();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
        token.cancelled().await; // resolves immediately once cancelled
    }

    #[test]
    fn test_cancelled_future_pends_until_cancel() {
        let (handle, token) = cancel_pair();
        let mut wait = tokio_test::task::spawn(token.cancelled());
        assert!(wait.poll().is_pending());
        handle.cancel();
        assert!(wait.is_woken());
        assert!(wait.poll().is_ready());
    }
}
