use crate::{
    error::{PipelineError, PipelineResult},
    node::LedgerNode,
};
use solana_sdk::{commitment_config::CommitmentConfig, message::v0};
use tracing::debug;

/// Simulate the draft message and return the compute units it consumed.
///
/// The draft must be the exact message that will otherwise be sent (minus
/// the limit instruction appended afterwards), or the estimate is invalid.
/// A simulation-reported failure propagates unchanged: masking it behind a
/// default limit would let a doomed transaction reach the ledger and waste
/// fees. Single call, no retry; transient RPC errors propagate too.
pub async fn estimate_compute_units<N: LedgerNode + ?Sized>(
    node: &N,
    draft: &v0::Message,
    commitment: CommitmentConfig,
) -> PipelineResult<u32> {
    let outcome = node.simulate_message(draft, commitment).await?;

    if let Some(err) = outcome.err {
        return Err(PipelineError::Simulation {
            reason: err.to_string(),
            logs: outcome.logs,
        });
    }

    let units = outcome.units_consumed.ok_or_else(|| PipelineError::Simulation {
        reason: "simulation succeeded but reported no consumed units".to_string(),
        logs: outcome.logs,
    })?;

    debug!(units, "estimated compute unit limit from simulation");
    Ok(u32::try_from(units).unwrap_or(u32::MAX))
}
