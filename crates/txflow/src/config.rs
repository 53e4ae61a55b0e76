use solana_sdk::commitment_config::CommitmentConfig;
use std::time::Duration;

/// Configuration for a transaction pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Commitment level a transaction must reach to count as confirmed.
    pub commitment: CommitmentConfig,

    /// Priority price in micro-lamports per compute unit, attached to every
    /// transaction ahead of the caller's instructions.
    pub priority_micro_lamports: u64,

    /// Explicit cap on the confirmation wait. The wait also ends when the
    /// lifetime anchor expires; whichever bound is observed first wins.
    pub confirm_timeout: Duration,

    /// How often the driver polls block height to detect anchor expiry.
    pub expiry_poll_interval: Duration,

    /// Whether the ingestion endpoint should skip its preflight simulation.
    /// The pipeline simulates every draft itself before signing, so the
    /// default avoids running the same simulation twice.
    pub skip_preflight: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            commitment: CommitmentConfig::confirmed(),
            priority_micro_lamports: 100_000,
            confirm_timeout: Duration::from_secs(90),
            expiry_poll_interval: Duration::from_secs(2),
            skip_preflight: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.commitment, CommitmentConfig::confirmed());
        assert_eq!(config.priority_micro_lamports, 100_000);
        assert_eq!(config.confirm_timeout, Duration::from_secs(90));
        assert!(config.skip_preflight);
    }
}
