use solana_sdk::hash::Hash;

/// A recent blockhash plus the last block height at which a transaction
/// signed against it can still land.
///
/// Anchors are short-lived. The pipeline fetches a fresh one per transaction
/// and never reuses one across runs: once the ledger advances past
/// `last_valid_block_height`, anything signed against this anchor is
/// permanently unconfirmable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifetimeAnchor {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

impl LifetimeAnchor {
    pub fn is_expired_at(&self, block_height: u64) -> bool {
        block_height > self.last_valid_block_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let anchor = LifetimeAnchor {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 100,
        };
        assert!(!anchor.is_expired_at(99));
        assert!(!anchor.is_expired_at(100));
        assert!(anchor.is_expired_at(101));
    }
}
