//! Batch application of single-claim operations

use std::collections::HashSet;
use std::future::Future;

use tracing::warn;

use core_kernel::ClaimId;
use crate::error::ClaimError;

/// One claim that could not be processed, and why
#[derive(Debug)]
pub struct BulkFailure {
    pub claim_id: ClaimId,
    pub error: ClaimError,
}

impl BulkFailure {
    /// Human-readable reason
    pub fn reason(&self) -> String {
        self.error.to_string()
    }

    /// Stable error code, see `ClaimError::kind`
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

/// Per-item breakdown of a batch
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub succeeded: Vec<ClaimId>,
    pub failed: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failure_for(&self, claim_id: ClaimId) -> Option<&BulkFailure> {
        self.failed.iter().find(|f| f.claim_id == claim_id)
    }
}

/// Runs a single-claim operation over many IDs without failing the batch
///
/// Each item is its own atomic unit; there is no rollback across items.
/// Duplicate IDs are processed once, in first-occurrence order.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkOperationCoordinator;

impl BulkOperationCoordinator {
    pub async fn apply_to_many<F, Fut, T>(claim_ids: &[ClaimId], mut operation: F) -> BulkOutcome
    where
        F: FnMut(ClaimId) -> Fut,
        Fut: Future<Output = Result<T, ClaimError>>,
    {
        let mut seen = HashSet::with_capacity(claim_ids.len());
        let mut outcome = BulkOutcome::default();

        for &claim_id in claim_ids {
            if !seen.insert(claim_id) {
                continue;
            }
            match operation(claim_id).await {
                Ok(_) => outcome.succeeded.push(claim_id),
                Err(error) => {
                    warn!(claim_id = %claim_id, error = %error, "bulk item failed");
                    outcome.failed.push(BulkFailure { claim_id, error });
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failures_do_not_abort_batch() {
        let ids: Vec<ClaimId> = (0..3).map(|_| ClaimId::new()).collect();
        let bad = ids[1];

        let outcome = BulkOperationCoordinator::apply_to_many(&ids, |id| async move {
            if id == bad {
                Err(ClaimError::validation("not eligible"))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(outcome.succeeded, vec![ids[0], ids[2]]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failure_for(bad).map(|f| f.kind()), Some("validation_failed"));
        assert!(outcome.failed[0].reason().contains("not eligible"));
    }

    #[tokio::test]
    async fn test_duplicates_processed_once() {
        let a = ClaimId::new();
        let b = ClaimId::new();
        let mut calls = Vec::new();

        let outcome = BulkOperationCoordinator::apply_to_many(&[a, b, a, a], |id| {
            calls.push(id);
            async { Ok::<_, ClaimError>(()) }
        })
        .await;

        assert_eq!(calls, vec![a, b]);
        assert_eq!(outcome.total(), 2);
        assert!(outcome.all_succeeded());
    }
}
