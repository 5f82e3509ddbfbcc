//! Custom Test Assertions
//!
//! Assertion helpers for claim workflow types that give more meaningful
//! failure messages than the standard macros.

use core_kernel::ClaimId;
use domain_claims::{AuditAction, AuditEntry, BulkOutcome, Claim, ClaimDetail, ClaimError, ClaimStatus};

/// Asserts that a claim is in the expected status
pub fn assert_status(claim: &Claim, expected: ClaimStatus) {
    assert_eq!(
        claim.status, expected,
        "Claim {} is {}, expected {}",
        claim.id, claim.status, expected
    );
}

/// Asserts that the audit entries carry exactly these actions, in order
pub fn assert_audit_actions(entries: &[AuditEntry], expected: &[AuditAction]) {
    let actual: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();
    assert_eq!(
        actual, expected,
        "Audit trail mismatch: actual={:?}, expected={:?}",
        actual, expected
    );
}

/// Asserts that a claim's stored totals agree with its detail lines
pub fn assert_totals_consistent(claim: &Claim, hourly_rate: u64) {
    let hours: u32 = claim.details.iter().map(ClaimDetail::hours).sum();
    assert_eq!(
        claim.total_working_hours, hours,
        "Claim {} stores {} hours but its lines sum to {}",
        claim.id, claim.total_working_hours, hours
    );
    assert_eq!(
        claim.total_claim_amount,
        u64::from(hours) * hourly_rate,
        "Claim {} amount is not hours x rate",
        claim.id
    );
}

/// Asserts a bulk outcome's successes and the error kinds of its failures
pub fn assert_bulk_outcome(outcome: &BulkOutcome, succeeded: &[ClaimId], failed: &[(ClaimId, &str)]) {
    assert_eq!(
        outcome.succeeded, succeeded,
        "Bulk successes mismatch"
    );
    let actual: Vec<(ClaimId, &str)> = outcome.failed.iter().map(|f| (f.claim_id, f.kind())).collect();
    assert_eq!(actual, failed, "Bulk failures mismatch");
}

/// Asserts that a result failed with the given `ClaimError::kind`
pub fn assert_error_kind<T: std::fmt::Debug>(result: &Result<T, ClaimError>, expected_kind: &str) {
    match result {
        Err(e) => assert_eq!(
            e.kind(),
            expected_kind,
            "Expected a {} error, got {:?}",
            expected_kind,
            e
        ),
        Ok(value) => panic!("Expected a {} error, got success: {:?}", expected_kind, value),
    }
}
