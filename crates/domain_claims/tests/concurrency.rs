//! Lost-update protection between writers of the same claim

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use core_kernel::{ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError, StaffId};
use domain_claims::ports::mock::{MockAuditStore, MockClaimStore, MockClock, MockRateLookup};
use domain_claims::{
    AuditAction, Claim, ClaimError, ClaimStatus, ClaimStore, ClaimWorkflowService, NotificationQueue,
    WorkflowConfig, WorkflowPorts,
};
use test_utils::{assert_audit_actions, assert_status, ClaimsWorld, TemporalFixtures};

/// Store that lets another writer commit between our read and our save
#[derive(Debug)]
struct RacingClaimStore {
    inner: MockClaimStore,
    race_next_save: AtomicBool,
}

impl DomainPort for RacingClaimStore {}

#[async_trait]
impl HealthCheckable for RacingClaimStore {
    async fn health_check(&self) -> HealthCheckResult {
        self.inner.health_check().await
    }
}

#[async_trait]
impl ClaimStore for RacingClaimStore {
    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        self.inner.get_claim(id).await
    }

    async fn insert_claim(&self, claim: &Claim) -> Result<(), PortError> {
        self.inner.insert_claim(claim).await
    }

    async fn save_claim(&self, claim: &Claim, expected_version: u64) -> Result<(), PortError> {
        if self.race_next_save.swap(false, Ordering::SeqCst) {
            let mut rival = self.inner.get_claim(claim.id).await?;
            rival.status = ClaimStatus::Cancelled;
            rival.version += 1;
            self.inner.save_claim(&rival, rival.version - 1).await?;
        }
        self.inner.save_claim(claim, expected_version).await
    }

    async fn list_by_status(&self, status: ClaimStatus) -> Result<Vec<Claim>, PortError> {
        self.inner.list_by_status(status).await
    }

    async fn list_by_owner(&self, owner_id: StaffId) -> Result<Vec<Claim>, PortError> {
        self.inner.list_by_owner(owner_id).await
    }
}

#[tokio::test]
async fn test_losing_writer_sees_conflict_and_leaves_no_trace() {
    let world = ClaimsWorld::new();
    let pending = world.pending_claim().await;

    let store = Arc::new(RacingClaimStore {
        inner: MockClaimStore::with_claims(vec![pending.clone()]).await,
        race_next_save: AtomicBool::new(true),
    });
    let audit = Arc::new(MockAuditStore::new());
    let (queue, mut notifications) = NotificationQueue::new();
    let service = ClaimWorkflowService::new(
        WorkflowPorts {
            claims: store.clone(),
            audit: audit.clone(),
            directory: world.directory.clone(),
            rates: Arc::new(MockRateLookup::new(25)),
            clock: Arc::new(MockClock::at(TemporalFixtures::reference_now())),
        },
        queue,
        WorkflowConfig::default(),
    );

    let result = service.approve_claim(pending.id, world.manager.id, None).await;
    assert!(matches!(result, Err(ClaimError::ConcurrencyConflict(_))));

    // The rival write stands; ours left neither audit entry nor notification
    assert_status(&store.get_claim(pending.id).await.unwrap(), ClaimStatus::Cancelled);
    assert_audit_actions(&service.list_audit_trail(pending.id).await.unwrap(), &[]);
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_stale_save_is_refused() {
    let world = ClaimsWorld::new();
    let draft = world.draft_claim().await;
    let stale = world.service.get_claim(draft.id).await.unwrap();

    world.service.submit_claim(draft.id, world.owner.id).await.unwrap();

    let mut overwrite = stale.clone();
    overwrite.version = stale.version + 1;
    let result = world.claims.save_claim(&overwrite, stale.version).await;
    assert!(result.unwrap_err().is_conflict());
    assert_status(&world.service.get_claim(draft.id).await.unwrap(), ClaimStatus::PendingApproval);
}

#[tokio::test]
async fn test_two_reviewers_racing_on_one_claim() {
    let world = ClaimsWorld::new();
    let pending = world.pending_claim().await;

    let (by_manager, by_finance) = tokio::join!(
        world.service.approve_claim(pending.id, world.manager.id, None),
        world.service.reject_claim(pending.id, world.finance.id, None),
    );

    let outcomes = [by_manager.map(|o| o.claim.status), by_finance.map(|o| o.claim.status)];
    let winners = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(winners, 1, "exactly one reviewer should win: {outcomes:?}");
    for loser in outcomes.iter().filter_map(|o| o.as_ref().err()) {
        assert!(
            matches!(loser.kind(), "invalid_transition" | "concurrency_conflict"),
            "unexpected loser error: {loser:?}"
        );
    }

    let review_entries = world
        .service
        .list_audit_trail(pending.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| matches!(e.action, AuditAction::Approve | AuditAction::Reject))
        .count();
    assert_eq!(review_entries, 1);
}
