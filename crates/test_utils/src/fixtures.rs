//! Pre-built Test Fixtures
//!
//! Ready-to-use data and a fully wired in-memory workflow for tests across
//! the workspace. Everything here is deterministic apart from generated IDs.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use core_kernel::{ClaimId, ProjectId, StaffId};
use domain_claims::ports::mock::{
    MockAuditStore, MockClaimStore, MockClock, MockMailSender, MockRateLookup, MockStaffDirectory,
};
use domain_claims::{
    Claim, ClaimWorkflowService, NewDetailLine, NotificationDispatcher, NotificationIntent,
    NotificationQueue, ProjectEnrollment, StaffProfile, WorkflowConfig, WorkflowPorts,
};

use crate::builders::StaffProfileBuilder;

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// The instant the mock clock starts at (Mon 1 Jul 2024, 09:00 UTC)
    pub fn reference_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap()
    }

    /// A detail line on `day` of July 2024 between two whole hours
    pub fn evening(day: u32, from_hour: u32, to_hour: u32) -> NewDetailLine {
        NewDetailLine::new(
            Utc.with_ymd_and_hms(2024, 7, day, from_hour, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 7, day, to_hour, 0, 0).unwrap(),
        )
    }

    /// Two lines worth 8h and 4h
    pub fn eight_plus_four() -> Vec<NewDetailLine> {
        vec![
            Self::evening(1, 10, 18).with_remark("release weekend"),
            Self::evening(2, 18, 22),
        ]
    }

    /// A single line whose end precedes its start
    pub fn reversed_line() -> NewDetailLine {
        let start = Utc.with_ymd_and_hms(2024, 7, 3, 22, 0, 0).unwrap();
        NewDetailLine::new(start, start - Duration::hours(2))
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    /// A deterministic claim ID that no store contains
    pub fn unknown_claim_id() -> ClaimId {
        ClaimId::from_uuid(Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440002))
    }

    /// A deterministic staff ID that no directory contains
    pub fn unknown_staff_id() -> StaffId {
        StaffId::from_uuid(Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440003))
    }
}

/// Fixture for staff directory records
pub struct StaffFixtures;

impl StaffFixtures {
    pub fn staff() -> StaffProfile {
        StaffProfileBuilder::new("Ana Staff").with_role("staff").build()
    }

    pub fn approver() -> StaffProfile {
        StaffProfileBuilder::new("Max Manager")
            .with_role("Approver")
            .with_department("Delivery")
            .build()
    }

    pub fn finance() -> StaffProfile {
        StaffProfileBuilder::new("Fay Finance")
            .with_role("FINANCE")
            .with_department("Finance")
            .build()
    }

    pub fn admin() -> StaffProfile {
        StaffProfileBuilder::new("Ada Admin")
            .with_role("admin")
            .with_department("IT")
            .build()
    }
}

/// Hourly rate every `ClaimsWorld` member is paid at
pub const WORLD_HOURLY_RATE: u64 = 25;

/// A complete in-memory claims workflow with a small cast of actors
///
/// * `owner` (staff) and `manager` (approver) are enrolled in `project_id`,
///   which `manager` manages
/// * `other_manager` (approver) manages `other_project_id` only
/// * `finance` and `admin` are not enrolled anywhere
/// * `approver_owner` is an approver enrolled as a member of `project_id`
/// * `finance_owner` is a second finance user enrolled in `project_id`, so
///   finance staff can own claims there
pub struct ClaimsWorld {
    pub service: ClaimWorkflowService,
    pub claims: Arc<MockClaimStore>,
    pub audit: Arc<MockAuditStore>,
    pub directory: Arc<MockStaffDirectory>,
    pub mailer: Arc<MockMailSender>,
    pub clock: Arc<MockClock>,
    pub notifications: mpsc::UnboundedReceiver<NotificationIntent>,
    pub owner: StaffProfile,
    pub manager: StaffProfile,
    pub other_manager: StaffProfile,
    pub approver_owner: StaffProfile,
    pub finance: StaffProfile,
    pub finance_owner: StaffProfile,
    pub admin: StaffProfile,
    pub project_id: ProjectId,
    pub other_project_id: ProjectId,
}

impl Default for ClaimsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimsWorld {
    pub fn new() -> Self {
        Self::with_config(WorkflowConfig::default())
    }

    pub fn with_config(config: WorkflowConfig) -> Self {
        let owner = StaffFixtures::staff();
        let manager = StaffFixtures::approver();
        let other_manager = StaffProfileBuilder::new("Olga Other").with_role("approver").build();
        let approver_owner = StaffProfileBuilder::new("Pat Peer").with_role("approver").build();
        let finance = StaffFixtures::finance();
        let finance_owner = StaffProfileBuilder::new("Fran Ledger").with_role("finance").build();
        let admin = StaffFixtures::admin();
        let project_id = ProjectId::new_v7();
        let other_project_id = ProjectId::new_v7();

        let directory = Arc::new(
            MockStaffDirectory::new()
                .with_staff(owner.clone())
                .with_staff(manager.clone())
                .with_staff(other_manager.clone())
                .with_staff(approver_owner.clone())
                .with_staff(finance.clone())
                .with_staff(finance_owner.clone())
                .with_staff(admin.clone())
                .with_project(ProjectEnrollment {
                    project_id,
                    project_name: "Apollo".to_string(),
                    manager_id: manager.id,
                    members: vec![owner.id, approver_owner.id, finance_owner.id],
                })
                .with_project(ProjectEnrollment {
                    project_id: other_project_id,
                    project_name: "Borealis".to_string(),
                    manager_id: other_manager.id,
                    members: Vec::new(),
                }),
        );

        let claims = Arc::new(MockClaimStore::new());
        let audit = Arc::new(MockAuditStore::new());
        let mailer = Arc::new(MockMailSender::new());
        let clock = Arc::new(MockClock::at(TemporalFixtures::reference_now()));
        let (queue, notifications) = NotificationQueue::new();

        let service = ClaimWorkflowService::new(
            WorkflowPorts {
                claims: claims.clone(),
                audit: audit.clone(),
                directory: directory.clone(),
                rates: Arc::new(MockRateLookup::new(WORLD_HOURLY_RATE)),
                clock: clock.clone(),
            },
            queue,
            config,
        );

        Self {
            service,
            claims,
            audit,
            directory,
            mailer,
            clock,
            notifications,
            owner,
            manager,
            other_manager,
            approver_owner,
            finance,
            finance_owner,
            admin,
            project_id,
            other_project_id,
        }
    }

    /// Dispatcher wired to this world's directory and mailer
    pub fn dispatcher(&self) -> NotificationDispatcher {
        NotificationDispatcher::new(self.directory.clone(), self.mailer.clone())
    }

    /// Moves the clock forward by one minute
    pub fn tick(&self) {
        self.clock.advance(Duration::minutes(1));
    }

    /// Intents queued since the last drain
    pub fn drain_notifications(&mut self) -> Vec<NotificationIntent> {
        let mut drained = Vec::new();
        while let Ok(intent) = self.notifications.try_recv() {
            drained.push(intent);
        }
        drained
    }

    /// A draft owned by `owner` with 8h + 4h of detail lines
    pub async fn draft_claim(&self) -> Claim {
        self.draft_claim_for(self.owner.id).await
    }

    pub async fn draft_claim_for(&self, owner_id: StaffId) -> Claim {
        self.service
            .create_claim(owner_id, self.project_id, &TemporalFixtures::eight_plus_four(), None)
            .await
            .expect("fixture claim should be creatable")
    }

    /// A claim by `owner` already submitted for approval
    pub async fn pending_claim(&self) -> Claim {
        let draft = self.draft_claim().await;
        self.tick();
        self.service
            .submit_claim(draft.id, self.owner.id)
            .await
            .expect("fixture claim should be submittable")
            .claim
    }

    /// A claim by `owner` approved by `manager`
    pub async fn approved_claim(&self) -> Claim {
        let pending = self.pending_claim().await;
        self.tick();
        self.service
            .approve_claim(pending.id, self.manager.id, None)
            .await
            .expect("fixture claim should be approvable")
            .claim
    }
}
