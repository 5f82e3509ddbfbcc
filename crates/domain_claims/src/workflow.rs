//! Claim Workflow Service
//!
//! Orchestrates every claim operation with the same shape:
//!
//! 1. load the claim (`NotFound` if absent)
//! 2. resolve the actor's role and ownership
//! 3. let `ClaimStateMachine` decide the target status
//! 4. apply the cross-identity rules (conflict of interest, approver scope)
//! 5. save the new state with a version check (one atomic unit)
//! 6. append the audit entry, strictly after the save
//! 7. build a notification intent and push it onto the queue
//!
//! Steps 1-5 either all succeed or nothing is stored. Steps 6 and 7 never
//! undo a committed save: an audit failure is logged as an error, a
//! notification failure as a warning.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use core_kernel::{ClaimId, Clock, PortError, ProjectId, StaffId};

use crate::audit::{AuditAction, AuditEntry, AuditLogger};
use crate::bulk::{BulkOperationCoordinator, BulkOutcome};
use crate::claim::{check_remark_length, normalize_remark, validate_details, Claim, ClaimStatus, NewDetailLine};
use crate::error::ClaimError;
use crate::export::{ClaimExport, ExportRow};
use crate::notification::{ClaimSummary, NotificationIntent, Recipient, TemplateKind};
use crate::ports::{AuditStore, ClaimStore, ProjectEnrollment, RateLookup, StaffDirectory, StaffProfile};
use crate::queue::NotificationQueue;
use crate::role::{Actor, Role};
use crate::state_machine::{ClaimAction, ClaimStateMachine};

/// Tunables for the workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Maximum length, in characters, of any remark
    pub remark_max_len: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { remark_max_len: 500 }
    }
}

/// The collaborators the service is constructed with
#[derive(Clone)]
pub struct WorkflowPorts {
    pub claims: Arc<dyn ClaimStore>,
    pub audit: Arc<dyn AuditStore>,
    pub directory: Arc<dyn StaffDirectory>,
    pub rates: Arc<dyn RateLookup>,
    pub clock: Arc<dyn Clock>,
}

/// Result of a committed transition
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub claim: Claim,
    /// The intent that was queued, if the transition notifies anyone
    pub notification: Option<NotificationIntent>,
}

/// Claim lifecycle orchestration
pub struct ClaimWorkflowService {
    claims: Arc<dyn ClaimStore>,
    audit: AuditLogger,
    directory: Arc<dyn StaffDirectory>,
    rates: Arc<dyn RateLookup>,
    clock: Arc<dyn Clock>,
    notifications: NotificationQueue,
    config: WorkflowConfig,
}

impl ClaimWorkflowService {
    pub fn new(ports: WorkflowPorts, notifications: NotificationQueue, config: WorkflowConfig) -> Self {
        Self {
            claims: ports.claims,
            audit: AuditLogger::new(ports.audit),
            directory: ports.directory,
            rates: ports.rates,
            clock: ports.clock,
            notifications,
            config,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Owner operations
    // ------------------------------------------------------------------

    /// Creates a draft claim for `owner_id`
    ///
    /// The owner must hold a claim-owning role and be enrolled in the project.
    #[instrument(skip_all, fields(owner_id = %owner_id, project_id = %project_id))]
    pub async fn create_claim(
        &self,
        owner_id: StaffId,
        project_id: ProjectId,
        details: &[NewDetailLine],
        remark: Option<&str>,
    ) -> Result<Claim, ClaimError> {
        let actor = self.resolve_actor(owner_id).await?;
        if !actor.role.can_own_claims() {
            return Err(ClaimError::unauthorized(format!(
                "role {} may not create claims",
                actor.role
            )));
        }

        let remark = normalize_remark(remark);
        check_remark_length(remark.as_deref(), self.config.remark_max_len)?;
        let details = validate_details(details, self.config.remark_max_len)?;

        let enrollment = self.directory.get_project_enrollment(project_id).await?;
        if !enrollment.is_enrolled(owner_id) {
            return Err(ClaimError::validation(format!(
                "staff {owner_id} is not enrolled in project {project_id}"
            )));
        }

        let rate = self.rates.hourly_rate(owner_id, project_id).await?;
        let claim = Claim::draft(owner_id, project_id, details, remark, rate, self.clock.now());
        self.claims.insert_claim(&claim).await?;

        self.record_audit(claim.id, AuditAction::Create, owner_id, None).await;
        info!(claim_id = %claim.id, hours = claim.total_working_hours, "claim created");
        Ok(claim)
    }

    /// Replaces a draft's detail lines wholesale and recomputes totals
    #[instrument(skip_all, fields(claim_id = %claim_id, actor_id = %actor_id))]
    pub async fn update_claim(
        &self,
        claim_id: ClaimId,
        actor_id: StaffId,
        details: &[NewDetailLine],
        remark: Option<&str>,
    ) -> Result<Claim, ClaimError> {
        let claim = self.claims.get_claim(claim_id).await?;
        let actor = self.resolve_actor(actor_id).await?;
        let is_owner = claim.owner_id == actor.id;

        ClaimStateMachine::attempt_transition(
            claim.status,
            ClaimAction::Update,
            actor.role,
            is_owner,
            None,
        )?;

        let remark = normalize_remark(remark);
        check_remark_length(remark.as_deref(), self.config.remark_max_len)?;
        let details = validate_details(details, self.config.remark_max_len)?;
        let rate = self.rates.hourly_rate(claim.owner_id, claim.project_id).await?;

        let expected_version = claim.version;
        let mut updated = claim;
        updated.replace_details(details, remark, rate, self.clock.now());
        let updated = self.persist(updated, expected_version).await?;

        self.record_audit(claim_id, AuditAction::Update, actor_id, None).await;
        info!(hours = updated.total_working_hours, "claim updated");
        Ok(updated)
    }

    pub async fn submit_claim(&self, claim_id: ClaimId, actor_id: StaffId) -> Result<TransitionOutcome, ClaimError> {
        self.transition(claim_id, actor_id, ClaimAction::Submit, None).await
    }

    pub async fn cancel_claim(&self, claim_id: ClaimId, actor_id: StaffId) -> Result<TransitionOutcome, ClaimError> {
        self.transition(claim_id, actor_id, ClaimAction::Cancel, None).await
    }

    // ------------------------------------------------------------------
    // Review operations
    // ------------------------------------------------------------------

    pub async fn approve_claim(
        &self,
        claim_id: ClaimId,
        actor_id: StaffId,
        remark: Option<&str>,
    ) -> Result<TransitionOutcome, ClaimError> {
        self.transition(claim_id, actor_id, ClaimAction::Approve, remark).await
    }

    /// Sends a pending claim back to its owner; `remark` is mandatory
    pub async fn return_claim(
        &self,
        claim_id: ClaimId,
        actor_id: StaffId,
        remark: &str,
    ) -> Result<TransitionOutcome, ClaimError> {
        self.transition(claim_id, actor_id, ClaimAction::Return, Some(remark)).await
    }

    pub async fn reject_claim(
        &self,
        claim_id: ClaimId,
        actor_id: StaffId,
        remark: Option<&str>,
    ) -> Result<TransitionOutcome, ClaimError> {
        self.transition(claim_id, actor_id, ClaimAction::Reject, remark).await
    }

    pub async fn pay_claim(&self, claim_id: ClaimId, actor_id: StaffId) -> Result<TransitionOutcome, ClaimError> {
        self.transition(claim_id, actor_id, ClaimAction::Pay, None).await
    }

    /// Approves each claim independently; see `BulkOperationCoordinator`
    #[instrument(skip_all, fields(actor_id = %actor_id, count = claim_ids.len()))]
    pub async fn approve_many(&self, claim_ids: &[ClaimId], actor_id: StaffId) -> BulkOutcome {
        let outcome = BulkOperationCoordinator::apply_to_many(claim_ids, move |id| {
            self.approve_claim(id, actor_id, None)
        })
        .await;
        info!(succeeded = outcome.succeeded.len(), failed = outcome.failed.len(), "bulk approve finished");
        outcome
    }

    /// Pays each claim independently; see `BulkOperationCoordinator`
    #[instrument(skip_all, fields(actor_id = %actor_id, count = claim_ids.len()))]
    pub async fn pay_claims(&self, claim_ids: &[ClaimId], actor_id: StaffId) -> BulkOutcome {
        let outcome =
            BulkOperationCoordinator::apply_to_many(claim_ids, move |id| self.pay_claim(id, actor_id)).await;
        info!(succeeded = outcome.succeeded.len(), failed = outcome.failed.len(), "bulk pay finished");
        outcome
    }

    /// Builds the export payload and audits one `Download` per claim
    ///
    /// Every claim is loaded before anything is audited, so a missing ID
    /// aborts the whole export without leaving partial audit entries.
    #[instrument(skip_all, fields(actor_id = %actor_id, count = claim_ids.len()))]
    pub async fn download_claims(&self, claim_ids: &[ClaimId], actor_id: StaffId) -> Result<ClaimExport, ClaimError> {
        let actor = self.resolve_actor(actor_id).await?;
        if !matches!(actor.role, Role::Finance | Role::Admin) {
            return Err(ClaimError::unauthorized(format!(
                "role {} may not export claims",
                actor.role
            )));
        }

        let mut seen = HashSet::new();
        let mut claims = Vec::new();
        for &id in claim_ids {
            if seen.insert(id) {
                claims.push(self.claims.get_claim(id).await?);
            }
        }

        let mut lookups = DirectoryCache::new(self.directory.as_ref());
        let mut rows = Vec::with_capacity(claims.len());
        for claim in &claims {
            let staff = lookups.staff(claim.owner_id).await?.clone();
            let project = lookups.project(claim.project_id).await?;
            rows.push(ExportRow {
                claim_id: claim.id,
                staff_name: staff.name,
                department: staff.department,
                project_name: project.project_name.clone(),
                duration: ExportRow::format_duration(claim.span()),
                total_working_hours: claim.total_working_hours,
                total_claim_amount: claim.total_claim_amount,
            });
        }

        for claim in &claims {
            self.record_audit(claim.id, AuditAction::Download, actor_id, None).await;
        }

        let export = ClaimExport::from_rows(rows);
        info!(rows = export.rows.len(), "claims exported");
        Ok(export)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn get_claim(&self, claim_id: ClaimId) -> Result<Claim, ClaimError> {
        Ok(self.claims.get_claim(claim_id).await?)
    }

    pub async fn list_claims_by_owner(&self, owner_id: StaffId) -> Result<Vec<Claim>, ClaimError> {
        Ok(self.claims.list_by_owner(owner_id).await?)
    }

    /// Pending claims the actor may review
    ///
    /// Finance sees every pending claim; an approver sees the claims of the
    /// projects they manage.
    pub async fn list_pending_for_approver(&self, actor_id: StaffId) -> Result<Vec<Claim>, ClaimError> {
        let actor = self.resolve_actor(actor_id).await?;
        let pending = self.claims.list_by_status(ClaimStatus::PendingApproval).await?;

        match actor.role {
            Role::Finance => Ok(pending),
            Role::Approver => {
                let mut lookups = DirectoryCache::new(self.directory.as_ref());
                let mut visible = Vec::new();
                for claim in pending {
                    if lookups.project(claim.project_id).await?.is_manager(actor_id) {
                        visible.push(claim);
                    }
                }
                Ok(visible)
            }
            role => Err(ClaimError::unauthorized(format!(
                "role {role} does not review claims"
            ))),
        }
    }

    /// Audit trail of one claim in insertion order
    pub async fn list_audit_trail(&self, claim_id: ClaimId) -> Result<Vec<AuditEntry>, ClaimError> {
        self.claims.get_claim(claim_id).await?;
        Ok(self.audit.list_by_claim(claim_id).await?)
    }

    /// Every audit entry; administrators only
    pub async fn list_all_audit(&self, actor_id: StaffId) -> Result<Vec<AuditEntry>, ClaimError> {
        let actor = self.resolve_actor(actor_id).await?;
        if actor.role != Role::Admin {
            return Err(ClaimError::unauthorized(format!(
                "role {} may not review the full audit log",
                actor.role
            )));
        }
        Ok(self.audit.list_all().await?)
    }

    // ------------------------------------------------------------------
    // Reminders
    // ------------------------------------------------------------------

    /// One `PendingReminder` intent per project manager with pending claims
    pub async fn pending_reminders(&self) -> Result<Vec<NotificationIntent>, ClaimError> {
        let pending = self.claims.list_by_status(ClaimStatus::PendingApproval).await?;
        let mut lookups = DirectoryCache::new(self.directory.as_ref());
        let mut by_manager: BTreeMap<StaffId, Vec<ClaimSummary>> = BTreeMap::new();

        for claim in &pending {
            let manager_id = lookups.project(claim.project_id).await?.manager_id;
            let summary = lookups.summary(claim).await?;
            by_manager.entry(manager_id).or_default().push(summary);
        }

        Ok(by_manager
            .into_iter()
            .map(|(manager_id, claims)| {
                NotificationIntent::new(
                    TemplateKind::PendingReminder,
                    vec![Recipient::Approver(manager_id)],
                    claims,
                )
            })
            .collect())
    }

    /// Queues the pending-approval reminders; returns how many were queued
    #[instrument(skip_all)]
    pub async fn send_pending_reminders(&self) -> Result<usize, ClaimError> {
        let reminders = self.pending_reminders().await?;
        let queued = reminders
            .into_iter()
            .filter(|intent| self.notifications.enqueue(intent.clone()))
            .count();
        info!(queued, "pending reminders queued");
        Ok(queued)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    #[instrument(skip_all, fields(claim_id = %claim_id, actor_id = %actor_id, action = %action))]
    async fn transition(
        &self,
        claim_id: ClaimId,
        actor_id: StaffId,
        action: ClaimAction,
        remark: Option<&str>,
    ) -> Result<TransitionOutcome, ClaimError> {
        let claim = self.claims.get_claim(claim_id).await?;
        let actor = self.resolve_actor(actor_id).await?;
        let is_owner = claim.owner_id == actor.id;

        let remark = normalize_remark(remark);
        let next = ClaimStateMachine::attempt_transition(
            claim.status,
            action,
            actor.role,
            is_owner,
            remark.as_deref(),
        )
        .inspect_err(|e| warn!(error = %e, "transition refused"))?;
        check_remark_length(remark.as_deref(), self.config.remark_max_len)?;

        if action.is_review_action() {
            self.authorize_review(&claim, actor, action).await?;
        }

        let previous = claim.status;
        let expected_version = claim.version;
        let mut updated = claim;
        updated.status = next;
        updated.updated_at = self.clock.now();
        match action {
            ClaimAction::Submit => updated.review_remark = None,
            ClaimAction::Return => updated.review_remark = remark.clone(),
            _ => {}
        }
        let updated = self.persist(updated, expected_version).await?;

        self.record_audit(claim_id, AuditAction::from(action), actor_id, remark.clone())
            .await;
        info!(from = %previous, to = %next, "claim transition committed");

        let notification = self.notification_for(&updated, action, remark).await;
        if let Some(intent) = &notification {
            self.notifications.enqueue(intent.clone());
        }

        Ok(TransitionOutcome {
            claim: updated,
            notification,
        })
    }

    /// Cross-identity rules for review actions
    async fn authorize_review(&self, claim: &Claim, actor: Actor, action: ClaimAction) -> Result<(), ClaimError> {
        if claim.owner_id == actor.id {
            warn!("owner attempted to review own claim");
            return Err(ClaimError::unauthorized(format!(
                "the owner of a claim may not {action} it"
            )));
        }

        if actor.role == Role::Approver {
            let enrollment = self.directory.get_project_enrollment(claim.project_id).await?;
            if !enrollment.is_manager(actor.id) {
                return Err(ClaimError::unauthorized(format!(
                    "approver {} does not manage project {}",
                    actor.id, claim.project_id
                )));
            }
        }

        Ok(())
    }

    /// Looks up the caller and parses their role; unknown roles fail closed
    async fn resolve_actor(&self, actor_id: StaffId) -> Result<Actor, ClaimError> {
        let profile = self.directory.get_staff(actor_id).await?;
        let role = profile.role.parse::<Role>().map_err(|e| {
            warn!(actor_id = %actor_id, error = %e, "caller has no usable role");
            ClaimError::unauthorized(e.to_string())
        })?;
        Ok(Actor::new(actor_id, role))
    }

    async fn persist(&self, mut claim: Claim, expected_version: u64) -> Result<Claim, ClaimError> {
        claim.version = expected_version + 1;
        self.claims.save_claim(&claim, expected_version).await.map_err(|e| {
            if e.is_conflict() {
                warn!(claim_id = %claim.id, "lost concurrent update");
            }
            ClaimError::from(e)
        })?;
        Ok(claim)
    }

    /// Appends an audit entry for an already committed change
    async fn record_audit(&self, claim_id: ClaimId, action: AuditAction, actor_id: StaffId, note: Option<String>) {
        let recorded_at = self.clock.now();
        if let Err(e) = self.audit.record(claim_id, action, actor_id, recorded_at, note).await {
            error!(
                claim_id = %claim_id,
                action = %action,
                actor_id = %actor_id,
                error = %e,
                "audit entry lost for committed claim change"
            );
        }
    }

    async fn notification_for(
        &self,
        claim: &Claim,
        action: ClaimAction,
        remark: Option<String>,
    ) -> Option<NotificationIntent> {
        let owner = Recipient::ClaimOwner(claim.owner_id);
        let (template, recipients) = match action {
            ClaimAction::Submit => (
                TemplateKind::Submitted,
                vec![Recipient::ProjectManager(claim.project_id)],
            ),
            ClaimAction::Approve => (TemplateKind::Approved, vec![owner, Recipient::FinanceGroup]),
            ClaimAction::Return => (TemplateKind::Returned, vec![owner]),
            ClaimAction::Reject => (TemplateKind::Rejected, vec![owner]),
            ClaimAction::Pay => (TemplateKind::Paid, vec![owner]),
            ClaimAction::Update | ClaimAction::Cancel => return None,
        };

        let mut lookups = DirectoryCache::new(self.directory.as_ref());
        match lookups.summary(claim).await {
            Ok(summary) => {
                Some(NotificationIntent::new(template, recipients, vec![summary]).with_remark(remark))
            }
            Err(e) => {
                warn!(claim_id = %claim.id, error = %e, "notification skipped: directory lookup failed");
                None
            }
        }
    }
}

/// Per-call memo of directory lookups
struct DirectoryCache<'a> {
    directory: &'a dyn StaffDirectory,
    staff: HashMap<StaffId, StaffProfile>,
    projects: HashMap<ProjectId, ProjectEnrollment>,
}

impl<'a> DirectoryCache<'a> {
    fn new(directory: &'a dyn StaffDirectory) -> Self {
        Self {
            directory,
            staff: HashMap::new(),
            projects: HashMap::new(),
        }
    }

    async fn staff(&mut self, id: StaffId) -> Result<&StaffProfile, PortError> {
        if !self.staff.contains_key(&id) {
            let profile = self.directory.get_staff(id).await?;
            self.staff.insert(id, profile);
        }
        self.staff.get(&id).ok_or_else(|| PortError::not_found("Staff", id))
    }

    async fn project(&mut self, id: ProjectId) -> Result<&ProjectEnrollment, PortError> {
        if !self.projects.contains_key(&id) {
            let enrollment = self.directory.get_project_enrollment(id).await?;
            self.projects.insert(id, enrollment);
        }
        self.projects.get(&id).ok_or_else(|| PortError::not_found("Project", id))
    }

    async fn summary(&mut self, claim: &Claim) -> Result<ClaimSummary, PortError> {
        let staff_name = self.staff(claim.owner_id).await?.name.clone();
        let project_name = self.project(claim.project_id).await?.project_name.clone();
        Ok(ClaimSummary {
            claim_id: claim.id,
            project_name,
            staff_name,
            staff_id: claim.owner_id,
            status: claim.status,
            total_working_hours: claim.total_working_hours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::ports::mock::{MockAuditStore, MockClaimStore, MockClock, MockRateLookup, MockStaffDirectory};

    fn person(role: &str) -> StaffProfile {
        let id = StaffId::new();
        StaffProfile {
            id,
            name: role.to_string(),
            email: format!("{id}@example.com"),
            department: "Engineering".to_string(),
            role: role.to_string(),
        }
    }

    #[tokio::test]
    async fn test_unknown_role_fails_closed() {
        let ghost = person("superuser");
        let directory = MockStaffDirectory::new().with_staff(ghost.clone());
        let (queue, _rx) = NotificationQueue::new();
        let service = ClaimWorkflowService::new(
            WorkflowPorts {
                claims: Arc::new(MockClaimStore::new()),
                audit: Arc::new(MockAuditStore::new()),
                directory: Arc::new(directory),
                rates: Arc::new(MockRateLookup::new(10)),
                clock: Arc::new(MockClock::at(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap())),
            },
            queue,
            WorkflowConfig::default(),
        );

        let result = service.list_pending_for_approver(ghost.id).await;
        assert!(matches!(result, Err(ClaimError::Unauthorized(_))));
    }
}
