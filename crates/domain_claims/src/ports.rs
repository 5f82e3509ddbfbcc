//! Claims Domain Ports
//!
//! This module defines the collaborators the claim workflow needs from the
//! outside world. The workflow service receives each of them by constructor
//! injection; there are no ambient singletons.
//!
//! - **ClaimStore**: claim persistence with optimistic concurrency
//! - **AuditStore**: append-only audit persistence
//! - **StaffDirectory**: who a caller is (role), staff contact details, and
//!   project enrollments
//! - **RateLookup**: hourly rate used to derive claim amounts
//! - **MailSender**: outbound mail transport
//!
//! The `mock` submodule provides in-memory implementations for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, DomainPort, HealthCheckable, PortError, ProjectId, StaffId};

use crate::audit::AuditEntry;
use crate::claim::{Claim, ClaimStatus};

/// Persistence port for claims
#[async_trait]
pub trait ClaimStore: DomainPort + HealthCheckable {
    /// Retrieves a claim with its detail lines, or `PortError::NotFound`
    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError>;

    /// Stores a brand-new claim; `PortError::Conflict` if the ID already exists
    async fn insert_claim(&self, claim: &Claim) -> Result<(), PortError>;

    /// Atomically replaces a stored claim if its stored version still equals
    /// `expected_version`
    ///
    /// The caller has already set `claim.version` to the new version. A stale
    /// `expected_version` yields `PortError::Conflict` and stores nothing, so
    /// of two concurrent writers starting from the same version only one wins.
    async fn save_claim(&self, claim: &Claim, expected_version: u64) -> Result<(), PortError>;

    /// All claims currently in `status`, oldest first
    async fn list_by_status(&self, status: ClaimStatus) -> Result<Vec<Claim>, PortError>;

    /// All claims owned by `owner_id`, oldest first
    async fn list_by_owner(&self, owner_id: StaffId) -> Result<Vec<Claim>, PortError>;
}

/// Persistence port for the audit trail; insert-only
#[async_trait]
pub trait AuditStore: DomainPort + HealthCheckable {
    async fn append(&self, entry: &AuditEntry) -> Result<(), PortError>;

    /// Entries for one claim in insertion order
    async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<AuditEntry>, PortError>;

    /// Every entry in insertion order
    async fn list_all(&self) -> Result<Vec<AuditEntry>, PortError>;
}

/// Directory record for a member of staff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffProfile {
    pub id: StaffId,
    pub name: String,
    pub email: String,
    pub department: String,
    /// Role as held by the identity provider; parsed with `Role::from_str`
    pub role: String,
}

/// Who is enrolled in a project and who manages it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEnrollment {
    pub project_id: ProjectId,
    pub project_name: String,
    /// The enrolled project manager; the only approver for the project's claims
    pub manager_id: StaffId,
    pub members: Vec<StaffId>,
}

impl ProjectEnrollment {
    pub fn is_manager(&self, staff_id: StaffId) -> bool {
        self.manager_id == staff_id
    }

    /// Members and the manager may claim against the project
    pub fn is_enrolled(&self, staff_id: StaffId) -> bool {
        self.is_manager(staff_id) || self.members.contains(&staff_id)
    }
}

/// Read-only directory of staff and project enrollments
#[async_trait]
pub trait StaffDirectory: DomainPort + HealthCheckable {
    async fn get_staff(&self, id: StaffId) -> Result<StaffProfile, PortError>;

    async fn get_project_enrollment(&self, project_id: ProjectId) -> Result<ProjectEnrollment, PortError>;

    /// Addresses of everyone in the finance group
    async fn finance_emails(&self) -> Result<Vec<String>, PortError>;
}

/// Supplies the hourly rate a claim's amount is derived from
#[async_trait]
pub trait RateLookup: DomainPort {
    async fn hourly_rate(&self, staff_id: StaffId, project_id: ProjectId) -> Result<u64, PortError>;
}

/// A rendered outbound mail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

/// Outbound mail transport
#[async_trait]
pub trait MailSender: DomainPort {
    async fn send(&self, message: &MailMessage) -> Result<(), PortError>;
}

/// In-memory implementations of the claim ports for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, Utc};
    use tokio::sync::RwLock;

    use core_kernel::{Clock, HealthCheckResult};

    /// In-memory claim store with version checking
    #[derive(Debug, Default)]
    pub struct MockClaimStore {
        claims: Arc<RwLock<HashMap<ClaimId, Claim>>>,
    }

    impl MockClaimStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with claims for testing
        pub async fn with_claims(claims: Vec<Claim>) -> Self {
            let store = Self::new();
            for claim in claims {
                store.claims.write().await.insert(claim.id, claim);
            }
            store
        }

        fn sorted(mut claims: Vec<Claim>) -> Vec<Claim> {
            claims.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            claims
        }
    }

    impl DomainPort for MockClaimStore {}

    #[async_trait]
    impl HealthCheckable for MockClaimStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-claim-store")
        }
    }

    #[async_trait]
    impl ClaimStore for MockClaimStore {
        async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
            self.claims
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Claim", id))
        }

        async fn insert_claim(&self, claim: &Claim) -> Result<(), PortError> {
            let mut claims = self.claims.write().await;
            if claims.contains_key(&claim.id) {
                return Err(PortError::conflict(format!("claim {} already exists", claim.id)));
            }
            claims.insert(claim.id, claim.clone());
            Ok(())
        }

        async fn save_claim(&self, claim: &Claim, expected_version: u64) -> Result<(), PortError> {
            let mut claims = self.claims.write().await;
            let stored = claims
                .get_mut(&claim.id)
                .ok_or_else(|| PortError::not_found("Claim", claim.id))?;
            if stored.version != expected_version {
                return Err(PortError::conflict(format!(
                    "claim {} is at version {}, expected {}",
                    claim.id, stored.version, expected_version
                )));
            }
            *stored = claim.clone();
            Ok(())
        }

        async fn list_by_status(&self, status: ClaimStatus) -> Result<Vec<Claim>, PortError> {
            let claims = self.claims.read().await;
            Ok(Self::sorted(
                claims.values().filter(|c| c.status == status).cloned().collect(),
            ))
        }

        async fn list_by_owner(&self, owner_id: StaffId) -> Result<Vec<Claim>, PortError> {
            let claims = self.claims.read().await;
            Ok(Self::sorted(
                claims.values().filter(|c| c.owner_id == owner_id).cloned().collect(),
            ))
        }
    }

    /// In-memory audit store; appends can be made to fail
    #[derive(Debug, Default)]
    pub struct MockAuditStore {
        entries: Arc<RwLock<Vec<AuditEntry>>>,
        failing: AtomicBool,
    }

    impl MockAuditStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes subsequent appends fail with a connection error
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    impl DomainPort for MockAuditStore {}

    #[async_trait]
    impl HealthCheckable for MockAuditStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-audit-store")
        }
    }

    #[async_trait]
    impl AuditStore for MockAuditStore {
        async fn append(&self, entry: &AuditEntry) -> Result<(), PortError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PortError::connection("audit store unavailable"));
            }
            self.entries.write().await.push(entry.clone());
            Ok(())
        }

        async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<AuditEntry>, PortError> {
            Ok(self
                .entries
                .read()
                .await
                .iter()
                .filter(|e| e.claim_id == claim_id)
                .cloned()
                .collect())
        }

        async fn list_all(&self) -> Result<Vec<AuditEntry>, PortError> {
            Ok(self.entries.read().await.clone())
        }
    }

    /// Fixed directory built up front
    #[derive(Debug, Default, Clone)]
    pub struct MockStaffDirectory {
        staff: HashMap<StaffId, StaffProfile>,
        projects: HashMap<ProjectId, ProjectEnrollment>,
    }

    impl MockStaffDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_staff(mut self, profile: StaffProfile) -> Self {
            self.staff.insert(profile.id, profile);
            self
        }

        pub fn with_project(mut self, enrollment: ProjectEnrollment) -> Self {
            self.projects.insert(enrollment.project_id, enrollment);
            self
        }
    }

    impl DomainPort for MockStaffDirectory {}

    #[async_trait]
    impl HealthCheckable for MockStaffDirectory {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-staff-directory")
        }
    }

    #[async_trait]
    impl StaffDirectory for MockStaffDirectory {
        async fn get_staff(&self, id: StaffId) -> Result<StaffProfile, PortError> {
            self.staff
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Staff", id))
        }

        async fn get_project_enrollment(&self, project_id: ProjectId) -> Result<ProjectEnrollment, PortError> {
            self.projects
                .get(&project_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Project", project_id))
        }

        async fn finance_emails(&self) -> Result<Vec<String>, PortError> {
            let mut emails: Vec<String> = self
                .staff
                .values()
                .filter(|s| s.role.trim().eq_ignore_ascii_case("finance"))
                .map(|s| s.email.clone())
                .collect();
            emails.sort();
            Ok(emails)
        }
    }

    /// Same rate for everyone unless overridden per staff member
    #[derive(Debug, Clone)]
    pub struct MockRateLookup {
        default_rate: u64,
        overrides: HashMap<StaffId, u64>,
    }

    impl MockRateLookup {
        pub fn new(default_rate: u64) -> Self {
            Self {
                default_rate,
                overrides: HashMap::new(),
            }
        }

        pub fn with_rate(mut self, staff_id: StaffId, rate: u64) -> Self {
            self.overrides.insert(staff_id, rate);
            self
        }
    }

    impl DomainPort for MockRateLookup {}

    #[async_trait]
    impl RateLookup for MockRateLookup {
        async fn hourly_rate(&self, staff_id: StaffId, _project_id: ProjectId) -> Result<u64, PortError> {
            Ok(self.overrides.get(&staff_id).copied().unwrap_or(self.default_rate))
        }
    }

    /// Records every message; sends can be made to fail
    #[derive(Debug, Default)]
    pub struct MockMailSender {
        sent: Arc<RwLock<Vec<MailMessage>>>,
        failing: AtomicBool,
    }

    impl MockMailSender {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub async fn sent(&self) -> Vec<MailMessage> {
            self.sent.read().await.clone()
        }
    }

    impl DomainPort for MockMailSender {}

    #[async_trait]
    impl MailSender for MockMailSender {
        async fn send(&self, message: &MailMessage) -> Result<(), PortError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PortError::ServiceUnavailable {
                    service: "mock-mail".to_string(),
                });
            }
            self.sent.write().await.push(message.clone());
            Ok(())
        }
    }

    /// Manually driven clock
    #[derive(Debug)]
    pub struct MockClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl MockClock {
        pub fn at(now: DateTime<Utc>) -> Self {
            Self { now: Mutex::new(now) }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            *now += by;
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::mock::{MockClaimStore, MockStaffDirectory};
    use chrono::Utc;

    fn draft() -> Claim {
        Claim::draft(StaffId::new(), ProjectId::new(), Vec::new(), None, 10, Utc::now())
    }

    #[tokio::test]
    async fn test_save_with_stale_version_conflicts() {
        let claim = draft();
        let store = MockClaimStore::with_claims(vec![claim.clone()]).await;

        let mut first = claim.clone();
        first.version = 2;
        store.save_claim(&first, 1).await.unwrap();

        let mut second = claim.clone();
        second.version = 2;
        let result = store.save_claim(&second, 1).await;
        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_insert_twice_conflicts() {
        let claim = draft();
        let store = MockClaimStore::new();
        store.insert_claim(&claim).await.unwrap();
        assert!(store.insert_claim(&claim).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_missing_claim_is_not_found() {
        let store = MockClaimStore::new();
        assert!(store.get_claim(ClaimId::new()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_finance_emails_match_role_case_insensitively() {
        let directory = MockStaffDirectory::new()
            .with_staff(StaffProfile {
                id: StaffId::new(),
                name: "Fin".to_string(),
                email: "fin@example.com".to_string(),
                department: "Finance".to_string(),
                role: "FINANCE".to_string(),
            })
            .with_staff(StaffProfile {
                id: StaffId::new(),
                name: "Dev".to_string(),
                email: "dev@example.com".to_string(),
                department: "R&D".to_string(),
                role: "staff".to_string(),
            });
        assert_eq!(directory.finance_emails().await.unwrap(), vec!["fin@example.com"]);
    }

    #[test]
    fn test_enrollment_includes_manager() {
        let manager = StaffId::new();
        let member = StaffId::new();
        let enrollment = ProjectEnrollment {
            project_id: ProjectId::new(),
            project_name: "Apollo".to_string(),
            manager_id: manager,
            members: vec![member],
        };
        assert!(enrollment.is_enrolled(manager));
        assert!(enrollment.is_enrolled(member));
        assert!(!enrollment.is_enrolled(StaffId::new()));
        assert!(enrollment.is_manager(manager));
    }
}
