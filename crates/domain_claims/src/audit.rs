//! Claim audit trail
//!
//! Entries are immutable facts. The logger is only ever invoked after the
//! corresponding claim mutation has been committed, so the presence of an
//! entry for action X on claim C implies C's stored state reflects X.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{AuditEntryId, ClaimId, PortError, StaffId};
use crate::ports::AuditStore;
use crate::state_machine::ClaimAction;

/// What happened to a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Submit,
    Approve,
    Return,
    Reject,
    Paid,
    Cancel,
    Download,
}

impl AuditAction {
    pub const ALL: [AuditAction; 9] = [
        AuditAction::Create,
        AuditAction::Update,
        AuditAction::Submit,
        AuditAction::Approve,
        AuditAction::Return,
        AuditAction::Reject,
        AuditAction::Paid,
        AuditAction::Cancel,
        AuditAction::Download,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Submit => "submit",
            AuditAction::Approve => "approve",
            AuditAction::Return => "return",
            AuditAction::Reject => "reject",
            AuditAction::Paid => "paid",
            AuditAction::Cancel => "cancel",
            AuditAction::Download => "download",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown audit action {s:?}"))
    }
}

impl From<ClaimAction> for AuditAction {
    fn from(action: ClaimAction) -> Self {
        match action {
            ClaimAction::Update => AuditAction::Update,
            ClaimAction::Submit => AuditAction::Submit,
            ClaimAction::Approve => AuditAction::Approve,
            ClaimAction::Return => AuditAction::Return,
            ClaimAction::Reject => AuditAction::Reject,
            ClaimAction::Pay => AuditAction::Paid,
            ClaimAction::Cancel => AuditAction::Cancel,
        }
    }
}

/// Immutable record of an action taken on a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub claim_id: ClaimId,
    pub action: AuditAction,
    pub actor_id: StaffId,
    pub recorded_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Appends and reads audit entries through an `AuditStore`
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn AuditStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Appends one entry; never touches earlier entries
    pub async fn record(
        &self,
        claim_id: ClaimId,
        action: AuditAction,
        actor_id: StaffId,
        timestamp: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<AuditEntry, PortError> {
        let entry = AuditEntry {
            id: AuditEntryId::new_v7(),
            claim_id,
            action,
            actor_id,
            recorded_at: timestamp,
            note,
        };
        self.store.append(&entry).await?;
        debug!(claim_id = %claim_id, action = %action, actor_id = %actor_id, "audit entry recorded");
        Ok(entry)
    }

    /// Entries for one claim in insertion order
    pub async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<AuditEntry>, PortError> {
        self.store.list_by_claim(claim_id).await
    }

    /// Every entry, in insertion order
    pub async fn list_all(&self) -> Result<Vec<AuditEntry>, PortError> {
        self.store.list_all().await
    }
}

impl fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLogger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::MockAuditStore;

    #[tokio::test]
    async fn test_record_then_list_in_order() {
        let logger = AuditLogger::new(Arc::new(MockAuditStore::new()));
        let claim_id = ClaimId::new();
        let actor = StaffId::new();
        let t0 = Utc::now();

        logger.record(claim_id, AuditAction::Create, actor, t0, None).await.unwrap();
        logger
            .record(claim_id, AuditAction::Submit, actor, t0, Some("ready".to_string()))
            .await
            .unwrap();
        logger.record(ClaimId::new(), AuditAction::Create, actor, t0, None).await.unwrap();

        let entries = logger.list_by_claim(claim_id).await.unwrap();
        let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::Create, AuditAction::Submit]);
        assert_eq!(entries[1].note.as_deref(), Some("ready"));
        assert_eq!(logger.list_all().await.unwrap().len(), 3);
    }

    #[test]
    fn test_pay_is_audited_as_paid() {
        assert_eq!(AuditAction::from(ClaimAction::Pay), AuditAction::Paid);
        assert_eq!("download".parse::<AuditAction>().unwrap(), AuditAction::Download);
    }
}
