//! PostgreSQL Audit Store

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{AuditEntryId, ClaimId, DomainPort, HealthCheckable, HealthCheckResult, PortError, StaffId};
use domain_claims::{AuditAction, AuditEntry, AuditStore};

use crate::error::db_to_port_error;
use crate::repositories::{AuditRepository, AuditRow};

/// Insert-only `AuditStore` over the `claim_audit` table
#[derive(Debug, Clone)]
pub struct PostgresAuditStore {
    repository: AuditRepository,
    pool: PgPool,
}

impl PostgresAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: AuditRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresAuditStore {}

#[async_trait]
impl HealthCheckable for PostgresAuditStore {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(&self.pool, "postgres-audit-store").await
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    #[instrument(skip(self, entry), fields(claim_id = %entry.claim_id, action = %entry.action))]
    async fn append(&self, entry: &AuditEntry) -> Result<(), PortError> {
        let row = AuditRow {
            audit_id: entry.id.into(),
            claim_id: entry.claim_id.into(),
            action: entry.action.as_str().to_string(),
            actor_id: entry.actor_id.into(),
            recorded_at: entry.recorded_at,
            note: entry.note.clone(),
        };
        self.repository.append(&row).await.map_err(db_to_port_error)
    }

    #[instrument(skip(self), fields(claim_id = %claim_id))]
    async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<AuditEntry>, PortError> {
        self.repository
            .find_by_claim(claim_id.into())
            .await
            .map_err(db_to_port_error)?
            .into_iter()
            .map(row_to_entry)
            .collect()
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<AuditEntry>, PortError> {
        self.repository
            .find_all()
            .await
            .map_err(db_to_port_error)?
            .into_iter()
            .map(row_to_entry)
            .collect()
    }
}

fn row_to_entry(row: AuditRow) -> Result<AuditEntry, PortError> {
    let action: AuditAction = row
        .action
        .parse()
        .map_err(|e: String| PortError::internal(format!("audit entry {}: {e}", row.audit_id)))?;
    Ok(AuditEntry {
        id: AuditEntryId::from(row.audit_id),
        claim_id: ClaimId::from(row.claim_id),
        action,
        actor_id: StaffId::from(row.actor_id),
        recorded_at: row.recorded_at,
        note: row.note,
    })
}
