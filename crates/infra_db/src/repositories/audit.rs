//! Audit trail repository
//!
//! The `claim_audit` table is insert-only; a trigger rejects updates and
//! deletes. Reads are ordered by the `seq` column, which records insertion
//! order independently of the caller-supplied timestamp.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Row of the `claim_audit` table (without the sequence column)
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AuditRow {
    pub audit_id: Uuid,
    pub claim_id: Uuid,
    pub action: String,
    pub actor_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, row: &AuditRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO claim_audit (audit_id, claim_id, action, actor_id, recorded_at, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(row.audit_id)
        .bind(row.claim_id)
        .bind(&row.action)
        .bind(row.actor_id)
        .bind(row.recorded_at)
        .bind(&row.note)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_claim(&self, claim_id: Uuid) -> Result<Vec<AuditRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT audit_id, claim_id, action, actor_id, recorded_at, note
            FROM claim_audit
            WHERE claim_id = $1
            ORDER BY seq
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_all(&self) -> Result<Vec<AuditRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT audit_id, claim_id, action, actor_id, recorded_at, note
            FROM claim_audit
            ORDER BY seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
