//! Claims repository implementation
//!
//! Claims and their detail lines live in two tables and are always written
//! together inside one transaction. Updates are conditional on the stored
//! `version`, which is how concurrent writers are serialised per claim.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Row of the `claims` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimRow {
    pub claim_id: Uuid,
    pub owner_id: Uuid,
    pub project_id: Uuid,
    pub status: String,
    pub total_working_hours: i64,
    pub total_claim_amount: i64,
    pub remark: Option<String>,
    pub review_remark: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the `claim_details` table
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ClaimDetailRow {
    pub claim_id: Uuid,
    pub line_no: i32,
    pub work_from: DateTime<Utc>,
    pub work_to: DateTime<Utc>,
    pub remark: Option<String>,
}

/// A claim row with its detail lines in line order
#[derive(Debug, Clone)]
pub struct ClaimWithDetails {
    pub claim: ClaimRow,
    pub details: Vec<ClaimDetailRow>,
}

const CLAIM_COLUMNS: &str = "claim_id, owner_id, project_id, status, total_working_hours, \
     total_claim_amount, remark, review_remark, version, created_at, updated_at";

/// Repository for claims and their detail lines
#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: PgPool,
}

impl ClaimsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Retrieves a claim with its detail lines
    ///
    /// # Errors
    ///
    /// `DatabaseError::NotFound` if no claim has this ID
    pub async fn get_by_id(&self, claim_id: Uuid) -> Result<ClaimWithDetails, DatabaseError> {
        let claim = sqlx::query_as::<_, ClaimRow>(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims WHERE claim_id = $1"
        ))
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Claim", claim_id))?;

        let details = sqlx::query_as::<_, ClaimDetailRow>(
            r#"
            SELECT claim_id, line_no, work_from, work_to, remark
            FROM claim_details
            WHERE claim_id = $1
            ORDER BY line_no
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ClaimWithDetails { claim, details })
    }

    /// Claims in a status, oldest first
    pub async fn find_by_status(&self, status: &str) -> Result<Vec<ClaimWithDetails>, DatabaseError> {
        let claims = sqlx::query_as::<_, ClaimRow>(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims WHERE status = $1 ORDER BY created_at, claim_id"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        self.attach_details(claims).await
    }

    /// Claims owned by a staff member, oldest first
    pub async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<ClaimWithDetails>, DatabaseError> {
        let claims = sqlx::query_as::<_, ClaimRow>(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims WHERE owner_id = $1 ORDER BY created_at, claim_id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_details(claims).await
    }

    /// Inserts a new claim and its detail lines
    ///
    /// # Errors
    ///
    /// `DatabaseError::DuplicateEntry` if the claim ID already exists
    pub async fn insert(&self, claim: &ClaimRow, details: &[ClaimDetailRow]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO claims (
                claim_id, owner_id, project_id, status, total_working_hours,
                total_claim_amount, remark, review_remark, version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(claim.claim_id)
        .bind(claim.owner_id)
        .bind(claim.project_id)
        .bind(&claim.status)
        .bind(claim.total_working_hours)
        .bind(claim.total_claim_amount)
        .bind(&claim.remark)
        .bind(&claim.review_remark)
        .bind(claim.version)
        .bind(claim.created_at)
        .bind(claim.updated_at)
        .execute(&mut *tx)
        .await?;

        Self::insert_details(&mut tx, details).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Replaces a claim and its detail lines if the stored version matches
    ///
    /// # Errors
    ///
    /// * `DatabaseError::NotFound` - no claim has this ID
    /// * `DatabaseError::VersionConflict` - the stored version is not `expected_version`
    pub async fn update_versioned(
        &self,
        claim: &ClaimRow,
        details: &[ClaimDetailRow],
        expected_version: i64,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE claims SET
                status = $2,
                total_working_hours = $3,
                total_claim_amount = $4,
                remark = $5,
                review_remark = $6,
                version = $7,
                updated_at = $8
            WHERE claim_id = $1 AND version = $9
            "#,
        )
        .bind(claim.claim_id)
        .bind(&claim.status)
        .bind(claim.total_working_hours)
        .bind(claim.total_claim_amount)
        .bind(&claim.remark)
        .bind(&claim.review_remark)
        .bind(claim.version)
        .bind(claim.updated_at)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let stored: Option<i64> = sqlx::query_scalar("SELECT version FROM claims WHERE claim_id = $1")
                .bind(claim.claim_id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return Err(match stored {
                None => DatabaseError::not_found("Claim", claim.claim_id),
                Some(version) => DatabaseError::VersionConflict(format!(
                    "claim {} is at version {}, expected {}",
                    claim.claim_id, version, expected_version
                )),
            });
        }

        sqlx::query("DELETE FROM claim_details WHERE claim_id = $1")
            .bind(claim.claim_id)
            .execute(&mut *tx)
            .await?;
        Self::insert_details(&mut tx, details).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_details(
        tx: &mut Transaction<'_, Postgres>,
        details: &[ClaimDetailRow],
    ) -> Result<(), DatabaseError> {
        for detail in details {
            sqlx::query(
                r#"
                INSERT INTO claim_details (claim_id, line_no, work_from, work_to, remark)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(detail.claim_id)
            .bind(detail.line_no)
            .bind(detail.work_from)
            .bind(detail.work_to)
            .bind(&detail.remark)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn attach_details(&self, claims: Vec<ClaimRow>) -> Result<Vec<ClaimWithDetails>, DatabaseError> {
        if claims.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = claims.iter().map(|c| c.claim_id).collect();
        let rows = sqlx::query_as::<_, ClaimDetailRow>(
            r#"
            SELECT claim_id, line_no, work_from, work_to, remark
            FROM claim_details
            WHERE claim_id = ANY($1)
            ORDER BY claim_id, line_no
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_claim: HashMap<Uuid, Vec<ClaimDetailRow>> = HashMap::new();
        for row in rows {
            by_claim.entry(row.claim_id).or_default().push(row);
        }

        Ok(claims
            .into_iter()
            .map(|claim| {
                let details = by_claim.remove(&claim.claim_id).unwrap_or_default();
                ClaimWithDetails { claim, details }
            })
            .collect())
    }
}
