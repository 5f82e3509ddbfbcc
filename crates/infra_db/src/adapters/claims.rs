//! PostgreSQL Claim Store
//!
//! Implements `ClaimStore` over the `claims` and `claim_details` tables.
//! `save_claim` is a conditional update on the stored version, so of two
//! writers that loaded the same version only the first to commit succeeds;
//! the other receives `PortError::Conflict`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    ClaimId, DomainPort, HealthCheckable, HealthCheckResult, PortError, ProjectId, StaffId, WorkPeriod,
};
use domain_claims::{Claim, ClaimDetail, ClaimStatus, ClaimStore};

use crate::error::db_to_port_error;
use crate::repositories::{ClaimDetailRow, ClaimRow, ClaimWithDetails, ClaimsRepository};

/// PostgreSQL-backed implementation of `ClaimStore`
#[derive(Debug, Clone)]
pub struct PostgresClaimStore {
    repository: ClaimsRepository,
    pool: PgPool,
}

impl PostgresClaimStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClaimsRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &ClaimsRepository {
        &self.repository
    }
}

impl DomainPort for PostgresClaimStore {}

#[async_trait]
impl HealthCheckable for PostgresClaimStore {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(&self.pool, "postgres-claim-store").await
    }
}

#[async_trait]
impl ClaimStore for PostgresClaimStore {
    #[instrument(skip(self), fields(claim_id = %id))]
    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        debug!("Fetching claim by ID");
        let row = self
            .repository
            .get_by_id(id.into())
            .await
            .map_err(db_to_port_error)?;
        row_to_claim(row)
    }

    #[instrument(skip(self, claim), fields(claim_id = %claim.id))]
    async fn insert_claim(&self, claim: &Claim) -> Result<(), PortError> {
        let (row, details) = claim_to_rows(claim)?;
        self.repository
            .insert(&row, &details)
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, claim), fields(claim_id = %claim.id))]
    async fn save_claim(&self, claim: &Claim, expected_version: u64) -> Result<(), PortError> {
        let (row, details) = claim_to_rows(claim)?;
        let expected = to_i64(expected_version, "version")?;
        self.repository
            .update_versioned(&row, &details, expected)
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self))]
    async fn list_by_status(&self, status: ClaimStatus) -> Result<Vec<Claim>, PortError> {
        self.repository
            .find_by_status(status.as_str())
            .await
            .map_err(db_to_port_error)?
            .into_iter()
            .map(row_to_claim)
            .collect()
    }

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    async fn list_by_owner(&self, owner_id: StaffId) -> Result<Vec<Claim>, PortError> {
        self.repository
            .find_by_owner(owner_id.into())
            .await
            .map_err(db_to_port_error)?
            .into_iter()
            .map(row_to_claim)
            .collect()
    }
}

fn to_i64(value: u64, field: &str) -> Result<i64, PortError> {
    i64::try_from(value).map_err(|_| PortError::validation(format!("{field} {value} is out of range")))
}

fn claim_to_rows(claim: &Claim) -> Result<(ClaimRow, Vec<ClaimDetailRow>), PortError> {
    let claim_id = claim.id.into();
    let row = ClaimRow {
        claim_id,
        owner_id: claim.owner_id.into(),
        project_id: claim.project_id.into(),
        status: claim.status.as_str().to_string(),
        total_working_hours: i64::from(claim.total_working_hours),
        total_claim_amount: to_i64(claim.total_claim_amount, "total_claim_amount")?,
        remark: claim.remark.clone(),
        review_remark: claim.review_remark.clone(),
        version: to_i64(claim.version, "version")?,
        created_at: claim.created_at,
        updated_at: claim.updated_at,
    };

    let details = claim
        .details
        .iter()
        .enumerate()
        .map(|(index, detail)| {
            let line_no = i32::try_from(index + 1)
                .map_err(|_| PortError::validation("too many detail lines"))?;
            Ok(ClaimDetailRow {
                claim_id,
                line_no,
                work_from: detail.period.start,
                work_to: detail.period.end,
                remark: detail.remark.clone(),
            })
        })
        .collect::<Result<Vec<_>, PortError>>()?;

    Ok((row, details))
}

fn row_to_claim(data: ClaimWithDetails) -> Result<Claim, PortError> {
    let row = data.claim;
    let corrupt = |what: &str| PortError::internal(format!("claim {}: invalid {what}", row.claim_id));

    let status: ClaimStatus = row.status.parse().map_err(|_| corrupt("status"))?;
    let details = data
        .details
        .into_iter()
        .map(|d| {
            let period = WorkPeriod::new(d.work_from, d.work_to).map_err(|_| corrupt("detail period"))?;
            Ok(ClaimDetail {
                period,
                remark: d.remark,
            })
        })
        .collect::<Result<Vec<_>, PortError>>()?;

    Ok(Claim {
        id: ClaimId::from(row.claim_id),
        owner_id: StaffId::from(row.owner_id),
        project_id: ProjectId::from(row.project_id),
        status,
        details,
        total_working_hours: u32::try_from(row.total_working_hours).map_err(|_| corrupt("hours"))?,
        total_claim_amount: u64::try_from(row.total_claim_amount).map_err(|_| corrupt("amount"))?,
        remark: row.remark,
        review_remark: row.review_remark,
        version: u64::try_from(row.version).map_err(|_| corrupt("version"))?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
