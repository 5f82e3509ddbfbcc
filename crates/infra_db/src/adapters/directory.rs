//! PostgreSQL Staff Directory
//!
//! Serves both `StaffDirectory` and `RateLookup` from the staff master data.
//! The hourly rate is held per staff member; the project does not change it.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{DomainPort, HealthCheckable, HealthCheckResult, PortError, ProjectId, StaffId};
use domain_claims::{ProjectEnrollment, RateLookup, StaffDirectory, StaffProfile};

use crate::error::db_to_port_error;
use crate::repositories::DirectoryRepository;

#[derive(Debug, Clone)]
pub struct PostgresStaffDirectory {
    repository: DirectoryRepository,
    pool: PgPool,
}

impl PostgresStaffDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: DirectoryRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresStaffDirectory {}

#[async_trait]
impl HealthCheckable for PostgresStaffDirectory {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(&self.pool, "postgres-staff-directory").await
    }
}

#[async_trait]
impl StaffDirectory for PostgresStaffDirectory {
    #[instrument(skip(self), fields(staff_id = %id))]
    async fn get_staff(&self, id: StaffId) -> Result<StaffProfile, PortError> {
        let row = self.repository.get_staff(id.into()).await.map_err(db_to_port_error)?;
        Ok(StaffProfile {
            id: StaffId::from(row.staff_id),
            name: row.name,
            email: row.email,
            department: row.department,
            role: row.role,
        })
    }

    #[instrument(skip(self), fields(project_id = %project_id))]
    async fn get_project_enrollment(&self, project_id: ProjectId) -> Result<ProjectEnrollment, PortError> {
        let (project, members) = self
            .repository
            .get_project(project_id.into())
            .await
            .map_err(db_to_port_error)?;
        Ok(ProjectEnrollment {
            project_id: ProjectId::from(project.project_id),
            project_name: project.project_name,
            manager_id: StaffId::from(project.manager_id),
            members: members.into_iter().map(StaffId::from).collect(),
        })
    }

    #[instrument(skip(self))]
    async fn finance_emails(&self) -> Result<Vec<String>, PortError> {
        self.repository.finance_emails().await.map_err(db_to_port_error)
    }
}

#[async_trait]
impl RateLookup for PostgresStaffDirectory {
    #[instrument(skip(self), fields(staff_id = %staff_id))]
    async fn hourly_rate(&self, staff_id: StaffId, _project_id: ProjectId) -> Result<u64, PortError> {
        let rate = self
            .repository
            .hourly_rate(staff_id.into())
            .await
            .map_err(db_to_port_error)?;
        u64::try_from(rate).map_err(|_| PortError::internal(format!("staff {staff_id} has a negative rate")))
    }
}
