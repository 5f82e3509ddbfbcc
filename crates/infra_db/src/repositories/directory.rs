//! Staff and project enrollment repository
//!
//! Master data is maintained elsewhere; the workflow only reads it.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Row of the `staff` table
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StaffRow {
    pub staff_id: Uuid,
    pub name: String,
    pub email: String,
    pub department: String,
    pub role: String,
    pub hourly_rate: i64,
}

/// Row of the `projects` table
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ProjectRow {
    pub project_id: Uuid,
    pub project_name: String,
    pub manager_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    pool: PgPool,
}

impl DirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_staff(&self, staff_id: Uuid) -> Result<StaffRow, DatabaseError> {
        sqlx::query_as::<_, StaffRow>(
            r#"
            SELECT staff_id, name, email, department, role, hourly_rate
            FROM staff
            WHERE staff_id = $1
            "#,
        )
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Staff", staff_id))
    }

    /// A project and the IDs of its enrolled members
    pub async fn get_project(&self, project_id: Uuid) -> Result<(ProjectRow, Vec<Uuid>), DatabaseError> {
        let project = sqlx::query_as::<_, ProjectRow>(
            "SELECT project_id, project_name, manager_id FROM projects WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Project", project_id))?;

        let members: Vec<Uuid> = sqlx::query_scalar(
            "SELECT staff_id FROM project_members WHERE project_id = $1 ORDER BY staff_id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok((project, members))
    }

    /// Addresses of everyone whose role is finance, in address order
    pub async fn finance_emails(&self) -> Result<Vec<String>, DatabaseError> {
        let emails: Vec<String> = sqlx::query_scalar(
            "SELECT email FROM staff WHERE lower(trim(role)) = 'finance' ORDER BY email",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(emails)
    }

    pub async fn hourly_rate(&self, staff_id: Uuid) -> Result<i64, DatabaseError> {
        sqlx::query_scalar("SELECT hourly_rate FROM staff WHERE staff_id = $1")
            .bind(staff_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Staff", staff_id))
    }
}
