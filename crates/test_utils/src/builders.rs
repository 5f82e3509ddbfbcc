//! Test Data Builders
//!
//! Builder patterns for constructing test data with sensible defaults, so a
//! test only spells out the fields it cares about.

use chrono::{DateTime, Duration, Utc};

use core_kernel::{ProjectId, StaffId, WorkPeriod};
use domain_claims::{Claim, ClaimDetail, ClaimStatus, NewDetailLine, StaffProfile};

use crate::fixtures::TemporalFixtures;

/// Builder for directory records
pub struct StaffProfileBuilder {
    id: StaffId,
    name: String,
    email: String,
    department: String,
    role: String,
}

impl StaffProfileBuilder {
    /// Starts from a display name; the email is derived from the name and ID
    pub fn new(name: impl Into<String>) -> Self {
        let id = StaffId::new_v7();
        let name = name.into();
        let local = name.to_lowercase().replace(' ', ".");
        Self {
            email: format!("{local}.{}@example.com", id.as_uuid().simple()),
            id,
            name,
            department: "Engineering".to_string(),
            role: "staff".to_string(),
        }
    }

    pub fn with_id(mut self, id: StaffId) -> Self {
        self.id = id;
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn build(self) -> StaffProfile {
        StaffProfile {
            id: self.id,
            name: self.name,
            email: self.email,
            department: self.department,
            role: self.role,
        }
    }
}

/// Builds consecutive evening detail lines of given lengths
pub struct DetailLinesBuilder {
    next_start: DateTime<Utc>,
    lines: Vec<NewDetailLine>,
}

impl Default for DetailLinesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailLinesBuilder {
    pub fn new() -> Self {
        Self {
            next_start: TemporalFixtures::reference_now() + Duration::hours(9),
            lines: Vec::new(),
        }
    }

    /// Appends a line of `hours` whole hours, one day after the previous one
    pub fn hours(self, hours: i64) -> Self {
        self.span(Duration::hours(hours))
    }

    /// Appends a line of arbitrary length
    pub fn span(mut self, length: Duration) -> Self {
        let start = self.next_start;
        self.lines.push(NewDetailLine::new(start, start + length));
        self.next_start = start + Duration::days(1);
        self
    }

    /// Sets the remark of the most recently added line
    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        if let Some(last) = self.lines.pop() {
            self.lines.push(last.with_remark(remark));
        }
        self
    }

    pub fn build(self) -> Vec<NewDetailLine> {
        self.lines
    }
}

/// Builds a `Claim` directly, bypassing the workflow
///
/// Useful for seeding stores in a given status.
pub struct ClaimBuilder {
    owner_id: StaffId,
    project_id: ProjectId,
    status: ClaimStatus,
    line_hours: Vec<i64>,
    hourly_rate: u64,
    remark: Option<String>,
    review_remark: Option<String>,
    created_at: DateTime<Utc>,
}

impl ClaimBuilder {
    pub fn new(owner_id: StaffId, project_id: ProjectId) -> Self {
        Self {
            owner_id,
            project_id,
            status: ClaimStatus::Draft,
            line_hours: vec![8, 4],
            hourly_rate: 25,
            remark: None,
            review_remark: None,
            created_at: TemporalFixtures::reference_now(),
        }
    }

    pub fn with_status(mut self, status: ClaimStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_line_hours(mut self, hours: Vec<i64>) -> Self {
        self.line_hours = hours;
        self
    }

    pub fn with_hourly_rate(mut self, rate: u64) -> Self {
        self.hourly_rate = rate;
        self
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }

    pub fn with_review_remark(mut self, remark: impl Into<String>) -> Self {
        self.review_remark = Some(remark.into());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    pub fn build(self) -> Claim {
        let mut start = self.created_at;
        let details = self
            .line_hours
            .iter()
            .map(|&hours| {
                let period = WorkPeriod::new(start, start + Duration::hours(hours))
                    .expect("builder line hours must be non-negative");
                start += Duration::days(1);
                ClaimDetail { period, remark: None }
            })
            .collect();

        let mut claim = Claim::draft(
            self.owner_id,
            self.project_id,
            details,
            self.remark,
            self.hourly_rate,
            self.created_at,
        );
        claim.status = self.status;
        claim.review_remark = self.review_remark;
        claim
    }
}
