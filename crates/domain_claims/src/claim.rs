//! Claim aggregate

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, ProjectId, StaffId, WorkPeriod};
use crate::error::ClaimError;

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Being prepared by its owner (also where returned claims land)
    Draft,
    /// Submitted and waiting for a reviewer
    PendingApproval,
    /// Approved, waiting for payment
    Approved,
    /// Paid out
    Paid,
    /// Rejected by a reviewer
    Rejected,
    /// Withdrawn by its owner
    Cancelled,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 6] = [
        ClaimStatus::Draft,
        ClaimStatus::PendingApproval,
        ClaimStatus::Approved,
        ClaimStatus::Paid,
        ClaimStatus::Rejected,
        ClaimStatus::Cancelled,
    ];

    /// Canonical storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Draft => "draft",
            ClaimStatus::PendingApproval => "pending_approval",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Paid => "paid",
            ClaimStatus::Rejected => "rejected",
            ClaimStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses accept no further mutation
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClaimStatus::Paid | ClaimStatus::Rejected | ClaimStatus::Cancelled
        )
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown claim status {s:?}"))
    }
}

/// One dated interval of work contributing hours to a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimDetail {
    pub period: WorkPeriod,
    pub remark: Option<String>,
}

impl ClaimDetail {
    /// Whole hours contributed by this line
    pub fn hours(&self) -> u32 {
        self.period.whole_hours()
    }
}

/// Unvalidated detail line as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDetailLine {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub remark: Option<String>,
}

impl NewDetailLine {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to, remark: None }
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }
}

/// Validates caller-supplied detail lines
///
/// Lines need not be contiguous or ordered; each must have `from <= to` and a
/// remark no longer than `max_remark_len` characters.
pub fn validate_details(
    lines: &[NewDetailLine],
    max_remark_len: usize,
) -> Result<Vec<ClaimDetail>, ClaimError> {
    if lines.is_empty() {
        return Err(ClaimError::validation("a claim needs at least one detail line"));
    }

    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let period = WorkPeriod::new(line.from, line.to).map_err(|e| {
                ClaimError::validation(format!("detail line {}: {}", index + 1, e))
            })?;
            let remark = normalize_remark(line.remark.as_deref());
            check_remark_length(remark.as_deref(), max_remark_len)?;
            Ok(ClaimDetail { period, remark })
        })
        .collect()
}

/// Trims a remark, turning blank input into `None`
pub fn normalize_remark(remark: Option<&str>) -> Option<String> {
    remark
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

/// Rejects remarks longer than the configured limit
pub fn check_remark_length(remark: Option<&str>, max_len: usize) -> Result<(), ClaimError> {
    match remark {
        Some(r) if r.chars().count() > max_len => Err(ClaimError::validation(format!(
            "remark exceeds {max_len} characters"
        ))),
        _ => Ok(()),
    }
}

/// An overtime claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,
    /// Staff member who owns the claim
    pub owner_id: StaffId,
    /// Project the work was done for
    pub project_id: ProjectId,
    /// Current status
    pub status: ClaimStatus,
    /// Worked intervals, in the order supplied
    pub details: Vec<ClaimDetail>,
    /// Sum of the detail lines' whole hours
    pub total_working_hours: u32,
    /// Derived from hours and the owner's hourly rate
    pub total_claim_amount: u64,
    /// Owner's remark
    pub remark: Option<String>,
    /// Remark left by the last reviewer who returned the claim
    pub review_remark: Option<String>,
    /// Optimistic concurrency version, bumped on every save
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// Creates a new draft claim with totals derived from `details`
    pub fn draft(
        owner_id: StaffId,
        project_id: ProjectId,
        details: Vec<ClaimDetail>,
        remark: Option<String>,
        hourly_rate: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut claim = Self {
            id: ClaimId::new_v7(),
            owner_id,
            project_id,
            status: ClaimStatus::Draft,
            details: Vec::new(),
            total_working_hours: 0,
            total_claim_amount: 0,
            remark,
            review_remark: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        claim.set_details(details, hourly_rate);
        claim
    }

    /// Replaces the detail lines wholesale and recomputes the totals
    pub fn replace_details(
        &mut self,
        details: Vec<ClaimDetail>,
        remark: Option<String>,
        hourly_rate: u64,
        now: DateTime<Utc>,
    ) {
        self.set_details(details, hourly_rate);
        self.remark = remark;
        self.updated_at = now;
    }

    /// Sum of whole hours over `details`
    pub fn hours_of(details: &[ClaimDetail]) -> u32 {
        details
            .iter()
            .fold(0u32, |acc, d| acc.saturating_add(d.hours()))
    }

    /// Earliest start and latest end over all detail lines
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.details.iter().map(|d| d.period.start).min()?;
        let end = self.details.iter().map(|d| d.period.end).max()?;
        Some((start, end))
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn set_details(&mut self, details: Vec<ClaimDetail>, hourly_rate: u64) {
        self.total_working_hours = Self::hours_of(&details);
        self.total_claim_amount = u64::from(self.total_working_hours).saturating_mul(hourly_rate);
        self.details = details;
    }
}
