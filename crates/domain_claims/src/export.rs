//! Tabular payload handed to the external spreadsheet writer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::ClaimId;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One exported claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub claim_id: ClaimId,
    pub staff_name: String,
    pub department: String,
    pub project_name: String,
    /// Earliest start to latest end over the claim's detail lines
    pub duration: String,
    pub total_working_hours: u32,
    pub total_claim_amount: u64,
}

impl ExportRow {
    pub const HEADERS: [&'static str; 7] = [
        "Claim ID",
        "Staff Name",
        "Department",
        "Project",
        "Duration",
        "Hours",
        "Amount",
    ];

    pub fn format_duration(span: Option<(DateTime<Utc>, DateTime<Utc>)>) -> String {
        match span {
            Some((start, end)) => format!(
                "{} - {}",
                start.format(DATE_FORMAT),
                end.format(DATE_FORMAT)
            ),
            None => String::new(),
        }
    }

    /// Cell values in `HEADERS` order
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.claim_id.to_string(),
            self.staff_name.clone(),
            self.department.clone(),
            self.project_name.clone(),
            self.duration.clone(),
            self.total_working_hours.to_string(),
            self.total_claim_amount.to_string(),
        ]
    }
}

/// Rows plus grand totals
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimExport {
    pub rows: Vec<ExportRow>,
    pub grand_total_hours: u64,
    pub grand_total_amount: u64,
}

impl ClaimExport {
    pub fn from_rows(rows: Vec<ExportRow>) -> Self {
        let grand_total_hours = rows.iter().map(|r| u64::from(r.total_working_hours)).sum();
        let grand_total_amount = rows
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.total_claim_amount));
        Self {
            rows,
            grand_total_hours,
            grand_total_amount,
        }
    }
}
