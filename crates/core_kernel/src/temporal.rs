//! Work periods and the clock port
//!
//! A `WorkPeriod` is the dated interval a claim detail line covers. The
//! `Clock` port is injected into services so that timestamps written to
//! claims and audit entries come from a single, replaceable source.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },
}

/// A closed interval of worked time
///
/// Unlike a validity window, a work period may be empty (`start == end`),
/// in which case it contributes zero hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPeriod {
    /// Start of the worked interval
    pub start: DateTime<Utc>,
    /// End of the worked interval
    pub end: DateTime<Utc>,
}

impl WorkPeriod {
    /// Creates a new work period
    ///
    /// # Errors
    ///
    /// Returns `TemporalError::InvalidPeriod` if `start` is after `end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Returns the length of the period
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns the number of whole hours worked in this period
    pub fn whole_hours(&self) -> u32 {
        u32::try_from(self.duration().num_hours()).unwrap_or(u32::MAX)
    }
}

/// Source of "now" for services
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation of `Clock`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
