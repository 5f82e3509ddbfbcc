//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use domain_claims::{ClaimAction, ClaimStatus, NewDetailLine, Role};

/// Any claim status
pub fn claim_status_strategy() -> impl Strategy<Value = ClaimStatus> {
    proptest::sample::select(ClaimStatus::ALL.to_vec())
}

/// Paid, Rejected or Cancelled
pub fn terminal_status_strategy() -> impl Strategy<Value = ClaimStatus> {
    prop_oneof![
        Just(ClaimStatus::Paid),
        Just(ClaimStatus::Rejected),
        Just(ClaimStatus::Cancelled),
    ]
}

/// Any workflow action
pub fn claim_action_strategy() -> impl Strategy<Value = ClaimAction> {
    proptest::sample::select(ClaimAction::ALL.to_vec())
}

/// Any role
pub fn role_strategy() -> impl Strategy<Value = Role> {
    proptest::sample::select(Role::ALL.to_vec())
}

/// A remark with at least one non-whitespace character
pub fn remark_strategy() -> impl Strategy<Value = String> {
    "[ ]{0,3}[a-zA-Z0-9][a-zA-Z0-9 .,!?]{0,40}"
}

/// A missing, empty or whitespace-only remark
pub fn blank_remark_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        "[ \t\n]{1,8}".prop_map(Some),
    ]
}

/// Start instants across 2024, on the minute
pub fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0i64..365 * 24 * 60).prop_map(move |minutes| base + Duration::minutes(minutes))
}

/// A well-formed detail line between zero minutes and 16 hours long
pub fn detail_line_strategy() -> impl Strategy<Value = NewDetailLine> {
    (instant_strategy(), 0i64..=16 * 60)
        .prop_map(|(start, minutes)| NewDetailLine::new(start, start + Duration::minutes(minutes)))
}

/// One to eight well-formed detail lines, not necessarily ordered
pub fn detail_lines_strategy() -> impl Strategy<Value = Vec<NewDetailLine>> {
    prop::collection::vec(detail_line_strategy(), 1..=8)
}
