//! Claim lifecycle state machine
//!
//! Pure decision logic: given the current status, the requested action, the
//! actor's role and whether the actor owns the claim, decide whether the
//! transition is legal and what status results.
//!
//! ```text
//!            Submit              Approve              Pay
//!   Draft ───────────► Pending ───────────► Approved ───────► Paid
//!     ▲  ◄─────────────  │  │                  │
//!     │      Return      │  └──── Pay ─────────┼──────────────► Paid
//!     │                  │ Reject              │ Reject
//!     │ Update           ▼                     ▼
//!     └──(self)       Rejected ◄───────────────┘
//!
//!   Draft | Pending ── Cancel ──► Cancelled
//! ```
//!
//! Cross-identity rules (an owner may not review their own claim, an approver
//! may only review claims of projects they manage) live in the workflow
//! service, which can see both identities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::claim::ClaimStatus;
use crate::error::TransitionError;
use crate::role::Role;

/// An action an actor may request on a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimAction {
    /// Edit detail lines of a draft (status unchanged)
    Update,
    Submit,
    Approve,
    Return,
    Reject,
    Pay,
    Cancel,
}

impl ClaimAction {
    pub const ALL: [ClaimAction; 7] = [
        ClaimAction::Update,
        ClaimAction::Submit,
        ClaimAction::Approve,
        ClaimAction::Return,
        ClaimAction::Reject,
        ClaimAction::Pay,
        ClaimAction::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimAction::Update => "update",
            ClaimAction::Submit => "submit",
            ClaimAction::Approve => "approve",
            ClaimAction::Return => "return",
            ClaimAction::Reject => "reject",
            ClaimAction::Pay => "pay",
            ClaimAction::Cancel => "cancel",
        }
    }

    /// Actions reserved for the claim's owner
    pub fn is_owner_action(&self) -> bool {
        matches!(
            self,
            ClaimAction::Update | ClaimAction::Submit | ClaimAction::Cancel
        )
    }

    /// Actions taken by someone judging the claim; the owner may never take these
    pub fn is_review_action(&self) -> bool {
        matches!(
            self,
            ClaimAction::Approve | ClaimAction::Return | ClaimAction::Reject | ClaimAction::Pay
        )
    }

    /// Actions that cannot proceed without a non-empty remark
    pub fn requires_remark(&self) -> bool {
        matches!(self, ClaimAction::Return)
    }
}

impl fmt::Display for ClaimAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One edge of the lifecycle graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: ClaimStatus,
    pub action: ClaimAction,
    pub to: ClaimStatus,
}

const fn rule(from: ClaimStatus, action: ClaimAction, to: ClaimStatus) -> TransitionRule {
    TransitionRule { from, action, to }
}

/// The complete transition table; any pair not listed here is invalid
pub const TRANSITIONS: [TransitionRule; 10] = [
    rule(ClaimStatus::Draft, ClaimAction::Update, ClaimStatus::Draft),
    rule(ClaimStatus::Draft, ClaimAction::Submit, ClaimStatus::PendingApproval),
    rule(ClaimStatus::PendingApproval, ClaimAction::Approve, ClaimStatus::Approved),
    rule(ClaimStatus::PendingApproval, ClaimAction::Return, ClaimStatus::Draft),
    rule(ClaimStatus::PendingApproval, ClaimAction::Reject, ClaimStatus::Rejected),
    rule(ClaimStatus::Approved, ClaimAction::Reject, ClaimStatus::Rejected),
    rule(ClaimStatus::Approved, ClaimAction::Pay, ClaimStatus::Paid),
    rule(ClaimStatus::PendingApproval, ClaimAction::Pay, ClaimStatus::Paid),
    rule(ClaimStatus::Draft, ClaimAction::Cancel, ClaimStatus::Cancelled),
    rule(ClaimStatus::PendingApproval, ClaimAction::Cancel, ClaimStatus::Cancelled),
];

/// Stateless evaluator of the lifecycle rules
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimStateMachine;

impl ClaimStateMachine {
    /// Looks up the target status for `(current, action)`
    pub fn next_state(current: ClaimStatus, action: ClaimAction) -> Option<ClaimStatus> {
        TRANSITIONS
            .iter()
            .find(|r| r.from == current && r.action == action)
            .map(|r| r.to)
    }

    /// Whether `role` (with the given ownership) may perform `action` at all
    pub fn permits(action: ClaimAction, role: Role, is_owner: bool) -> bool {
        match action {
            ClaimAction::Update | ClaimAction::Submit | ClaimAction::Cancel => {
                is_owner && role.can_own_claims()
            }
            ClaimAction::Approve | ClaimAction::Return | ClaimAction::Reject => role.can_review(),
            ClaimAction::Pay => role == Role::Finance,
        }
    }

    /// Decides whether a transition is legal and returns the resulting status
    ///
    /// Checks run in a fixed order: a missing mandatory remark is reported
    /// first, then an action that is not legal from `current`, then a role or
    /// ownership violation.
    ///
    /// # Errors
    ///
    /// * `MissingRequiredRemark` - the action needs a remark and it is blank
    /// * `InvalidTransition` - `(current, action)` is not in the table
    /// * `Unauthorized` - the role/ownership combination may not take the action
    pub fn attempt_transition(
        current: ClaimStatus,
        action: ClaimAction,
        role: Role,
        is_owner: bool,
        remark: Option<&str>,
    ) -> Result<ClaimStatus, TransitionError> {
        if action.requires_remark() && remark.map_or(true, |r| r.trim().is_empty()) {
            return Err(TransitionError::MissingRequiredRemark(action));
        }

        let next = Self::next_state(current, action)
            .ok_or(TransitionError::InvalidTransition { from: current, action })?;

        if !Self::permits(action, role, is_owner) {
            return Err(TransitionError::Unauthorized { role, action });
        }

        Ok(next)
    }

    /// Actions the actor could legally take on a claim in `current`
    pub fn available_actions(current: ClaimStatus, role: Role, is_owner: bool) -> Vec<ClaimAction> {
        TRANSITIONS
            .iter()
            .filter(|r| r.from == current && Self::permits(r.action, role, is_owner))
            .map(|r| r.action)
            .collect()
    }
}
