//! Claims domain errors

use thiserror::Error;

use core_kernel::{PortError, TemporalError};
use crate::claim::ClaimStatus;
use crate::role::Role;
use crate::state_machine::ClaimAction;

/// Failures of the pure transition check
///
/// These are produced by `ClaimStateMachine::attempt_transition` without any
/// knowledge of persistence or identities beyond the ownership flag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot {action} a claim in status {from}")]
    InvalidTransition { from: ClaimStatus, action: ClaimAction },

    #[error("Role {role} may not {action} this claim")]
    Unauthorized { role: Role, action: ClaimAction },

    #[error("A non-empty remark is required to {0} a claim")]
    MissingRequiredRemark(ClaimAction),
}

/// Errors surfaced by the claim workflow
///
/// Every variant except `Port` is an expected business outcome; callers
/// report them back to the user and carry on.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid transition: cannot {action} a claim in status {from}")]
    InvalidTransition { from: ClaimStatus, action: ClaimAction },

    #[error("A non-empty remark is required to {0} a claim")]
    MissingRequiredRemark(ClaimAction),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Concurrent modification: {0}")]
    ConcurrencyConflict(String),

    #[error("Port failure: {0}")]
    Port(#[source] PortError),
}

impl ClaimError {
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        ClaimError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ClaimError::Unauthorized(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ClaimError::ValidationFailed(message.into())
    }

    /// Stable machine-readable code for this error
    pub fn kind(&self) -> &'static str {
        match self {
            ClaimError::NotFound { .. } => "not_found",
            ClaimError::Unauthorized(_) => "unauthorized",
            ClaimError::InvalidTransition { .. } => "invalid_transition",
            ClaimError::MissingRequiredRemark(_) => "missing_required_remark",
            ClaimError::ValidationFailed(_) => "validation_failed",
            ClaimError::ConcurrencyConflict(_) => "concurrency_conflict",
            ClaimError::Port(_) => "port_failure",
        }
    }

    /// Returns true for expected business outcomes, false for infrastructure failures
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ClaimError::Port(_))
    }
}

impl From<TransitionError> for ClaimError {
    fn from(error: TransitionError) -> Self {
        match error {
            TransitionError::InvalidTransition { from, action } => {
                ClaimError::InvalidTransition { from, action }
            }
            TransitionError::Unauthorized { .. } => ClaimError::Unauthorized(error.to_string()),
            TransitionError::MissingRequiredRemark(action) => {
                ClaimError::MissingRequiredRemark(action)
            }
        }
    }
}

impl From<PortError> for ClaimError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => ClaimError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Conflict { message } => ClaimError::ConcurrencyConflict(message),
            PortError::Validation { message } => ClaimError::ValidationFailed(message),
            other => ClaimError::Port(other),
        }
    }
}

impl From<TemporalError> for ClaimError {
    fn from(error: TemporalError) -> Self {
        ClaimError::ValidationFailed(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_not_found_maps_to_not_found() {
        let error: ClaimError = PortError::not_found("Claim", "CLM-1").into();
        assert_eq!(error.kind(), "not_found");
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_port_conflict_maps_to_concurrency_conflict() {
        let error: ClaimError = PortError::conflict("version 3 is stale").into();
        assert!(matches!(error, ClaimError::ConcurrencyConflict(_)));
    }

    #[test]
    fn test_connection_failure_is_not_recoverable() {
        let error: ClaimError = PortError::connection("refused").into();
        assert_eq!(error.kind(), "port_failure");
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_transition_unauthorized_keeps_reason() {
        let error: ClaimError = TransitionError::Unauthorized {
            role: Role::Staff,
            action: ClaimAction::Approve,
        }
        .into();
        assert!(error.to_string().contains("staff"));
        assert_eq!(error.kind(), "unauthorized");
    }
}
