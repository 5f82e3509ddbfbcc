//! Actor roles
//!
//! Roles arrive from the directory as free-form strings. They are parsed once
//! at the boundary into a closed enum; anything unrecognised fails closed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::StaffId;

/// The single role an actor holds for the duration of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Ordinary staff member submitting their own claims
    Staff,
    /// Project manager reviewing claims for their projects
    Approver,
    /// Finance personnel reviewing and paying claims
    Finance,
    /// Master-data administrator; never takes part in the claim lifecycle
    Admin,
}

/// A role string that did not name any known role
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown role: {0:?}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 4] = [Role::Staff, Role::Approver, Role::Finance, Role::Admin];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Approver => "approver",
            Role::Finance => "finance",
            Role::Admin => "admin",
        }
    }

    /// Roles whose holders may own (create, edit, submit, cancel) claims
    pub fn can_own_claims(&self) -> bool {
        matches!(self, Role::Staff | Role::Approver | Role::Finance)
    }

    /// Roles that review claims pending approval
    pub fn can_review(&self) -> bool {
        matches!(self, Role::Approver | Role::Finance)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// An authenticated caller with its resolved role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: StaffId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: StaffId, role: Role) -> Self {
        Self { id, role }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Finance".parse::<Role>().unwrap(), Role::Finance);
        assert_eq!("  APPROVER ".parse::<Role>().unwrap(), Role::Approver);
    }

    #[test]
    fn test_unknown_role_fails_closed() {
        assert!("superuser".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_admin_cannot_own_or_review() {
        assert!(!Role::Admin.can_own_claims());
        assert!(!Role::Admin.can_review());
    }
}
