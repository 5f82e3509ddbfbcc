//! Core Kernel - Foundational types shared by the claims workflow crates
//!
//! This crate provides the building blocks used across the workspace:
//! - Strongly typed identifiers for claims, staff, projects and audit entries
//! - The `WorkPeriod` value object and the `Clock` port
//! - Port infrastructure (`PortError`, `DomainPort`, health checks)

pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use temporal::{WorkPeriod, TemporalError, Clock, SystemClock};
pub use identifiers::{ClaimId, StaffId, ProjectId, AuditEntryId};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
pub use error::CoreError;
