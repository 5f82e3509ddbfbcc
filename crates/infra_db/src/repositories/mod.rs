//! Repository implementations
//!
//! Repositories encapsulate SQL and speak in row types; the adapters in
//! `crate::adapters` map rows to domain types and errors to `PortError`.

pub mod claims;
pub mod audit;
pub mod directory;

pub use claims::{ClaimsRepository, ClaimRow, ClaimDetailRow, ClaimWithDetails};
pub use audit::{AuditRepository, AuditRow};
pub use directory::{DirectoryRepository, StaffRow, ProjectRow};
