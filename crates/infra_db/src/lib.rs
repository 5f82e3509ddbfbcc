//! Infrastructure Database Layer
//!
//! PostgreSQL adapters for the claim workflow ports, built on SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: repositories in `repositories`
//! own the SQL and return row types, and adapters in `adapters` implement the
//! domain ports on top of them.
//!
//! | Port | Adapter | Tables |
//! |---|---|---|
//! | `ClaimStore` | `PostgresClaimStore` | `claims`, `claim_details` |
//! | `AuditStore` | `PostgresAuditStore` | `claim_audit` |
//! | `StaffDirectory`, `RateLookup` | `PostgresStaffDirectory` | `staff`, `projects`, `project_members` |
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/claims")).await?;
//! run_migrations(&pool).await?;
//! let claims = PostgresClaimStore::new(pool.clone());
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig};
pub use error::{DatabaseError, db_to_port_error};
pub use adapters::{PostgresClaimStore, PostgresAuditStore, PostgresStaffDirectory};
