//! Claims Service Runtime
//!
//! Everything the `claims-service` binary needs beyond the domain and the
//! database adapters: configuration loading, a log-backed mail transport, and
//! the wiring that runs the notification worker and the reminder sweep next
//! to the workflow service.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_service::{ServiceConfig, ServiceRuntime, LogMailSender};
//!
//! let config = ServiceConfig::from_env()?;
//! let runtime = ServiceRuntime::start(ports, Arc::new(LogMailSender::new(&config.mail_from)), config.workflow());
//! let service = runtime.service();
//! ```

pub mod config;
pub mod mail;
pub mod runtime;

pub use config::ServiceConfig;
pub use mail::LogMailSender;
pub use runtime::{log_health, run_reminder_sweep, ServiceRuntime};
