//! Claims Workflow Domain
//!
//! This crate implements the overtime claim lifecycle: drafting, submission,
//! review by project managers and finance, payment, and the audit trail and
//! notifications that accompany each step.
//!
//! # Claim Lifecycle
//!
//! ```text
//! Draft -> PendingApproval -> Approved -> Paid
//!   ^          |    |             |
//!   +- Return -+    +-> Rejected <+
//!
//! Draft | PendingApproval -> Cancelled
//! ```

pub mod error;
pub mod role;
pub mod claim;
pub mod state_machine;
pub mod audit;
pub mod ports;
pub mod notification;
pub mod queue;
pub mod bulk;
pub mod export;
pub mod workflow;

pub use error::{ClaimError, TransitionError};
pub use role::{Actor, Role, UnknownRole};
pub use claim::{Claim, ClaimDetail, ClaimStatus, NewDetailLine};
pub use state_machine::{ClaimAction, ClaimStateMachine, TransitionRule, TRANSITIONS};
pub use audit::{AuditAction, AuditEntry, AuditLogger};
pub use ports::{AuditStore, ClaimStore, MailMessage, MailSender, ProjectEnrollment, RateLookup, StaffDirectory, StaffProfile};
pub use notification::{ClaimSummary, MailTemplates, NotificationDispatcher, NotificationIntent, Recipient, TemplateKind};
pub use queue::{NotificationQueue, NotificationWorker, WorkerHandle, WorkerStats};
pub use bulk::{BulkFailure, BulkOperationCoordinator, BulkOutcome};
pub use export::{ClaimExport, ExportRow};
pub use workflow::{ClaimWorkflowService, TransitionOutcome, WorkflowConfig, WorkflowPorts};
