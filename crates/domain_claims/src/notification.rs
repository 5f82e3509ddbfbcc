//! Notification intents and their dispatch
//!
//! The workflow never talks to the mail transport directly. It produces a
//! `NotificationIntent` describing what happened and who should hear about
//! it; the `NotificationDispatcher` later resolves addresses, renders the
//! fixed-shape HTML body from `MailTemplates` and hands the message to the
//! `MailSender`.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use tracing::{debug, error, warn};

use core_kernel::{ClaimId, PortError, ProjectId, StaffId};
use crate::claim::ClaimStatus;
use crate::ports::{MailMessage, MailSender, StaffDirectory};

/// Which message template to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Submitted,
    Approved,
    Returned,
    Rejected,
    Paid,
    PendingReminder,
}

impl TemplateKind {
    fn subject(&self, claims: &[ClaimSummary]) -> String {
        let first = claims.first();
        let staff = first.map(|c| c.staff_name.as_str()).unwrap_or("a staff member");
        let project = first.map(|c| c.project_name.as_str()).unwrap_or("a project");
        match self {
            TemplateKind::Submitted => format!("Overtime claim submitted by {staff} for {project}"),
            TemplateKind::Approved => format!("Overtime claim approved for {project}"),
            TemplateKind::Returned => format!("Overtime claim returned for {project}"),
            TemplateKind::Rejected => format!("Overtime claim rejected for {project}"),
            TemplateKind::Paid => format!("Overtime claim paid for {project}"),
            TemplateKind::PendingReminder => {
                format!("{} overtime claim(s) awaiting your approval", claims.len())
            }
        }
    }

    fn template_name(&self) -> &'static str {
        match self {
            TemplateKind::Submitted => "submitted.html",
            TemplateKind::Approved => "approved.html",
            TemplateKind::Returned => "returned.html",
            TemplateKind::Rejected => "rejected.html",
            TemplateKind::Paid => "paid.html",
            TemplateKind::PendingReminder => "pending_reminder.html",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Rule for resolving recipient addresses at dispatch time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recipient {
    /// The enrolled manager of the project
    ProjectManager(ProjectId),
    /// The staff member who owns the claim
    ClaimOwner(StaffId),
    /// A specific approver (used by reminders)
    Approver(StaffId),
    /// Everyone in the finance group
    FinanceGroup,
}

/// Rendering data for one claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSummary {
    pub claim_id: ClaimId,
    pub project_name: String,
    pub staff_name: String,
    pub staff_id: StaffId,
    pub status: ClaimStatus,
    pub total_working_hours: u32,
}

/// Who should be told what, decoupled from actual delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub template: TemplateKind,
    pub recipients: Vec<Recipient>,
    pub claims: Vec<ClaimSummary>,
    /// Reviewer remark shown in the body, if any
    pub remark: Option<String>,
}

impl NotificationIntent {
    pub fn new(template: TemplateKind, recipients: Vec<Recipient>, claims: Vec<ClaimSummary>) -> Self {
        Self {
            template,
            recipients,
            claims,
            remark: None,
        }
    }

    pub fn with_remark(mut self, remark: Option<String>) -> Self {
        self.remark = remark;
        self
    }
}

const CLAIM_NOTICE: &str = r#"<html><body>
<p>{% block headline %}{% endblock headline %}</p>
<table border="1" cellpadding="4">
<tr><th>Project</th><th>Staff</th><th>Staff ID</th><th>Hours</th><th>Status</th></tr>
{% for claim in claims -%}
<tr><td>{{ claim.project_name }}</td><td>{{ claim.staff_name }}</td><td>{{ claim.staff_id }}</td><td>{{ claim.total_working_hours }}</td><td>{{ claim.status }}</td></tr>
{% endfor -%}
</table>
{% if remark %}<p><b>Remark:</b> {{ remark }}</p>{% endif %}
</body></html>
"#;

const TEMPLATES: [(&str, &str); 7] = [
    ("claim_notice.html", CLAIM_NOTICE),
    (
        "submitted.html",
        r#"{% extends "claim_notice.html" %}{% block headline %}A new overtime claim is waiting for your approval.{% endblock headline %}"#,
    ),
    (
        "approved.html",
        r#"{% extends "claim_notice.html" %}{% block headline %}The following overtime claim has been approved.{% endblock headline %}"#,
    ),
    (
        "returned.html",
        r#"{% extends "claim_notice.html" %}{% block headline %}The following overtime claim was returned for changes.{% endblock headline %}"#,
    ),
    (
        "rejected.html",
        r#"{% extends "claim_notice.html" %}{% block headline %}The following overtime claim has been rejected.{% endblock headline %}"#,
    ),
    (
        "paid.html",
        r#"{% extends "claim_notice.html" %}{% block headline %}The following overtime claim has been paid.{% endblock headline %}"#,
    ),
    (
        "pending_reminder.html",
        r#"{% extends "claim_notice.html" %}{% block headline %}These overtime claims are still pending your approval.{% endblock headline %}"#,
    ),
];

/// Mail bodies, one `.html` template per `TemplateKind`
///
/// Template names end in `.html`, so Tera autoescapes every value taken from
/// the claim or the remark.
#[derive(Debug, Clone)]
pub struct MailTemplates {
    tera: Arc<Tera>,
}

impl MailTemplates {
    pub fn new() -> Self {
        let mut tera = Tera::default();
        if let Err(e) = tera.add_raw_templates(TEMPLATES) {
            error!(error = %e, "failed to register mail templates");
        }
        Self { tera: Arc::new(tera) }
    }

    /// Renders the subject and HTML body of `intent`
    pub fn render(&self, intent: &NotificationIntent) -> Result<(String, String), tera::Error> {
        let mut context = Context::new();
        context.insert("claims", &intent.claims);
        context.insert("remark", &intent.remark);

        let body = self.tera.render(intent.template.template_name(), &context)?;
        Ok((intent.template.subject(&intent.claims), body))
    }
}

impl Default for MailTemplates {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves recipients and hands rendered mail to the transport
#[derive(Clone)]
pub struct NotificationDispatcher {
    directory: Arc<dyn StaffDirectory>,
    mailer: Arc<dyn MailSender>,
    templates: MailTemplates,
}

impl NotificationDispatcher {
    pub fn new(directory: Arc<dyn StaffDirectory>, mailer: Arc<dyn MailSender>) -> Self {
        Self {
            directory,
            mailer,
            templates: MailTemplates::new(),
        }
    }

    /// Sends one notification; returns how many addresses it went to
    ///
    /// An intent whose recipients resolve to no address is dropped with a
    /// warning rather than treated as an error.
    pub async fn notify(&self, intent: &NotificationIntent) -> Result<usize, PortError> {
        let to = self.resolve_recipients(&intent.recipients).await?;
        if to.is_empty() {
            warn!(template = %intent.template, "notification has no resolvable recipients");
            return Ok(0);
        }

        let (subject, html_body) = self.templates.render(intent).map_err(|e| {
            PortError::internal(format!("failed to render {} mail: {e}", intent.template))
        })?;
        let message = MailMessage {
            to,
            subject,
            html_body,
        };
        self.mailer.send(&message).await?;
        debug!(template = %intent.template, recipients = message.to.len(), "notification sent");
        Ok(message.to.len())
    }

    /// Turns recipient rules into a sorted, de-duplicated address list
    pub async fn resolve_recipients(&self, recipients: &[Recipient]) -> Result<Vec<String>, PortError> {
        let mut addresses = BTreeSet::new();
        for recipient in recipients {
            match recipient {
                Recipient::ProjectManager(project_id) => {
                    let enrollment = self.directory.get_project_enrollment(*project_id).await?;
                    let manager = self.directory.get_staff(enrollment.manager_id).await?;
                    addresses.insert(manager.email);
                }
                Recipient::ClaimOwner(staff_id) | Recipient::Approver(staff_id) => {
                    addresses.insert(self.directory.get_staff(*staff_id).await?.email);
                }
                Recipient::FinanceGroup => {
                    addresses.extend(self.directory.finance_emails().await?);
                }
            }
        }
        Ok(addresses.into_iter().filter(|a| !a.trim().is_empty()).collect())
    }
}

impl fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationDispatcher").finish_non_exhaustive()
    }
}
