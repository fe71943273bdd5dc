//! Email notifications to the admin team.
//!
//! ARCHITECTURE
//! ============
//! Callers build a [`Notification`], which renders its own subject and HTML
//! body from the templates in `templates/`. A [`Notifier`] addresses the
//! message and hands it to a [`Mailer`]; production uses Resend, tests use a
//! recording mock.
//!
//! Notifications never break the action that triggered them: `dispatch`
//! spawns the send and only logs failures.

use std::fmt::Write;
use std::sync::Arc;

use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::crm::kpi::KpiCards;
use crate::crm::pivot::PivotTable;
use crate::services::analysis::LeadAnalysis;

const SIGNUP_TEMPLATE: &str = include_str!("../../templates/signup.html");
const MESSAGE_TEMPLATE: &str = include_str!("../../templates/message.html");
const FORM_SUBMISSION_TEMPLATE: &str = include_str!("../../templates/form_submission.html");
const SUMMARY_REPORT_TEMPLATE: &str = include_str!("../../templates/summary_report.html");
const PASSWORD_RESET_TEMPLATE: &str = include_str!("../../templates/password_reset.html");

pub const FOOTER: &str = "This is an automated notification from your lead desk CRM";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("email delivery is not configured")]
    Disabled,
    #[error("no recipients configured")]
    NoRecipients,
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

impl crate::frame::ErrorCode for NotifyError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Disabled => "E_NOTIFY_DISABLED",
            Self::NoRecipients => "E_NOTIFY_NO_RECIPIENTS",
            Self::Delivery(_) => "E_NOTIFY_DELIVERY",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

#[derive(Debug, Clone)]
pub enum Notification {
    Signup {
        full_name: Option<String>,
        email: String,
        at: OffsetDateTime,
    },
    Message {
        sender_name: Option<String>,
        sender_email: String,
        content: String,
        conversation_url: String,
    },
    FormSubmission {
        full_name: String,
        email: String,
        form_type: String,
        /// Label/value pairs in display order.
        fields: Vec<(String, String)>,
    },
    SummaryReport {
        generated_at: OffsetDateTime,
        kpis: KpiCards,
        pivot: PivotTable,
        analysis: Option<LeadAnalysis>,
    },
    PasswordReset {
        email: String,
        reset_url: String,
    },
}

impl Notification {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Signup { .. } => "signup",
            Self::Message { .. } => "message",
            Self::FormSubmission { .. } => "form_submission",
            Self::SummaryReport { .. } => "summary_report",
            Self::PasswordReset { .. } => "password_reset",
        }
    }

    #[must_use]
    pub fn subject(&self) -> String {
        match self {
            Self::Signup { full_name, email, .. } => {
                format!("🎉 New User Signup: {}", non_empty(full_name.as_deref()).unwrap_or(email))
            }
            Self::Message { sender_name, sender_email, .. } => {
                format!("💬 New Message from {}", non_empty(sender_name.as_deref()).unwrap_or(sender_email))
            }
            Self::FormSubmission { full_name, email, form_type, .. } => {
                format!(
                    "📋 New {form_type} Submission from {}",
                    non_empty(Some(full_name)).unwrap_or(email)
                )
            }
            Self::SummaryReport { generated_at, .. } => {
                format!("📊 Lead Summary Report for {}", generated_at.date())
            }
            Self::PasswordReset { .. } => "Reset your password".to_string(),
        }
    }

    #[must_use]
    pub fn render_html(&self) -> String {
        let html = match self {
            Self::Signup { full_name, email, at } => SIGNUP_TEMPLATE
                .replace("{{FULL_NAME}}", &escape_html(non_empty(full_name.as_deref()).unwrap_or("Not provided")))
                .replace("{{EMAIL}}", &escape_html(email))
                .replace("{{TIMESTAMP}}", &escape_html(&format_timestamp(*at))),
            Self::Message { sender_name, sender_email, content, conversation_url } => MESSAGE_TEMPLATE
                .replace("{{SENDER_NAME}}", &escape_html(non_empty(sender_name.as_deref()).unwrap_or("Unknown")))
                .replace("{{SENDER_EMAIL}}", &escape_html(sender_email))
                .replace("{{CONTENT}}", &escape_html(content))
                .replace("{{CONVERSATION_URL}}", &escape_html(conversation_url)),
            Self::FormSubmission { full_name, email, form_type, fields } => FORM_SUBMISSION_TEMPLATE
                .replace("{{FORM_TYPE}}", &escape_html(form_type))
                .replace("{{FULL_NAME}}", &escape_html(non_empty(Some(full_name)).unwrap_or("Unknown")))
                .replace("{{EMAIL}}", &escape_html(email))
                .replace("{{FIELD_ROWS}}", &field_rows(fields)),
            Self::SummaryReport { generated_at, kpis, pivot, analysis } => SUMMARY_REPORT_TEMPLATE
                .replace("{{GENERATED_AT}}", &escape_html(&format_timestamp(*generated_at)))
                .replace("{{KPI_ROWS}}", &kpi_rows(kpis))
                .replace("{{PIVOT_ROWS}}", &pivot_rows(pivot))
                .replace("{{ANALYSIS}}", &analysis_section(analysis.as_ref())),
            Self::PasswordReset { email, reset_url } => PASSWORD_RESET_TEMPLATE
                .replace("{{EMAIL}}", &escape_html(email))
                .replace("{{RESET_URL}}", &escape_html(reset_url)),
        };
        html.replace("{{FOOTER}}", FOOTER)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Escape the five HTML-significant characters.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `Monday, March 10, 2025 at 12:05 PM UTC`.
#[must_use]
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let fmt = format_description!(
        "[weekday], [month repr:long] [day padding:none], [year] at [hour repr:12 padding:none]:[minute] [period] UTC"
    );
    at.to_offset(time::UtcOffset::UTC)
        .format(&fmt)
        .unwrap_or_else(|_| at.to_string())
}

const CELL_LABEL: &str = "padding: 10px 12px; border-bottom: 1px solid #e5e7eb; font-weight: 600; color: #6b7280;";
const CELL_VALUE: &str = "padding: 10px 12px; border-bottom: 1px solid #e5e7eb;";

fn field_rows(fields: &[(String, String)]) -> String {
    let mut out = String::new();
    for (label, value) in fields {
        let value = non_empty(Some(value)).unwrap_or("Not provided");
        let _ = writeln!(
            out,
            r#"      <tr><td style="{CELL_LABEL}">{}</td><td style="{CELL_VALUE}">{}</td></tr>"#,
            escape_html(&label.replace('_', " ")),
            escape_html(value)
        );
    }
    out
}

fn kpi_rows(kpis: &KpiCards) -> String {
    let rows = [
        ("Total Leads", kpis.total),
        ("New Leads", kpis.new),
        ("Contacted", kpis.contacted),
        ("Closed", kpis.closed),
        ("Buyers", kpis.buy),
        ("Sellers", kpis.sell),
        ("Work With Me", kpis.work),
    ];
    let mut out = String::new();
    for (label, count) in rows {
        let _ = writeln!(
            out,
            r#"      <tr><td style="{CELL_LABEL}">{label}</td><td style="{CELL_VALUE}">{count}</td></tr>"#
        );
    }
    out
}

fn pivot_rows(pivot: &PivotTable) -> String {
    let mut out = String::new();
    let _ = write!(out, r#"      <tr><td style="{CELL_LABEL}">Type</td>"#);
    for status in &pivot.statuses {
        let _ = write!(out, r#"<td style="{CELL_LABEL}">{}</td>"#, status.label());
    }
    let _ = writeln!(out, r#"<td style="{CELL_LABEL}">Total</td></tr>"#);

    for row in &pivot.rows {
        let _ = write!(out, r#"      <tr><td style="{CELL_LABEL}">{}</td>"#, escape_html(&row.label));
        for count in &row.counts {
            let _ = write!(out, r#"<td style="{CELL_VALUE}">{count}</td>"#);
        }
        let _ = writeln!(out, r#"<td style="{CELL_VALUE}">{}</td></tr>"#, row.total);
    }

    let _ = write!(out, r#"      <tr><td style="{CELL_LABEL}">Total</td>"#);
    for count in &pivot.column_totals {
        let _ = write!(out, r#"<td style="{CELL_LABEL}">{count}</td>"#);
    }
    let _ = writeln!(out, r#"<td style="{CELL_LABEL}">{}</td></tr>"#, pivot.grand_total);
    out
}

fn analysis_section(analysis: Option<&LeadAnalysis>) -> String {
    let Some(analysis) = analysis else {
        return String::new();
    };
    let mut out = String::new();
    let _ = writeln!(out, r#"    <h2 style="font-size: 16px; margin: 25px 0 10px;">AI Insights</h2>"#);
    let _ = writeln!(out, r#"    <p style="margin: 0 0 15px;">{}</p>"#, escape_html(&analysis.summary));

    if !analysis.high_priority_leads.is_empty() {
        let _ = writeln!(out, r#"    <h3 style="font-size: 14px; margin: 15px 0 8px;">High-Priority Leads</h3>"#);
        let _ = writeln!(out, "    <ul>");
        for lead in &analysis.high_priority_leads {
            let _ = writeln!(
                out,
                "      <li><strong>{}</strong> ({}/100): {} <em>{}</em></li>",
                escape_html(&lead.name),
                lead.score,
                escape_html(&lead.reason),
                escape_html(&lead.suggested_action)
            );
        }
        let _ = writeln!(out, "    </ul>");
    }

    if !analysis.recommendations.is_empty() {
        let _ = writeln!(out, r#"    <h3 style="font-size: 14px; margin: 15px 0 8px;">Recommendations</h3>"#);
        let _ = writeln!(out, "    <ol>");
        for rec in &analysis.recommendations {
            let _ = writeln!(out, "      <li>{}</li>", escape_html(rec));
        }
        let _ = writeln!(out, "    </ol>");
    }
    out
}

// =============================================================================
// DELIVERY
// =============================================================================

/// A fully addressed, rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Transactional email transport. Enables mocking in tests.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// # Errors
    ///
    /// Returns [`NotifyError::Delivery`] when the provider rejects the send.
    async fn send(&self, email: &Email) -> Result<(), NotifyError>;
}

pub struct ResendMailer {
    client: Resend,
    from: String,
}

impl ResendMailer {
    #[must_use]
    pub fn new(api_key: &str, from: impl Into<String>) -> Self {
        Self { client: Resend::new(api_key), from: from.into() }
    }
}

#[async_trait::async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        let to: Vec<&str> = email.to.iter().map(String::as_str).collect();
        let options = CreateEmailBaseOptions::new(&self.from, to, &email.subject).with_html(&email.html);
        self.client
            .emails
            .send(options)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(())
    }
}

/// Addresses notifications and hands them to the configured mailer.
#[derive(Clone)]
pub struct Notifier {
    mailer: Option<Arc<dyn Mailer>>,
    admin_recipients: Vec<String>,
}

impl Notifier {
    #[must_use]
    pub fn new(mailer: Option<Arc<dyn Mailer>>, admin_recipients: Vec<String>) -> Self {
        Self { mailer, admin_recipients }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Admin notifications go to the configured team; a password reset goes
    /// only to the account owner.
    fn address(&self, notification: &Notification) -> Result<Email, NotifyError> {
        let to = match notification {
            Notification::PasswordReset { email, .. } => vec![email.clone()],
            _ => self.admin_recipients.clone(),
        };
        if to.is_empty() {
            return Err(NotifyError::NoRecipients);
        }
        Ok(Email { to, subject: notification.subject(), html: notification.render_html() })
    }

    /// Render and send, waiting for the provider.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when mail is disabled, nobody is addressed, or
    /// delivery fails.
    pub async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let Some(mailer) = &self.mailer else {
            return Err(NotifyError::Disabled);
        };
        let email = self.address(notification)?;
        mailer.send(&email).await?;
        tracing::info!(kind = notification.kind(), recipients = email.to.len(), "notification sent");
        Ok(())
    }

    /// Fire-and-forget send. Failures are logged, never surfaced.
    pub fn dispatch(&self, notification: Notification) {
        if self.mailer.is_none() {
            tracing::debug!(kind = notification.kind(), "email disabled; notification skipped");
            return;
        }
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&notification).await {
                tracing::warn!(kind = notification.kind(), error = %e, "notification failed");
            }
        });
    }
}

#[cfg(test)]
#[path = "notify_test.rs"]
mod tests;
