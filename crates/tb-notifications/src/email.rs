//! Email delivery
//!
//! Mail goes out through an [`EmailSender`]: the log sender in development,
//! an HTTP mail API in production, and an in-memory outbox in tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tb_core::config::{EmailConfig, EmailDeliveryMethod};
use tb_core::{Id, TbError};
use tb_models::NotificationKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
    #[error("Email delivery not configured: {0}")]
    NotConfigured(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type EmailResult<T> = Result<T, EmailError>;

impl From<EmailError> for TbError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::NotConfigured(message) => TbError::Config(message),
            other => TbError::ExternalService {
                service: "email".to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Format as RFC 5322
    pub fn to_rfc5322(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }

    fn is_plausible(&self) -> bool {
        match self.email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.'),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub from: EmailAddress,
    pub to: Vec<EmailAddress>,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EmailMessage {
    pub fn new(
        from: EmailAddress,
        to: Vec<EmailAddress>,
        subject: impl Into<String>,
        text_body: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from,
            to,
            subject: subject.into(),
            text_body: text_body.into(),
            html_body: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    fn check_recipients(&self) -> EmailResult<()> {
        if self.to.is_empty() {
            return Err(EmailError::InvalidRecipient("no recipients".to_string()));
        }
        match self.to.iter().find(|a| !a.is_plausible()) {
            Some(bad) => Err(EmailError::InvalidRecipient(bad.email.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send an email, returning the message id
    async fn send(&self, message: &EmailMessage) -> EmailResult<String>;

    fn name(&self) -> &'static str;
}

/// Writes mail to the log instead of sending it
#[derive(Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> EmailResult<String> {
        message.check_recipients()?;
        let to: Vec<String> = message.to.iter().map(|a| a.to_rfc5322()).collect();
        tracing::info!(
            id = %message.id,
            to = %to.join(", "),
            subject = %message.subject,
            "Email (log delivery)"
        );
        tracing::debug!(body = %message.text_body, "Email body");
        Ok(message.id.clone())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Posts mail as JSON to a transactional mail API
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct HttpMailPayload<'a> {
    from: &'a EmailAddress,
    to: &'a [EmailAddress],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
}

impl HttpEmailSender {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> EmailResult<String> {
        message.check_recipients()?;
        let payload = HttpMailPayload {
            from: &message.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.text_body,
            html: message.html_body.as_deref(),
        };

        let mut request = self.client.post(&self.api_url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::SendFailed(format!("{}: {}", status, body)));
        }

        tracing::debug!(id = %message.id, "Email accepted by mail API");
        Ok(message.id.clone())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Keeps sent mail in memory
#[derive(Debug, Default)]
pub struct MemoryEmailSender {
    outbox: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl MemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every delivery fails
    pub fn failing() -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.outbox.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.outbox.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.lock().is_empty()
    }
}

#[async_trait]
impl EmailSender for MemoryEmailSender {
    async fn send(&self, message: &EmailMessage) -> EmailResult<String> {
        if self.fail {
            return Err(EmailError::SendFailed("memory sender set to fail".to_string()));
        }
        message.check_recipients()?;
        self.outbox.lock().push(message.clone());
        Ok(message.id.clone())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Build the sender selected by `delivery_method`
pub fn sender_from_config(config: &EmailConfig) -> EmailResult<Arc<dyn EmailSender>> {
    match config.delivery_method {
        EmailDeliveryMethod::Log => Ok(Arc::new(LogEmailSender)),
        EmailDeliveryMethod::Http => {
            let api_url = config.api_url.clone().ok_or_else(|| {
                EmailError::NotConfigured("email.api_url is required for http delivery".into())
            })?;
            Ok(Arc::new(HttpEmailSender::new(api_url, config.api_key.clone())))
        }
    }
}

/// What an email is about
#[derive(Debug, Clone)]
pub struct EmailContent<'a> {
    pub kind: NotificationKind,
    pub title: &'a str,
    pub message: &'a str,
    pub workspace_id: Option<Id>,
    pub task_id: Option<Id>,
}

/// Renders notification emails with a link back into the frontend
#[derive(Debug, Clone)]
pub struct EmailRenderer {
    frontend_url: String,
    from: EmailAddress,
}

impl EmailRenderer {
    pub fn new(frontend_url: impl Into<String>, from: EmailAddress) -> Self {
        Self {
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
            from,
        }
    }

    pub fn from_config(config: &EmailConfig, frontend_url: &str) -> Self {
        Self::new(
            frontend_url,
            EmailAddress::new(&config.from_address).with_name(&config.from_name),
        )
    }

    pub fn render(&self, content: &EmailContent<'_>, to: EmailAddress) -> EmailMessage {
        let subject = format!("[Taskboard] {}", content.title);
        let link = self.link_for(content);
        let greeting = match &to.name {
            Some(name) => format!("Hi {},", name),
            None => "Hi,".to_string(),
        };

        let text_body = format!(
            "{greeting}\n\n{}\n\n{}: {link}\n\n---\n{}\n",
            content.message,
            action_label(content.kind),
            FOOTER
        );
        let html_body = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: -apple-system, 'Segoe UI', Roboto, sans-serif;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <p>{}</p>
    <p>{}</p>
    <p><a href="{}" style="display: inline-block; padding: 10px 20px; background: #4F46E5; color: white; text-decoration: none; border-radius: 4px;">{}</a></p>
    <p style="font-size: 12px; color: #666;">{}</p>
  </div>
</body>
</html>"#,
            escape_html(&greeting),
            escape_html(content.message),
            escape_html(&link),
            action_label(content.kind),
            FOOTER
        );

        EmailMessage::new(self.from.clone(), vec![to], subject, text_body).with_html(html_body)
    }

    fn link_for(&self, content: &EmailContent<'_>) -> String {
        match (content.kind, content.task_id, content.workspace_id) {
            (NotificationKind::WorkspaceInvitation, _, _) => {
                format!("{}/invitations", self.frontend_url)
            }
            (_, Some(task_id), _) => format!("{}/tasks/{}", self.frontend_url, task_id),
            (_, None, Some(workspace_id)) => {
                format!("{}/workspaces/{}", self.frontend_url, workspace_id)
            }
            _ => format!("{}/notifications", self.frontend_url),
        }
    }
}

const FOOTER: &str =
    "You received this email because email notifications are enabled in your Taskboard profile.";

fn action_label(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::WorkspaceInvitation => "Review invitation",
        NotificationKind::TaskAssigned
        | NotificationKind::TaskUpdated
        | NotificationKind::TaskCommented
        | NotificationKind::TaskDueSoon => "Open task",
        _ => "Open Taskboard",
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> EmailRenderer {
        EmailRenderer::new(
            "https://app.taskboard.test/",
            EmailAddress::new("no-reply@taskboard.test").with_name("Taskboard"),
        )
    }

    #[test]
    fn test_email_address_format() {
        let addr = EmailAddress::new("test@example.com").with_name("Test User");
        assert_eq!(addr.to_rfc5322(), "Test User <test@example.com>");
        assert_eq!(EmailAddress::new("a@example.com").to_rfc5322(), "a@example.com");
    }

    #[test]
    fn test_render_task_assigned() {
        let content = EmailContent {
            kind: NotificationKind::TaskAssigned,
            title: "Task assigned: Write <report>",
            message: "Ada assigned you \"Write <report>\"",
            workspace_id: Some(3),
            task_id: Some(42),
        };
        let email = renderer().render(&content, EmailAddress::new("bob@example.com").with_name("Bob"));

        assert_eq!(email.subject, "[Taskboard] Task assigned: Write <report>");
        assert!(email.text_body.starts_with("Hi Bob,"));
        assert!(email.text_body.contains("https://app.taskboard.test/tasks/42"));
        let html = email.html_body.unwrap();
        assert!(html.contains("Write &lt;report&gt;"));
        assert!(!html.contains("<report>"));
    }

    #[test]
    fn test_invitation_links_to_invitations() {
        let content = EmailContent {
            kind: NotificationKind::WorkspaceInvitation,
            title: "Invitation to Design",
            message: "You were invited",
            workspace_id: Some(3),
            task_id: None,
        };
        let email = renderer().render(&content, EmailAddress::new("bob@example.com"));
        assert!(email.text_body.contains("https://app.taskboard.test/invitations"));
        assert!(email.text_body.contains("Review invitation"));
    }

    #[tokio::test]
    async fn test_memory_sender_records() {
        let sender = MemoryEmailSender::new();
        let message = EmailMessage::new(
            EmailAddress::new("from@example.com"),
            vec![EmailAddress::new("to@example.com")],
            "Hello",
            "Body",
        );
        let id = sender.send(&message).await.unwrap();
        assert_eq!(id, message.id);
        assert_eq!(sender.len(), 1);
        assert_eq!(sender.sent()[0].subject, "Hello");

        let failing = MemoryEmailSender::failing();
        assert!(failing.send(&message).await.is_err());
        assert!(failing.is_empty());
    }

    #[tokio::test]
    async fn test_log_sender_rejects_bad_recipient() {
        let message = EmailMessage::new(
            EmailAddress::new("from@example.com"),
            vec![EmailAddress::new("not-an-address")],
            "Hello",
            "Body",
        );
        let err = LogEmailSender.send(&message).await.unwrap_err();
        assert!(matches!(err, EmailError::InvalidRecipient(_)));
    }

    #[test]
    fn test_sender_from_config() {
        let mut config = tb_core::config::AppConfig::default().email;
        assert_eq!(sender_from_config(&config).unwrap().name(), "log");

        config.delivery_method = EmailDeliveryMethod::Http;
        assert!(matches!(
            sender_from_config(&config),
            Err(EmailError::NotConfigured(_))
        ));

        config.api_url = Some("https://mail.example.com/send".into());
        assert_eq!(sender_from_config(&config).unwrap().name(), "http");
    }
}
