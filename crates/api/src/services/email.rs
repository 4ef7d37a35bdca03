//! Email service for alert notifications.
//!
//! Supports two providers:
//! - `console`: Logs emails to console (development)
//! - `sendgrid`: Uses the SendGrid v3 mail API

use crate::config::EmailConfig;
use domain::error::NotificationError;
use domain::models::{AlertSnapshot, Severity};
use domain::services::AlertNotifier;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};
use validator::ValidateEmail;

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Email service disabled")]
    Disabled,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl From<EmailError> for NotificationError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::Disabled => NotificationError::Disabled,
            EmailError::InvalidAddress(addr) => NotificationError::InvalidRecipient(addr),
            other => NotificationError::DeliveryFailed(other.to_string()),
        }
    }
}

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient email address
    pub to: String,
    /// Recipient name (optional)
    pub to_name: Option<String>,
    /// Email subject
    pub subject: String,
    /// Plain text body
    pub body_text: String,
    /// HTML body (optional)
    pub body_html: Option<String>,
}

/// Header colour per severity in the HTML template.
pub fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "#10b981",
        Severity::Medium => "#f59e0b",
        Severity::High => "#f97316",
        Severity::Critical => "#ef4444",
    }
}

/// Subject line for an alert email.
pub fn alert_subject(alert: &AlertSnapshot, user_name: &str) -> String {
    format!(
        "[{}] Alert for {}",
        alert.severity.as_str().to_uppercase(),
        user_name
    )
}

fn describe_objects(alert: &AlertSnapshot) -> String {
    if alert.detected_objects.is_empty() {
        return "none".to_string();
    }
    alert
        .detected_objects
        .iter()
        .map(|o| {
            if o.has_known_distance() {
                format!("{} ({})", o.category, o.distance)
            } else {
                o.category.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

/// Email service for sending alert notifications.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    client: reqwest::Client,
}

impl EmailService {
    /// Creates a new EmailService with the given configuration.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmailError::ProviderError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Check if email service is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send an email message.
    ///
    /// A disabled service reports [`EmailError::Disabled`] so callers do not
    /// mistake a skipped send for a delivered one.
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Err(EmailError::Disabled);
        }

        if !message.to.validate_email() {
            return Err(EmailError::InvalidAddress(message.to));
        }

        match self.config.provider.as_str() {
            "console" => self.send_console(message).await,
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    /// Builds the alert email for one recipient.
    pub fn compose_alert_email(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        alert: &AlertSnapshot,
        user_name: &str,
    ) -> EmailMessage {
        let dashboard_url = format!("{}/dashboard", self.config.base_url.trim_end_matches('/'));
        let time = alert.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
        let objects = describe_objects(alert);

        let body_text = format!(
            r#"Hi {recipient},

{user} may need your attention. A {severity} {alert_type} alert was raised.

What was seen:
{description}

Detected objects: {objects}
Time: {time}

Open the dashboard for details: {url}

This is an automated message from Drishti."#,
            recipient = recipient_name,
            user = user_name,
            severity = alert.severity,
            alert_type = alert.alert_type,
            description = alert.description,
            objects = objects,
            time = time,
            url = dashboard_url
        );

        let body_html = if self.config.template_style == "html" {
            Some(format!(
                r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Drishti alert</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background: {color}; padding: 24px; border-radius: 10px 10px 0 0;">
        <h1 style="color: white; margin: 0; font-size: 22px;">{severity_upper} alert for {user}</h1>
    </div>
    <div style="background: #f9f9f9; padding: 30px; border-radius: 0 0 10px 10px;">
        <p>Hi {recipient},</p>
        <p><strong>Type:</strong> {alert_type}</p>
        <p><strong>What was seen:</strong><br>{description}</p>
        <p><strong>Detected objects:</strong> {objects}</p>
        <p style="color: #666; font-size: 14px;">{time}</p>
        <div style="text-align: center; margin: 30px 0;">
            <a href="{url}" style="background: {color}; color: white; padding: 14px 28px; text-decoration: none; border-radius: 6px; font-weight: bold; display: inline-block;">Open dashboard</a>
        </div>
        <hr style="border: none; border-top: 1px solid #ddd; margin: 30px 0;">
        <p style="color: #999; font-size: 12px;">This is an automated message from Drishti.</p>
    </div>
</body>
</html>"#,
                color = severity_color(alert.severity),
                severity_upper = alert.severity.as_str().to_uppercase(),
                user = escape_html(user_name),
                recipient = escape_html(recipient_name),
                alert_type = alert.alert_type,
                description = escape_html(&alert.description),
                objects = escape_html(&objects),
                time = time,
                url = dashboard_url
            ))
        } else {
            None
        };

        EmailMessage {
            to: recipient_email.to_string(),
            to_name: Some(recipient_name.to_string()),
            subject: alert_subject(alert, user_name),
            body_text,
            body_html,
        }
    }

    /// Send an alert email to one recipient.
    pub async fn send_alert_email(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        alert: &AlertSnapshot,
        user_name: &str,
    ) -> Result<(), EmailError> {
        let message = self.compose_alert_email(recipient_email, recipient_name, alert, user_name);
        self.send(message).await
    }

    /// Console provider - logs email to console.
    async fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            to_name = ?message.to_name,
            subject = %message.subject,
            from = %self.config.sender_email,
            from_name = %self.config.sender_name,
            "Email (console provider)"
        );

        debug!(body_text = %message.body_text, "Email body (plain text)");

        if let Some(html) = &message.body_html {
            debug!(body_html_length = html.len(), "Email body (HTML)");
        }

        Ok(())
    }

    /// SendGrid provider - sends via SendGrid API.
    async fn send_sendgrid(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let mut personalizations = serde_json::json!({
            "to": [{
                "email": message.to
            }]
        });

        if let Some(name) = &message.to_name {
            personalizations["to"][0]["name"] = serde_json::json!(name);
        }

        let mut content = vec![serde_json::json!({
            "type": "text/plain",
            "value": message.body_text
        })];
        if let Some(html) = &message.body_html {
            content.push(serde_json::json!({
                "type": "text/html",
                "value": html
            }));
        }

        let body = serde_json::json!({
            "personalizations": [personalizations],
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name
            },
            "subject": message.subject,
            "content": content
        });

        let url = format!(
            "{}/v3/mail/send",
            self.config.sendgrid_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(
                to = %message.to,
                subject = %message.subject,
                "Email sent via SendGrid"
            );
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                error = %error_body,
                "SendGrid API error"
            );
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}

#[async_trait::async_trait]
impl AlertNotifier for EmailService {
    async fn send_alert_email(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        alert: &AlertSnapshot,
        user_name: &str,
    ) -> Result<(), NotificationError> {
        EmailService::send_alert_email(self, recipient_email, recipient_name, alert, user_name)
            .await
            .map_err(NotificationError::from)
    }
}
