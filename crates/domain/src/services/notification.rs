//! Notification port for alert emails.
//!
//! Provides the abstraction the dispatcher uses to reach a relative, plus a
//! mock implementation for development and tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::NotificationError;
use crate::models::AlertSnapshot;

/// Sends an alert email to one recipient.
#[async_trait::async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Deliver the alert to `recipient_email` on behalf of `user_name`.
    async fn send_alert_email(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        alert: &AlertSnapshot,
        user_name: &str,
    ) -> Result<(), NotificationError>;
}

/// An email the mock notifier accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct SentAlertEmail {
    pub recipient_email: String,
    pub recipient_name: String,
    pub user_name: String,
    pub alert: AlertSnapshot,
}

/// Mock notifier for development and testing.
///
/// Logs and records every accepted email instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct MockAlertNotifier {
    /// Fail every send.
    pub simulate_failure: bool,
    /// Fail sends to these addresses only.
    failing_recipients: HashSet<String>,
    /// Latency added to every send.
    delay: Option<Duration>,
    sent: Arc<Mutex<Vec<SentAlertEmail>>>,
}

impl MockAlertNotifier {
    /// Create a mock that accepts every email.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that rejects every email.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Create a mock that rejects the listed addresses and accepts the rest.
    pub fn failing_for<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing_recipients: recipients.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Adds `delay` before every send completes.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Emails accepted so far, in completion order.
    pub fn sent(&self) -> Vec<SentAlertEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl AlertNotifier for MockAlertNotifier {
    async fn send_alert_email(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        alert: &AlertSnapshot,
        user_name: &str,
    ) -> Result<(), NotificationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.simulate_failure || self.failing_recipients.contains(recipient_email) {
            tracing::warn!(
                recipient = %recipient_email,
                alert_id = %alert.alert_id,
                "Mock notifier simulating failure"
            );
            return Err(NotificationError::DeliveryFailed(
                "Simulated failure".to_string(),
            ));
        }

        tracing::info!(
            recipient = %recipient_email,
            alert_id = %alert.alert_id,
            severity = %alert.severity,
            user = %user_name,
            "Mock: Would send alert email"
        );

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentAlertEmail {
                recipient_email: recipient_email.to_string(),
                recipient_name: recipient_name.to_string(),
                user_name: user_name.to_string(),
                alert: alert.clone(),
            });
        }

        Ok(())
    }
}
