//! Alert email fan-out.
//!
//! Sends one email per eligible subscription, concurrently, and writes a
//! delivery record for each successful send. Failed sends are logged and
//! otherwise dropped: there is no retry and no failure log.
//!
//! [`NotificationDispatcher::spawn_notify`] runs the lookup and fan-out on a
//! task of its own, so an alert that was saved is always dispatched even when
//! the request that raised it is cancelled.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::notification::AlertNotifier;
use super::store::{AlertStore, SubscriptionDirectory};
use crate::detection::Classification;
use crate::models::{Alert, AlertSnapshot, NotificationRecord, Subscription, UserRef};

/// Counts from one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped_without_email: usize,
}

/// Sends alert emails to subscribed relatives.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn AlertNotifier>,
    store: Arc<dyn AlertStore>,
    subscriptions: Arc<dyn SubscriptionDirectory>,
}

impl NotificationDispatcher {
    pub fn new(
        notifier: Arc<dyn AlertNotifier>,
        store: Arc<dyn AlertStore>,
        subscriptions: Arc<dyn SubscriptionDirectory>,
    ) -> Self {
        Self {
            notifier,
            store,
            subscriptions,
        }
    }

    /// Runs [`notify`](Self::notify) on a detached task.
    ///
    /// The task owns its inputs. Dropping the handle does not cancel it.
    pub fn spawn_notify(
        &self,
        classification: Classification,
        user: UserRef,
        alert: Alert,
    ) -> JoinHandle<Option<DispatchReport>> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.notify(&classification, &user, &alert).await })
    }

    /// Looks up the user's active subscriptions and dispatches to them.
    ///
    /// Returns `None` when the lookup fails; that failure is logged only.
    pub async fn notify(
        &self,
        classification: &Classification,
        user: &UserRef,
        alert: &Alert,
    ) -> Option<DispatchReport> {
        match self
            .subscriptions
            .find_active_subscriptions(user.id, alert.alert_type)
            .await
        {
            Ok(subscriptions) => Some(
                self.dispatch(classification, user, alert, &subscriptions)
                    .await,
            ),
            Err(e) => {
                warn!(
                    alert_id = %alert.alert_id,
                    error = %e,
                    "Failed to look up subscriptions, skipping notifications"
                );
                None
            }
        }
    }

    /// Notifies every active subscription that covers the alert's type.
    ///
    /// Does nothing unless the classification asks for email. The returned
    /// report is informational; delivery failures never surface as errors.
    pub async fn dispatch(
        &self,
        classification: &Classification,
        user: &UserRef,
        alert: &Alert,
        subscriptions: &[Subscription],
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        if !classification.should_notify() {
            debug!(alert_id = %alert.alert_id, "Classification does not request email");
            return report;
        }

        let snapshot = Arc::new(AlertSnapshot::from(alert));
        let user_name: Arc<str> = Arc::from(user.display_name.as_str());
        let mut sends = JoinSet::new();

        for subscription in subscriptions
            .iter()
            .filter(|s| s.covers(alert.alert_type))
        {
            let Some(email) = subscription.resolvable_email() else {
                debug!(
                    subscription_id = %subscription.subscription_id,
                    "Subscription has no recipient email, skipping"
                );
                report.skipped_without_email += 1;
                continue;
            };

            report.attempted += 1;
            let notifier = Arc::clone(&self.notifier);
            let snapshot = Arc::clone(&snapshot);
            let user_name = Arc::clone(&user_name);
            let email = email.to_string();
            let name = subscription.recipient_name().to_string();

            sends.spawn(async move {
                let result = notifier
                    .send_alert_email(&email, &name, &snapshot, &user_name)
                    .await;
                (email, result)
            });
        }

        let mut records = Vec::with_capacity(report.attempted);
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((email, Ok(()))) => {
                    counter!("alert_emails_total", "status" => "sent").increment(1);
                    records.push(NotificationRecord::sent(email, Utc::now()));
                }
                Ok((email, Err(e))) => {
                    counter!("alert_emails_total", "status" => "failed").increment(1);
                    warn!(
                        alert_id = %alert.alert_id,
                        recipient = %email,
                        error = %e,
                        "Failed to send alert email"
                    );
                    report.failed += 1;
                }
                Err(e) => {
                    counter!("alert_emails_total", "status" => "failed").increment(1);
                    warn!(alert_id = %alert.alert_id, error = %e, "Alert email task aborted");
                    report.failed += 1;
                }
            }
        }
        report.sent = records.len();

        if !records.is_empty() {
            if let Err(e) = self
                .store
                .record_notifications(alert.alert_id, &records)
                .await
            {
                warn!(
                    alert_id = %alert.alert_id,
                    error = %e,
                    "Failed to record alert notifications"
                );
            }
        }

        info!(
            alert_id = %alert.alert_id,
            attempted = report.attempted,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped_without_email,
            "Alert dispatch complete"
        );

        report
    }
}
