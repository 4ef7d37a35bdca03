//! Analysis orchestrator.
//!
//! Turns one model answer into a classification and a list of detected
//! objects, persists an alert when the classification calls for one and fans
//! out notifications.

use std::fmt;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dispatcher::{DispatchReport, NotificationDispatcher};
use super::notification::AlertNotifier;
use super::store::{AlertStore, SubscriptionDirectory};
use crate::detection::{classify, Classification, ObjectExtractor, RuleTable};
use crate::error::AnalysisError;
use crate::models::{DetectedObject, NewAlert, UserRef};

/// Pipeline stage, for log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Received,
    Classified,
    Persisted,
    Dispatched,
    Completed,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisStage::Received => "received",
            AnalysisStage::Classified => "classified",
            AnalysisStage::Persisted => "persisted",
            AnalysisStage::Dispatched => "dispatched",
            AnalysisStage::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Result of analysing one model answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub classification: Classification,
    pub detected_objects: Vec<DetectedObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchReport>,
}

/// Runs the detection pipeline against the configured ports.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    rules: Arc<RuleTable>,
    extractor: Arc<ObjectExtractor>,
    alerts: Arc<dyn AlertStore>,
    dispatcher: NotificationDispatcher,
}

impl AnalysisOrchestrator {
    pub fn new(
        rules: Arc<RuleTable>,
        extractor: Arc<ObjectExtractor>,
        alerts: Arc<dyn AlertStore>,
        subscriptions: Arc<dyn SubscriptionDirectory>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        let dispatcher =
            NotificationDispatcher::new(notifier, Arc::clone(&alerts), subscriptions);
        Self {
            rules,
            extractor,
            alerts,
            dispatcher,
        }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Analyses `text` on behalf of `user`.
    ///
    /// Only a failure to save the alert is returned as an error. Subscription
    /// lookup and email failures are logged and reflected in the outcome.
    pub async fn analyze(
        &self,
        user: &UserRef,
        text: &str,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        debug!(
            user_id = %user.id,
            stage = %AnalysisStage::Received,
            text = %shared::text::truncate_for_log(text, 120),
            "Analysing model response"
        );

        let classification = classify(text, &self.rules);
        let detected_objects = self.extractor.extract(text);
        counter!(
            "alerts_classified_total",
            "severity" => classification.severity.as_str()
        )
        .increment(1);
        debug!(
            user_id = %user.id,
            stage = %AnalysisStage::Classified,
            detected = classification.detected,
            severity = %classification.severity,
            objects = detected_objects.len(),
            "Response classified"
        );

        if !classification.should_persist() {
            debug!(user_id = %user.id, stage = %AnalysisStage::Completed, "No alert raised");
            return Ok(AnalysisOutcome {
                classification,
                detected_objects,
                alert_id: None,
                dispatch: None,
            });
        }

        let new_alert = NewAlert {
            user_id: user.id,
            alert_type: classification.alert_type,
            severity: classification.severity,
            description: text.to_string(),
            model_response: Some(text.to_string()),
            detected_objects: detected_objects.clone(),
        };

        let alert = match self.alerts.save(new_alert).await {
            Ok(alert) => alert,
            Err(source) => {
                return Err(AnalysisError::Persistence {
                    source,
                    classification: Box::new(classification),
                    detected_objects,
                })
            }
        };

        counter!("alerts_created_total", "severity" => alert.severity.as_str()).increment(1);
        info!(
            user_id = %user.id,
            alert_id = %alert.alert_id,
            severity = %alert.severity,
            alert_type = %alert.alert_type,
            stage = %AnalysisStage::Persisted,
            "Alert created"
        );

        // Detached: dropping this future does not cancel the dispatch
        let alert_id = alert.alert_id;
        let dispatch = if classification.should_notify() {
            match self
                .dispatcher
                .spawn_notify(classification.clone(), user.clone(), alert)
                .await
            {
                Ok(report) => {
                    debug!(
                        alert_id = %alert_id,
                        stage = %AnalysisStage::Dispatched,
                        "Notifications dispatched"
                    );
                    report
                }
                Err(e) => {
                    warn!(alert_id = %alert_id, error = %e, "Notification task failed");
                    None
                }
            }
        } else {
            None
        };

        debug!(alert_id = %alert_id, stage = %AnalysisStage::Completed, "Analysis complete");

        Ok(AnalysisOutcome {
            classification,
            detected_objects,
            alert_id: Some(alert_id),
            dispatch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AlertType, AlertTypeFilter, ObjectCategory, Recipient, Severity, Subscription,
    };
    use crate::services::notification::MockAlertNotifier;
    use crate::services::store::{InMemoryAlertStore, InMemorySubscriptionDirectory};
    use chrono::Utc;
    use std::time::Duration;

    struct Harness {
        orchestrator: AnalysisOrchestrator,
        store: InMemoryAlertStore,
        directory: InMemorySubscriptionDirectory,
        notifier: MockAlertNotifier,
        user: UserRef,
    }

    fn harness() -> Harness {
        let store = InMemoryAlertStore::new();
        let directory = InMemorySubscriptionDirectory::new();
        let notifier = MockAlertNotifier::new();
        let orchestrator = AnalysisOrchestrator::new(
            Arc::new(RuleTable::standard()),
            Arc::new(ObjectExtractor::standard().unwrap()),
            Arc::new(store.clone()),
            Arc::new(directory.clone()),
            Arc::new(notifier.clone()),
        );
        Harness {
            orchestrator,
            store,
            directory,
            notifier,
            user: UserRef::new(Uuid::new_v4(), Some("Ravi")),
        }
    }

    fn subscription(user_id: Uuid, email: &str) -> Subscription {
        Subscription {
            id: 1,
            subscription_id: Uuid::new_v4(),
            relative_id: Uuid::new_v4(),
            user_id,
            alert_types: vec![AlertTypeFilter::All],
            is_active: true,
            recipient: Recipient {
                name: Some("Asha".to_string()),
                email: Some(email.to_string()),
            },
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_critical_response_creates_alert_and_notifies() {
        let h = harness();
        h.directory
            .insert(subscription(h.user.id, "asha@example.com"))
            .await;

        let text = "Danger! A car is 5 meters ahead, watch out for the curb.";
        let outcome = h.orchestrator.analyze(&h.user, text).await.unwrap();

        assert_eq!(outcome.classification.severity, Severity::Critical);
        assert_eq!(outcome.classification.alert_type, AlertType::LifeThreat);
        assert!(outcome
            .detected_objects
            .iter()
            .any(|o| o.category == ObjectCategory::Vehicle && o.distance == "5 meters"));

        let alert_id = outcome.alert_id.unwrap();
        let stored = h.store.find(alert_id).await.unwrap();
        assert_eq!(stored.description, text);
        assert_eq!(stored.user_id, h.user.id);
        assert_eq!(stored.detected_objects, outcome.detected_objects);
        assert_eq!(stored.notifications.len(), 1);

        assert_eq!(outcome.dispatch.unwrap().sent, 1);
        let sent = h.notifier.sent();
        assert_eq!(sent[0].alert.alert_id, alert_id);
        assert_eq!(sent[0].recipient_name, "Asha");
    }

    #[tokio::test]
    async fn test_quiet_response_creates_nothing() {
        let h = harness();
        let outcome = h
            .orchestrator
            .analyze(&h.user, "You are in a quiet, open room with a table nearby.")
            .await
            .unwrap();

        assert!(!outcome.classification.detected);
        assert!(outcome.alert_id.is_none());
        assert!(outcome.dispatch.is_none());
        assert_eq!(outcome.detected_objects.len(), 1);
        assert!(h.store.alerts().await.is_empty());
    }

    #[tokio::test]
    async fn test_medium_response_persists_without_dispatch() {
        let h = harness();
        h.directory
            .insert(subscription(h.user.id, "asha@example.com"))
            .await;

        let outcome = h
            .orchestrator
            .analyze(&h.user, "There is a wall to your right.")
            .await
            .unwrap();

        assert!(outcome.alert_id.is_some());
        assert!(outcome.dispatch.is_none());
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_carries_results() {
        let h = harness();
        h.store.fail_saves(true);

        let err = h
            .orchestrator
            .analyze(&h.user, "Smoke near the stairs")
            .await
            .unwrap_err();

        match err {
            AnalysisError::Persistence {
                classification,
                detected_objects,
                ..
            } => {
                assert_eq!(classification.severity, Severity::Critical);
                assert!(detected_objects
                    .iter()
                    .any(|o| o.category == ObjectCategory::Stairs));
            }
        }
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_subscription_lookup_failure_is_not_fatal() {
        let h = harness();
        h.directory.fail_lookups(true);

        let outcome = h.orchestrator.analyze(&h.user, "Fire!").await.unwrap();

        assert!(outcome.alert_id.is_some());
        assert!(outcome.dispatch.is_none());
    }

    #[tokio::test]
    async fn test_email_failures_do_not_fail_analysis() {
        let store = InMemoryAlertStore::new();
        let directory = InMemorySubscriptionDirectory::new();
        let user = UserRef::new(Uuid::new_v4(), None);
        directory.insert(subscription(user.id, "a@example.com")).await;
        let orchestrator = AnalysisOrchestrator::new(
            Arc::new(RuleTable::standard()),
            Arc::new(ObjectExtractor::standard().unwrap()),
            Arc::new(store.clone()),
            Arc::new(directory),
            Arc::new(MockAlertNotifier::failing()),
        );

        let outcome = orchestrator.analyze(&user, "Collision risk").await.unwrap();
        let report = outcome.dispatch.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 0);

        let stored = store.find(outcome.alert_id.unwrap()).await.unwrap();
        assert!(stored.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_analysis_still_delivers_email() {
        let store = InMemoryAlertStore::new();
        let directory = InMemorySubscriptionDirectory::new();
        let notifier = MockAlertNotifier::new().with_delay(Duration::from_millis(100));
        let user = UserRef::new(Uuid::new_v4(), Some("Ravi"));
        directory.insert(subscription(user.id, "asha@example.com")).await;
        let orchestrator = AnalysisOrchestrator::new(
            Arc::new(RuleTable::standard()),
            Arc::new(ObjectExtractor::standard().unwrap()),
            Arc::new(store.clone()),
            Arc::new(directory),
            Arc::new(notifier.clone()),
        );

        let cut_short = tokio::time::timeout(
            Duration::from_millis(30),
            orchestrator.analyze(&user, "Danger, fire ahead"),
        )
        .await;
        assert!(cut_short.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;

        let alerts = store.alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(alerts[0].notifications.len(), 1);
    }

    #[test]
    fn test_outcome_serialization_omits_absent_alert() {
        let outcome = AnalysisOutcome {
            classification: Classification::not_detected(),
            detected_objects: vec![],
            alert_id: None,
            dispatch: None,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("alertId").is_none());
        assert_eq!(json["classification"]["severity"], "low");
    }
}
