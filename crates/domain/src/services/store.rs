//! Storage ports used by the analysis pipeline.
//!
//! The Postgres repositories implement these traits; the in-memory versions
//! back unit tests and local runs without a database.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Alert, AlertType, NewAlert, NotificationRecord, Subscription};

/// Persists alerts and their notification logs.
#[async_trait::async_trait]
pub trait AlertStore: Send + Sync {
    /// Saves a new alert and returns it with its assigned ids and timestamp.
    async fn save(&self, alert: NewAlert) -> Result<Alert, StoreError>;

    /// Appends entries to an alert's notification log.
    async fn record_notifications(
        &self,
        alert_id: Uuid,
        records: &[NotificationRecord],
    ) -> Result<(), StoreError>;
}

/// Looks up relatives subscribed to a user's alerts.
#[async_trait::async_trait]
pub trait SubscriptionDirectory: Send + Sync {
    /// Active subscriptions to `user_id` whose filter accepts `alert_type`.
    async fn find_active_subscriptions(
        &self,
        user_id: Uuid,
        alert_type: AlertType,
    ) -> Result<Vec<Subscription>, StoreError>;
}

/// Alert store kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAlertStore {
    alerts: Arc<RwLock<Vec<Alert>>>,
    next_id: Arc<AtomicI64>,
    fail_saves: Arc<AtomicBool>,
    fail_records: Arc<AtomicBool>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `save` fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `record_notifications` fail.
    pub fn fail_records(&self, fail: bool) {
        self.fail_records.store(fail, Ordering::SeqCst);
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.alerts.read().await.clone()
    }

    pub async fn find(&self, alert_id: Uuid) -> Option<Alert> {
        self.alerts
            .read()
            .await
            .iter()
            .find(|a| a.alert_id == alert_id)
            .cloned()
    }
}

#[async_trait::async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn save(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated save failure".to_string()));
        }

        let saved = Alert {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            alert_id: Uuid::new_v4(),
            user_id: alert.user_id,
            alert_type: alert.alert_type,
            severity: alert.severity,
            description: alert.description,
            model_response: alert.model_response,
            detected_objects: alert.detected_objects,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            notifications: Vec::new(),
            created_at: Utc::now(),
        };
        self.alerts.write().await.push(saved.clone());
        Ok(saved)
    }

    async fn record_notifications(
        &self,
        alert_id: Uuid,
        records: &[NotificationRecord],
    ) -> Result<(), StoreError> {
        if self.fail_records.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(
                "simulated notification log failure".to_string(),
            ));
        }

        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .iter_mut()
            .find(|a| a.alert_id == alert_id)
            .ok_or_else(|| StoreError::NotFound(format!("alert {}", alert_id)))?;
        alert.notifications.extend_from_slice(records);
        Ok(())
    }
}

/// Subscription directory kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionDirectory {
    subscriptions: Arc<RwLock<Vec<Subscription>>>,
    fail_lookups: Arc<AtomicBool>,
}

impl InMemorySubscriptionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        Self {
            subscriptions: Arc::new(RwLock::new(subscriptions)),
            ..Self::default()
        }
    }

    pub async fn insert(&self, subscription: Subscription) {
        self.subscriptions.write().await.push(subscription);
    }

    /// Makes every subsequent lookup fail.
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl SubscriptionDirectory for InMemorySubscriptionDirectory {
    async fn find_active_subscriptions(
        &self,
        user_id: Uuid,
        alert_type: AlertType,
    ) -> Result<Vec<Subscription>, StoreError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated lookup failure".to_string()));
        }

        Ok(self
            .subscriptions
            .read()
            .await
            .iter()
            .filter(|s| s.user_id == user_id && s.covers(alert_type))
            .cloned()
            .collect())
    }
}
