//! Alert database entities.

use chrono::{DateTime, Utc};
use domain::models::{
    Alert, AlertType, DeliveryStatus, DetectedObject, NotificationRecord, Severity,
};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the alerts table.
#[derive(Debug, Clone, FromRow)]
pub struct AlertEntity {
    pub id: i64,
    pub alert_id: Uuid,
    pub user_id: Uuid,
    pub alert_type: String,
    pub severity: String,
    pub description: String,
    pub model_response: Option<String>,
    pub detected_objects: serde_json::Value,
    pub acknowledged: bool,
    pub acknowledged_by: Option<Uuid>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AlertEntity {
    /// Converts to the domain model with the given notification log.
    pub fn into_domain(self, notifications: Vec<NotificationRecord>) -> Alert {
        let detected_objects: Vec<DetectedObject> =
            serde_json::from_value(self.detected_objects).unwrap_or_default();

        Alert {
            id: self.id,
            alert_id: self.alert_id,
            user_id: self.user_id,
            alert_type: self.alert_type.parse().unwrap_or(AlertType::Info),
            severity: self.severity.parse().unwrap_or(Severity::Low),
            description: self.description,
            model_response: self.model_response,
            detected_objects,
            acknowledged: self.acknowledged,
            acknowledged_by: self.acknowledged_by,
            acknowledged_at: self.acknowledged_at,
            notifications,
            created_at: self.created_at,
        }
    }
}

/// Database row mapping for the alert_notifications table.
#[derive(Debug, Clone, FromRow)]
pub struct AlertNotificationEntity {
    pub id: i64,
    pub alert_id: i64,
    pub recipient_email: String,
    pub status: String,
    pub sent_at: DateTime<Utc>,
}

impl From<AlertNotificationEntity> for NotificationRecord {
    fn from(entity: AlertNotificationEntity) -> Self {
        Self {
            recipient_email: entity.recipient_email,
            sent_at: entity.sent_at,
            status: entity.status.parse().unwrap_or(DeliveryStatus::Sent),
        }
    }
}

/// Per-severity alert counts for one user.
#[derive(Debug, Clone, FromRow)]
pub struct SeverityCountEntity {
    pub severity: String,
    pub total: i64,
    pub unacknowledged: i64,
}
