//! Safety alert domain models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::detected_object::DetectedObject;

/// Alert severity, ascending.
///
/// `Low` is never produced by a firing rule tier in the default table; it marks
/// "nothing detected" and alerts are not persisted at that level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Selection rank between firing tiers. Lower wins.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    /// Whether an alert of this severity is persisted.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Severity::Low)
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of alert, as shown to the user and used for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertType {
    LifeThreat,
    CloseCall,
    Warning,
    Obstacle,
    Info,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LifeThreat => "life-threat",
            AlertType::CloseCall => "close-call",
            AlertType::Warning => "warning",
            AlertType::Obstacle => "obstacle",
            AlertType::Info => "info",
        }
    }
}

impl FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "life-threat" => Ok(AlertType::LifeThreat),
            "close-call" => Ok(AlertType::CloseCall),
            "warning" => Ok(AlertType::Warning),
            "obstacle" => Ok(AlertType::Obstacle),
            "info" => Ok(AlertType::Info),
            _ => Err(format!("Unknown alert type: {}", s)),
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one notification attempt. Only successful sends are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sent" => Ok(DeliveryStatus::Sent),
            _ => Err(format!("Unknown delivery status: {}", s)),
        }
    }
}

/// Entry in an alert's notification log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub recipient_email: String,
    pub sent_at: DateTime<Utc>,
    pub status: DeliveryStatus,
}

impl NotificationRecord {
    pub fn sent(recipient_email: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self {
            recipient_email: recipient_email.into(),
            sent_at,
            status: DeliveryStatus::Sent,
        }
    }
}

/// Persisted safety alert.
#[derive(Debug, Clone)]
pub struct Alert {
    pub id: i64,
    pub alert_id: Uuid,
    pub user_id: Uuid,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub description: String,
    pub model_response: Option<String>,
    pub detected_objects: Vec<DetectedObject>,
    pub acknowledged: bool,
    pub acknowledged_by: Option<Uuid>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub notifications: Vec<NotificationRecord>,
    pub created_at: DateTime<Utc>,
}

/// Data needed to create an alert. Acknowledgment and the log start empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub user_id: Uuid,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub description: String,
    pub model_response: Option<String>,
    pub detected_objects: Vec<DetectedObject>,
}

/// Read-only view of an alert handed to the email collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSnapshot {
    pub alert_id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub description: String,
    pub detected_objects: Vec<DetectedObject>,
    pub created_at: DateTime<Utc>,
}

impl From<&Alert> for AlertSnapshot {
    fn from(alert: &Alert) -> Self {
        Self {
            alert_id: alert.alert_id,
            alert_type: alert.alert_type,
            severity: alert.severity,
            description: alert.description.clone(),
            detected_objects: alert.detected_objects.clone(),
            created_at: alert.created_at,
        }
    }
}

/// Alert as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    pub alert_id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub description: String,
    pub detected_objects: Vec<DetectedObject>,
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub emails_sent: Vec<NotificationRecord>,
    pub created_at: DateTime<Utc>,
}

impl From<Alert> for AlertResponse {
    fn from(a: Alert) -> Self {
        Self {
            alert_id: a.alert_id,
            user_id: a.user_id,
            alert_type: a.alert_type,
            severity: a.severity,
            description: a.description,
            detected_objects: a.detected_objects,
            acknowledged: a.acknowledged,
            acknowledged_by: a.acknowledged_by,
            acknowledged_at: a.acknowledged_at,
            emails_sent: a.notifications,
            created_at: a.created_at,
        }
    }
}

/// Query parameters for listing alerts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAlertsQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    pub severity: Option<Severity>,
    pub acknowledged: Option<bool>,
    #[serde(rename = "type")]
    pub alert_type: Option<AlertType>,
}

/// Response for listing alerts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAlertsResponse {
    pub alerts: Vec<AlertResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Per-user alert statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
    pub total: i64,
    pub unacknowledged: i64,
    pub by_severity: BTreeMap<String, i64>,
}
