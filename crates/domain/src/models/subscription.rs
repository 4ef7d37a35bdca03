//! Relative subscriptions to a user's alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::alert::AlertType;

/// Alert types a subscription wants to receive.
///
/// Stored and serialized as the plain alert-type string, or `"all"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AlertTypeFilter {
    All,
    Only(AlertType),
}

impl AlertTypeFilter {
    pub const WILDCARD: &'static str = "all";

    pub fn matches(&self, alert_type: AlertType) -> bool {
        match self {
            AlertTypeFilter::All => true,
            AlertTypeFilter::Only(t) => *t == alert_type,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertTypeFilter::All => Self::WILDCARD,
            AlertTypeFilter::Only(t) => t.as_str(),
        }
    }
}

impl FromStr for AlertTypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(Self::WILDCARD) {
            return Ok(AlertTypeFilter::All);
        }
        s.parse::<AlertType>().map(AlertTypeFilter::Only)
    }
}

impl TryFrom<String> for AlertTypeFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AlertTypeFilter> for String {
    fn from(filter: AlertTypeFilter) -> Self {
        filter.as_str().to_string()
    }
}

impl fmt::Display for AlertTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact details of the relative receiving notifications.
///
/// Both fields come from the user directory and may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// A relative's subscription to one user's alerts.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: i64,
    pub subscription_id: Uuid,
    pub relative_id: Uuid,
    pub user_id: Uuid,
    pub alert_types: Vec<AlertTypeFilter>,
    pub is_active: bool,
    pub recipient: Recipient,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// True when the subscription is active and wants alerts of this type.
    pub fn covers(&self, alert_type: AlertType) -> bool {
        self.is_active && self.alert_types.iter().any(|f| f.matches(alert_type))
    }

    /// Recipient email, if one is set and not blank.
    ///
    /// Format is left to the mail provider; any non-blank address is tried.
    pub fn resolvable_email(&self) -> Option<&str> {
        self.recipient
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    /// Name used to greet the recipient.
    pub fn recipient_name(&self) -> &str {
        self.recipient
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("there")
    }
}

fn validate_alert_type_filters(filters: &[AlertTypeFilter]) -> Result<(), ValidationError> {
    if filters.len() > 6 {
        let mut err = ValidationError::new("alert_types_length");
        err.message = Some("At most 6 alert types may be listed".into());
        return Err(err);
    }
    Ok(())
}

/// Request payload for subscribing to a user's alerts.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub user_id: Uuid,

    #[serde(default)]
    #[validate(custom(function = "validate_alert_type_filters"))]
    pub alert_types: Vec<AlertTypeFilter>,
}

impl CreateSubscriptionRequest {
    /// Requested types with duplicates removed; empty means everything.
    pub fn normalized_alert_types(&self) -> Vec<AlertTypeFilter> {
        normalize_filters(&self.alert_types)
    }
}

/// Request payload for updating a subscription (partial update).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    #[validate(custom(function = "validate_alert_type_filters"))]
    pub alert_types: Option<Vec<AlertTypeFilter>>,

    pub is_active: Option<bool>,
}

impl UpdateSubscriptionRequest {
    pub fn normalized_alert_types(&self) -> Option<Vec<AlertTypeFilter>> {
        self.alert_types.as_deref().map(normalize_filters)
    }
}

fn normalize_filters(filters: &[AlertTypeFilter]) -> Vec<AlertTypeFilter> {
    if filters.is_empty() || filters.contains(&AlertTypeFilter::All) {
        return vec![AlertTypeFilter::All];
    }
    let mut out: Vec<AlertTypeFilter> = Vec::with_capacity(filters.len());
    for f in filters {
        if !out.contains(f) {
            out.push(*f);
        }
    }
    out
}

/// Response payload for subscription operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub subscription_id: Uuid,
    pub relative_id: Uuid,
    pub user_id: Uuid,
    pub alert_types: Vec<AlertTypeFilter>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(s: Subscription) -> Self {
        Self {
            subscription_id: s.subscription_id,
            relative_id: s.relative_id,
            user_id: s.user_id,
            alert_types: s.alert_types,
            is_active: s.is_active,
            created_at: s.created_at,
        }
    }
}

/// Response for listing subscriptions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSubscriptionsResponse {
    pub subscriptions: Vec<SubscriptionResponse>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(types: Vec<AlertTypeFilter>, active: bool, email: Option<&str>) -> Subscription {
        Subscription {
            id: 1,
            subscription_id: Uuid::new_v4(),
            relative_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            alert_types: types,
            is_active: active,
            recipient: Recipient {
                name: Some("Asha".to_string()),
                email: email.map(str::to_string),
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_filter_parses_wildcard_and_types() {
        assert_eq!("all".parse::<AlertTypeFilter>().unwrap(), AlertTypeFilter::All);
        assert_eq!(
            "life-threat".parse::<AlertTypeFilter>().unwrap(),
            AlertTypeFilter::Only(AlertType::LifeThreat)
        );
        assert!("everything".parse::<AlertTypeFilter>().is_err());
    }

    #[test]
    fn test_filter_serde_uses_plain_strings() {
        let filters = vec![AlertTypeFilter::All, AlertTypeFilter::Only(AlertType::CloseCall)];
        let json = serde_json::to_string(&filters).unwrap();
        assert_eq!(json, r#"["all","close-call"]"#);

        let parsed: Vec<AlertTypeFilter> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, filters);
        assert!(serde_json::from_str::<AlertTypeFilter>("\"nope\"").is_err());
    }

    #[test]
    fn test_covers_requires_active_and_matching_type() {
        let specific = subscription(
            vec![AlertTypeFilter::Only(AlertType::LifeThreat)],
            true,
            Some("a@example.com"),
        );
        assert!(specific.covers(AlertType::LifeThreat));
        assert!(!specific.covers(AlertType::CloseCall));

        let wildcard = subscription(vec![AlertTypeFilter::All], true, None);
        assert!(wildcard.covers(AlertType::Warning));

        let inactive = subscription(vec![AlertTypeFilter::All], false, None);
        assert!(!inactive.covers(AlertType::LifeThreat));
    }

    #[test]
    fn test_resolvable_email() {
        assert_eq!(
            subscription(vec![], true, Some(" a@example.com ")).resolvable_email(),
            Some("a@example.com")
        );
        assert_eq!(
            subscription(vec![], true, Some("mum@localhost")).resolvable_email(),
            Some("mum@localhost")
        );
        assert_eq!(subscription(vec![], true, Some("")).resolvable_email(), None);
        assert_eq!(subscription(vec![], true, Some("  \t")).resolvable_email(), None);
        assert_eq!(subscription(vec![], true, None).resolvable_email(), None);
    }

    #[test]
    fn test_recipient_name_falls_back() {
        let mut sub = subscription(vec![], true, None);
        assert_eq!(sub.recipient_name(), "Asha");
        sub.recipient.name = Some("  ".to_string());
        assert_eq!(sub.recipient_name(), "there");
    }

    #[test]
    fn test_create_request_defaults_to_all() {
        let json = r#"{"userId": "550e8400-e29b-41d4-a716-446655440000"}"#;
        let request: CreateSubscriptionRequest = serde_json::from_str(json).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.normalized_alert_types(), vec![AlertTypeFilter::All]);
    }

    #[test]
    fn test_create_request_dedupes_types() {
        let json = r#"{
            "userId": "550e8400-e29b-41d4-a716-446655440000",
            "alertTypes": ["close-call", "life-threat", "close-call"]
        }"#;
        let request: CreateSubscriptionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            request.normalized_alert_types(),
            vec![
                AlertTypeFilter::Only(AlertType::CloseCall),
                AlertTypeFilter::Only(AlertType::LifeThreat)
            ]
        );
    }

    #[test]
    fn test_update_request_partial() {
        let request: UpdateSubscriptionRequest =
            serde_json::from_str(r#"{"isActive": false}"#).unwrap();
        assert_eq!(request.is_active, Some(false));
        assert!(request.normalized_alert_types().is_none());
    }
}
