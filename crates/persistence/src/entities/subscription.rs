//! Subscription database entity.

use chrono::{DateTime, Utc};
use domain::models::{AlertTypeFilter, Recipient, Subscription};
use sqlx::FromRow;
use uuid::Uuid;

/// Subscription row joined with the relative's name and email from users.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionEntity {
    pub id: i64,
    pub subscription_id: Uuid,
    pub relative_id: Uuid,
    pub user_id: Uuid,
    pub alert_types: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
}

impl From<SubscriptionEntity> for Subscription {
    fn from(entity: SubscriptionEntity) -> Self {
        // Unknown stored values are dropped; an empty list means everything.
        let mut alert_types: Vec<AlertTypeFilter> = entity
            .alert_types
            .iter()
            .filter_map(|t| t.parse().ok())
            .collect();
        if alert_types.is_empty() {
            alert_types.push(AlertTypeFilter::All);
        }

        Self {
            id: entity.id,
            subscription_id: entity.subscription_id,
            relative_id: entity.relative_id,
            user_id: entity.user_id,
            alert_types,
            is_active: entity.is_active,
            recipient: Recipient {
                name: entity.recipient_name,
                email: entity.recipient_email,
            },
            created_at: entity.created_at,
        }
    }
}

/// Converts filters to their stored string form.
pub fn alert_types_to_db(filters: &[AlertTypeFilter]) -> Vec<String> {
    filters.iter().map(|f| f.as_str().to_string()).collect()
}
