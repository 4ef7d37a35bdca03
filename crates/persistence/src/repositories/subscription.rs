//! Subscription repository implementation.

use domain::error::StoreError;
use domain::models::{AlertType, AlertTypeFilter, Subscription};
use domain::services::SubscriptionDirectory;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::subscription::alert_types_to_db;
use crate::entities::SubscriptionEntity;
use crate::metrics::QueryTimer;
use crate::repositories::to_store_error;

/// Columns selected for every subscription read, with the relative's contact
/// details joined from users.
const SELECT_COLUMNS: &str = r#"
    s.id, s.subscription_id, s.relative_id, s.user_id, s.alert_types, s.is_active,
    s.created_at, s.updated_at,
    u.display_name AS recipient_name,
    u.email AS recipient_email
"#;

/// Repository for subscription database operations.
#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    /// Creates a new subscription repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Subscribes `relative_id` to `user_id`'s alerts.
    ///
    /// Fails with a unique violation when the pair already exists.
    pub async fn create(
        &self,
        relative_id: Uuid,
        user_id: Uuid,
        alert_types: &[AlertTypeFilter],
    ) -> Result<SubscriptionEntity, sqlx::Error> {
        let timer = QueryTimer::start("create_subscription");
        let sql = format!(
            r#"
            WITH s AS (
                INSERT INTO subscriptions (relative_id, user_id, alert_types)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT {SELECT_COLUMNS}
            FROM s
            LEFT JOIN users u ON u.id = s.relative_id
            "#
        );
        let result = sqlx::query_as::<_, SubscriptionEntity>(&sql)
            .bind(relative_id)
            .bind(user_id)
            .bind(alert_types_to_db(alert_types))
            .fetch_one(&self.pool)
            .await;
        timer.finish(&result);
        result
    }

    /// Finds a subscription by its public id.
    pub async fn find_by_subscription_id(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::start("find_subscription_by_id");
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM subscriptions s
            LEFT JOIN users u ON u.id = s.relative_id
            WHERE s.subscription_id = $1
            "#
        );
        let result = sqlx::query_as::<_, SubscriptionEntity>(&sql)
            .bind(subscription_id)
            .fetch_optional(&self.pool)
            .await;
        timer.finish(&result);
        result
    }

    /// Lists subscriptions held by a relative, newest first.
    pub async fn list_for_relative(
        &self,
        relative_id: Uuid,
    ) -> Result<Vec<SubscriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::start("list_subscriptions_for_relative");
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM subscriptions s
            LEFT JOIN users u ON u.id = s.relative_id
            WHERE s.relative_id = $1
            ORDER BY s.created_at DESC, s.id DESC
            "#
        );
        let result = sqlx::query_as::<_, SubscriptionEntity>(&sql)
            .bind(relative_id)
            .fetch_all(&self.pool)
            .await;
        timer.finish(&result);
        result
    }

    /// Active subscriptions to a user whose types include `alert_type` or `all`.
    pub async fn find_active_for_user(
        &self,
        user_id: Uuid,
        alert_type: AlertType,
    ) -> Result<Vec<SubscriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::start("find_active_subscriptions");
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM subscriptions s
            LEFT JOIN users u ON u.id = s.relative_id
            WHERE s.user_id = $1
              AND s.is_active = TRUE
              AND ($2 = ANY(s.alert_types) OR $3 = ANY(s.alert_types))
            ORDER BY s.id ASC
            "#
        );
        let result = sqlx::query_as::<_, SubscriptionEntity>(&sql)
            .bind(user_id)
            .bind(alert_type.as_str())
            .bind(AlertTypeFilter::WILDCARD)
            .fetch_all(&self.pool)
            .await;
        timer.finish(&result);
        result
    }

    /// Whether `relative_id` holds an active subscription to `user_id`.
    pub async fn has_active_subscription(
        &self,
        relative_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::start("has_active_subscription");
        let result: Result<(bool,), sqlx::Error> = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM subscriptions
                WHERE relative_id = $1 AND user_id = $2 AND is_active = TRUE
            )
            "#,
        )
        .bind(relative_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result?.0)
    }

    /// Applies a partial update. `None` fields are left unchanged.
    pub async fn update(
        &self,
        subscription_id: Uuid,
        alert_types: Option<&[AlertTypeFilter]>,
        is_active: Option<bool>,
    ) -> Result<Option<SubscriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::start("update_subscription");
        let sql = format!(
            r#"
            WITH s AS (
                UPDATE subscriptions
                SET alert_types = COALESCE($2, alert_types),
                    is_active = COALESCE($3, is_active),
                    updated_at = NOW()
                WHERE subscription_id = $1
                RETURNING *
            )
            SELECT {SELECT_COLUMNS}
            FROM s
            LEFT JOIN users u ON u.id = s.relative_id
            "#
        );
        let result = sqlx::query_as::<_, SubscriptionEntity>(&sql)
            .bind(subscription_id)
            .bind(alert_types.map(alert_types_to_db))
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await;
        timer.finish(&result);
        result
    }

    /// Deletes a subscription. Returns true if a row was removed.
    pub async fn delete(&self, subscription_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::start("delete_subscription");
        let result = sqlx::query(
            r#"
            DELETE FROM subscriptions
            WHERE subscription_id = $1
            "#,
        )
        .bind(subscription_id)
        .execute(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result?.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl SubscriptionDirectory for SubscriptionRepository {
    async fn find_active_subscriptions(
        &self,
        user_id: Uuid,
        alert_type: AlertType,
    ) -> Result<Vec<Subscription>, StoreError> {
        let rows = self
            .find_active_for_user(user_id, alert_type)
            .await
            .map_err(to_store_error)?;
        Ok(rows.into_iter().map(Subscription::from).collect())
    }
}
