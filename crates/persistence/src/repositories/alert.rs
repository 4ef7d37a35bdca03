//! Alert repository implementation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use domain::error::StoreError;
use domain::models::{
    Alert, AlertStats, AlertType, DetectedObject, NewAlert, NotificationRecord, Severity,
};
use domain::services::AlertStore;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{AlertEntity, AlertNotificationEntity, SeverityCountEntity};
use crate::metrics::QueryTimer;
use crate::repositories::to_store_error;

/// Encodes detected objects for the `detected_objects` JSONB column.
fn detected_objects_json(objects: &[DetectedObject]) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(objects).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

/// Filters and cursor for listing a user's alerts, newest first.
#[derive(Debug, Clone, Default)]
pub struct AlertListQuery {
    pub user_id: Uuid,
    pub severity: Option<Severity>,
    pub acknowledged: Option<bool>,
    pub alert_type: Option<AlertType>,
    /// Only alerts strictly older than this (created_at, id) pair.
    pub before: Option<(DateTime<Utc>, i64)>,
    pub limit: i64,
}

/// Repository for alert database operations.
#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    /// Creates a new alert repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new alert.
    pub async fn create(&self, alert: &NewAlert) -> Result<AlertEntity, sqlx::Error> {
        let detected_objects = detected_objects_json(&alert.detected_objects)?;

        let timer = QueryTimer::start("create_alert");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            INSERT INTO alerts (
                user_id,
                alert_type,
                severity,
                description,
                model_response,
                detected_objects
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(alert.user_id)
        .bind(alert.alert_type.as_str())
        .bind(alert.severity.as_str())
        .bind(&alert.description)
        .bind(&alert.model_response)
        .bind(detected_objects)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Appends delivery records to an alert's notification log.
    ///
    /// Returns the number of rows written; zero means the alert does not exist.
    pub async fn insert_notifications(
        &self,
        alert_id: Uuid,
        records: &[NotificationRecord],
    ) -> Result<u64, sqlx::Error> {
        let emails: Vec<String> = records.iter().map(|r| r.recipient_email.clone()).collect();
        let statuses: Vec<String> = records.iter().map(|r| r.status.as_str().to_string()).collect();
        let sent_at: Vec<DateTime<Utc>> = records.iter().map(|r| r.sent_at).collect();

        let timer = QueryTimer::start("insert_alert_notifications");
        let result = sqlx::query(
            r#"
            INSERT INTO alert_notifications (alert_id, recipient_email, status, sent_at)
            SELECT a.id, r.recipient_email, r.status, r.sent_at
            FROM alerts a
            CROSS JOIN UNNEST($2::text[], $3::text[], $4::timestamptz[])
                AS r(recipient_email, status, sent_at)
            WHERE a.alert_id = $1
            "#,
        )
        .bind(alert_id)
        .bind(emails)
        .bind(statuses)
        .bind(sent_at)
        .execute(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result?.rows_affected())
    }

    /// Finds an alert by its public id, with its notification log.
    pub async fn find_by_alert_id(&self, alert_id: Uuid) -> Result<Option<Alert>, sqlx::Error> {
        let timer = QueryTimer::start("find_alert_by_id");
        let entity = sqlx::query_as::<_, AlertEntity>(
            r#"
            SELECT * FROM alerts
            WHERE alert_id = $1
            "#,
        )
        .bind(alert_id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&entity);

        match entity? {
            Some(entity) => {
                let mut logs = self.notifications_for(&[entity.id]).await?;
                let notifications = logs.remove(&entity.id).unwrap_or_default();
                Ok(Some(entity.into_domain(notifications)))
            }
            None => Ok(None),
        }
    }

    /// Lists a user's alerts, newest first.
    ///
    /// Fetches at most `query.limit` rows; callers wanting a "has more" signal
    /// should ask for one extra.
    pub async fn list_for_user(&self, query: &AlertListQuery) -> Result<Vec<Alert>, sqlx::Error> {
        let (before_ts, before_id) = match query.before {
            Some((ts, id)) => (Some(ts), id),
            None => (None, i64::MAX),
        };

        let timer = QueryTimer::start("list_alerts_for_user");
        let entities = sqlx::query_as::<_, AlertEntity>(
            r#"
            SELECT * FROM alerts
            WHERE user_id = $1
              AND ($2::text IS NULL OR severity = $2)
              AND ($3::bool IS NULL OR acknowledged = $3)
              AND ($4::text IS NULL OR alert_type = $4)
              AND ($5::timestamptz IS NULL OR (created_at, id) < ($5, $6))
            ORDER BY created_at DESC, id DESC
            LIMIT $7
            "#,
        )
        .bind(query.user_id)
        .bind(query.severity.map(|s| s.as_str()))
        .bind(query.acknowledged)
        .bind(query.alert_type.map(|t| t.as_str()))
        .bind(before_ts)
        .bind(before_id)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&entities);
        let entities = entities?;

        let ids: Vec<i64> = entities.iter().map(|e| e.id).collect();
        let mut logs = self.notifications_for(&ids).await?;

        Ok(entities
            .into_iter()
            .map(|e| {
                let notifications = logs.remove(&e.id).unwrap_or_default();
                e.into_domain(notifications)
            })
            .collect())
    }

    /// Marks an alert as acknowledged. The first acknowledgment is kept.
    pub async fn acknowledge(
        &self,
        alert_id: Uuid,
        acknowledged_by: Uuid,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let timer = QueryTimer::start("acknowledge_alert");
        let entity = sqlx::query_as::<_, AlertEntity>(
            r#"
            UPDATE alerts
            SET acknowledged = TRUE,
                acknowledged_by = COALESCE(acknowledged_by, $2),
                acknowledged_at = COALESCE(acknowledged_at, NOW())
            WHERE alert_id = $1
            RETURNING *
            "#,
        )
        .bind(alert_id)
        .bind(acknowledged_by)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&entity);

        match entity? {
            Some(entity) => {
                let mut logs = self.notifications_for(&[entity.id]).await?;
                let notifications = logs.remove(&entity.id).unwrap_or_default();
                Ok(Some(entity.into_domain(notifications)))
            }
            None => Ok(None),
        }
    }

    /// Alert counts for a user.
    pub async fn stats_for_user(&self, user_id: Uuid) -> Result<AlertStats, sqlx::Error> {
        let timer = QueryTimer::start("alert_stats_for_user");
        let rows = sqlx::query_as::<_, SeverityCountEntity>(
            r#"
            SELECT severity,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE acknowledged = FALSE) AS unacknowledged
            FROM alerts
            WHERE user_id = $1
            GROUP BY severity
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&rows);

        Ok(summarize_counts(rows?))
    }

    async fn notifications_for(
        &self,
        ids: &[i64],
    ) -> Result<HashMap<i64, Vec<NotificationRecord>>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let timer = QueryTimer::start("list_alert_notifications");
        let rows = sqlx::query_as::<_, AlertNotificationEntity>(
            r#"
            SELECT * FROM alert_notifications
            WHERE alert_id = ANY($1)
            ORDER BY sent_at ASC, id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&rows);

        let mut grouped: HashMap<i64, Vec<NotificationRecord>> = HashMap::new();
        for row in rows? {
            grouped.entry(row.alert_id).or_default().push(row.into());
        }
        Ok(grouped)
    }
}

/// Folds per-severity rows into totals. Every severity is present in the map.
fn summarize_counts(rows: Vec<SeverityCountEntity>) -> AlertStats {
    let mut stats = AlertStats::default();
    for severity in Severity::ALL {
        stats.by_severity.insert(severity.as_str().to_string(), 0);
    }
    for row in rows {
        stats.total += row.total;
        stats.unacknowledged += row.unacknowledged;
        stats.by_severity.insert(row.severity, row.total);
    }
    stats
}

#[async_trait::async_trait]
impl AlertStore for AlertRepository {
    async fn save(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let entity = self.create(&alert).await.map_err(to_store_error)?;
        Ok(entity.into_domain(Vec::new()))
    }

    async fn record_notifications(
        &self,
        alert_id: Uuid,
        records: &[NotificationRecord],
    ) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let written = self
            .insert_notifications(alert_id, records)
            .await
            .map_err(to_store_error)?;
        if written == 0 {
            return Err(StoreError::NotFound(format!("alert {}", alert_id)));
        }
        Ok(())
    }
}
