//! Alert history endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::{Alert, AlertResponse, AlertStats, ListAlertsQuery, ListAlertsResponse};
use persistence::repositories::{AlertListQuery, AlertRepository, SubscriptionRepository};
use shared::pagination::{clamp_limit, Page, PageCursor};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;

/// Allows the alert's owner and relatives actively subscribed to them.
async fn ensure_can_view(state: &AppState, caller: &Caller, alert: &Alert) -> Result<(), ApiError> {
    if alert.user_id == caller.user_id {
        return Ok(());
    }

    let subscriptions = SubscriptionRepository::new(state.pool.clone());
    if subscriptions
        .has_active_subscription(caller.user_id, alert.user_id)
        .await?
    {
        return Ok(());
    }

    Err(ApiError::Forbidden(
        "Not allowed to access this alert".to_string(),
    ))
}

async fn load_alert(state: &AppState, alert_id: Uuid) -> Result<Alert, ApiError> {
    AlertRepository::new(state.pool.clone())
        .find_by_alert_id(alert_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Alert not found".to_string()))
}

/// List the caller's alerts, newest first.
///
/// GET /api/v1/alerts?limit&cursor&severity&acknowledged&type
pub async fn list_alerts(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListAlertsQuery>,
) -> Result<Json<ListAlertsResponse>, ApiError> {
    let limit = clamp_limit(query.limit);
    let before = query
        .cursor
        .as_deref()
        .map(PageCursor::decode)
        .transpose()?
        .map(|c| (c.created_at, c.id));

    let repo = AlertRepository::new(state.pool.clone());
    let rows = repo
        .list_for_user(&AlertListQuery {
            user_id: caller.user_id,
            severity: query.severity,
            acknowledged: query.acknowledged,
            alert_type: query.alert_type,
            before,
            // One extra row tells us whether another page exists
            limit: limit + 1,
        })
        .await?;

    let page = Page::from_overfetch(rows, limit, |a: &Alert| PageCursor::new(a.created_at, a.id));

    Ok(Json(ListAlertsResponse {
        alerts: page.items.into_iter().map(AlertResponse::from).collect(),
        next_cursor: page.next_cursor,
    }))
}

/// Get a single alert.
///
/// GET /api/v1/alerts/:alert_id
pub async fn get_alert(
    State(state): State<AppState>,
    caller: Caller,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<AlertResponse>, ApiError> {
    let alert = load_alert(&state, alert_id).await?;
    ensure_can_view(&state, &caller, &alert).await?;
    Ok(Json(alert.into()))
}

/// Acknowledge an alert. Repeat acknowledgments keep the first one.
///
/// POST /api/v1/alerts/:alert_id/acknowledge
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    caller: Caller,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<AlertResponse>, ApiError> {
    let alert = load_alert(&state, alert_id).await?;
    ensure_can_view(&state, &caller, &alert).await?;

    let updated = AlertRepository::new(state.pool.clone())
        .acknowledge(alert_id, caller.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Alert not found".to_string()))?;

    info!(
        alert_id = %alert_id,
        acknowledged_by = %caller.user_id,
        "Alert acknowledged"
    );

    Ok(Json(updated.into()))
}

/// Alert counts for the caller.
///
/// GET /api/v1/alerts/stats
pub async fn alert_stats(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<AlertStats>, ApiError> {
    let stats = AlertRepository::new(state.pool.clone())
        .stats_for_user(caller.user_id)
        .await?;
    Ok(Json(stats))
}
