//! Subscription endpoint handlers.
//!
//! A relative subscribes to a user's alerts; the caller is always the
//! relative.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    CreateSubscriptionRequest, ListSubscriptionsResponse, Subscription, SubscriptionResponse,
    UpdateSubscriptionRequest,
};
use persistence::entities::SubscriptionEntity;
use persistence::repositories::{SubscriptionRepository, UserRepository};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;

/// Loads a subscription and checks the caller holds it.
async fn load_owned(
    repo: &SubscriptionRepository,
    caller: &Caller,
    subscription_id: Uuid,
) -> Result<SubscriptionEntity, ApiError> {
    let entity = repo
        .find_by_subscription_id(subscription_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subscription not found".to_string()))?;

    if entity.relative_id != caller.user_id {
        return Err(ApiError::Forbidden(
            "Not allowed to modify this subscription".to_string(),
        ));
    }
    Ok(entity)
}

/// Subscribe to a user's alerts.
///
/// POST /api/v1/subscriptions
pub async fn create_subscription(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), ApiError> {
    request.validate()?;

    if request.user_id == caller.user_id {
        return Err(ApiError::Validation(
            "Cannot subscribe to your own alerts".to_string(),
        ));
    }

    let target = UserRepository::new(state.pool.clone())
        .find_by_id(request.user_id)
        .await?;
    if !target.is_some_and(|u| u.is_active) {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let alert_types = request.normalized_alert_types();
    let repo = SubscriptionRepository::new(state.pool.clone());
    let entity = repo
        .create(caller.user_id, request.user_id, &alert_types)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => {
                ApiError::Conflict("Already subscribed to this user".to_string())
            }
            other => other,
        })?;

    let subscription = Subscription::from(entity);
    info!(
        subscription_id = %subscription.subscription_id,
        relative_id = %subscription.relative_id,
        user_id = %subscription.user_id,
        "Subscription created"
    );

    Ok((StatusCode::CREATED, Json(subscription.into())))
}

/// List subscriptions held by the caller.
///
/// GET /api/v1/subscriptions
pub async fn list_subscriptions(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<ListSubscriptionsResponse>, ApiError> {
    let repo = SubscriptionRepository::new(state.pool.clone());
    let subscriptions: Vec<SubscriptionResponse> = repo
        .list_for_relative(caller.user_id)
        .await?
        .into_iter()
        .map(|e| Subscription::from(e).into())
        .collect();

    let total = subscriptions.len();
    Ok(Json(ListSubscriptionsResponse {
        subscriptions,
        total,
    }))
}

/// Change alert types or pause a subscription.
///
/// PATCH /api/v1/subscriptions/:subscription_id
pub async fn update_subscription(
    State(state): State<AppState>,
    caller: Caller,
    Path(subscription_id): Path<Uuid>,
    Json(request): Json<UpdateSubscriptionRequest>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    request.validate()?;

    let repo = SubscriptionRepository::new(state.pool.clone());
    load_owned(&repo, &caller, subscription_id).await?;

    let alert_types = request.normalized_alert_types();
    let entity = repo
        .update(subscription_id, alert_types.as_deref(), request.is_active)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subscription not found".to_string()))?;

    info!(subscription_id = %subscription_id, "Subscription updated");
    Ok(Json(Subscription::from(entity).into()))
}

/// Unsubscribe.
///
/// DELETE /api/v1/subscriptions/:subscription_id
pub async fn delete_subscription(
    State(state): State<AppState>,
    caller: Caller,
    Path(subscription_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = SubscriptionRepository::new(state.pool.clone());
    load_owned(&repo, &caller, subscription_id).await?;

    if !repo.delete(subscription_id).await? {
        return Err(ApiError::NotFound("Subscription not found".to_string()));
    }

    info!(subscription_id = %subscription_id, "Subscription deleted");
    Ok(StatusCode::NO_CONTENT)
}
