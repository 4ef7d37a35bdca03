//! Vision model endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use domain::detection::Classification;
use domain::models::{AlertType, DetectedObject, Severity};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;
use crate::services::VisionHealth;

/// Body of `POST /api/v1/model/analyze`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Base64 image, optionally as a `data:` URL.
    #[serde(default)]
    #[validate(length(min = 1, message = "Image is required"))]
    pub image: String,

    #[serde(default)]
    #[validate(custom(function = "shared::validation::validate_prompt"))]
    pub prompt: String,

    pub session_id: Option<String>,
}

/// Alert part of the analysis response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSummary {
    pub detected: bool,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub keywords: Vec<String>,
    pub confidence: Option<f64>,
    pub alert_id: Option<Uuid>,
}

impl AlertSummary {
    fn new(classification: Classification, alert_id: Option<Uuid>) -> Self {
        Self {
            detected: classification.detected,
            severity: classification.severity,
            alert_type: classification.alert_type,
            keywords: classification.matched_keywords,
            confidence: classification.confidence,
            alert_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub response: String,
    pub model: String,
    pub session_id: Option<String>,
    pub alert: AlertSummary,
    pub detected_objects: Vec<DetectedObject>,
}

/// Sends an image to the vision model and turns its answer into an alert.
///
/// POST /api/v1/model/analyze
pub async fn analyze(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    request.validate()?;

    let answer = state
        .vision
        .analyze_image(&request.image, &request.prompt)
        .await?;

    let user = caller.to_user_ref();
    let outcome = state.orchestrator.analyze(&user, &answer.text).await?;

    if let Some(alert_id) = outcome.alert_id {
        info!(
            user_id = %user.id,
            alert_id = %alert_id,
            severity = %outcome.classification.severity,
            "Alert raised from image analysis"
        );
    }

    Ok(Json(AnalyzeResponse {
        success: true,
        response: answer.text,
        model: answer.model,
        session_id: request.session_id,
        alert: AlertSummary::new(outcome.classification, outcome.alert_id),
        detected_objects: outcome.detected_objects,
    }))
}

/// Reports whether the vision model can be reached.
///
/// GET /api/v1/model/health
pub async fn model_health(State(state): State<AppState>) -> (StatusCode, Json<VisionHealth>) {
    let health = state.vision.health().await;
    let status = if health.available {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_request_defaults_missing_fields() {
        let request: AnalyzeRequest = serde_json::from_str(r#"{"prompt": "Describe"}"#).unwrap();
        assert!(request.image.is_empty());
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_analyze_request_rejects_blank_prompt() {
        let request: AnalyzeRequest =
            serde_json::from_str(r#"{"image": "abc", "prompt": "   "}"#).unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("prompt"));
    }

    #[test]
    fn test_alert_summary_shape() {
        let summary = AlertSummary::new(Classification::not_detected(), None);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["detected"], false);
        assert_eq!(json["severity"], "low");
        assert_eq!(json["type"], "info");
        assert!(json["alertId"].is_null());
        assert!(json["confidence"].is_null());
    }
}
