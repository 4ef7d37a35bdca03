//! Vision model client.
//!
//! Talks to an Ollama server hosting a multimodal model. The server receives a
//! base64 image with a prompt and answers with free text, which the detection
//! pipeline then classifies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::validation::MAX_RESPONSE_TEXT_LENGTH;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::VisionConfig;

/// Shortest payload accepted as an image.
pub const MIN_IMAGE_LENGTH: usize = 20;

/// Errors that can occur while calling the vision model.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Vision model timed out after {0}s")]
    Timeout(u64),

    #[error("Vision model unavailable: {0}")]
    Unavailable(String),

    #[error("Vision model returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Invalid response from vision model: {0}")]
    InvalidResponse(String),
}

/// Text answer from the model.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionResponse {
    pub text: String,
    pub model: String,
}

/// Reachability of the model server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionHealth {
    pub available: bool,
    pub model: String,
    pub model_installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A model that can describe an image.
#[async_trait::async_trait]
pub trait VisionModel: Send + Sync {
    /// Sends `image_base64` with `prompt` and returns the model's answer.
    async fn analyze_image(
        &self,
        image_base64: &str,
        prompt: &str,
    ) -> Result<VisionResponse, VisionError>;

    async fn health(&self) -> VisionHealth;

    fn model_name(&self) -> &str;
}

/// Strips a `data:image/...;base64,` prefix and checks the payload decodes.
pub fn normalize_image(image: &str) -> Result<&str, VisionError> {
    let trimmed = image.trim();
    let payload = match trimmed.strip_prefix("data:") {
        Some(rest) => match rest.split_once(',') {
            Some((_, data)) => data,
            None => {
                return Err(VisionError::InvalidImage(
                    "data URL has no payload".to_string(),
                ))
            }
        },
        None => trimmed,
    };

    if payload.len() < MIN_IMAGE_LENGTH {
        return Err(VisionError::InvalidImage(
            "image payload is too short".to_string(),
        ));
    }

    STANDARD
        .decode(payload)
        .map_err(|e| VisionError::InvalidImage(format!("not valid base64: {}", e)))?;

    Ok(payload)
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<&'a str>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Whether an installed tag satisfies the configured model name.
///
/// `llava` matches `llava:latest`; `llava:7b` matches only itself.
fn tag_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted
        || installed
            .strip_prefix(wanted)
            .is_some_and(|rest| rest.starts_with(':'))
}

/// Ollama HTTP client.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(config: &VisionConfig) -> Result<Self, VisionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VisionError::Unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn map_transport_error(&self, e: reqwest::Error) -> VisionError {
        if e.is_timeout() {
            VisionError::Timeout(self.timeout_secs)
        } else {
            VisionError::Unavailable(e.to_string())
        }
    }
}

#[async_trait::async_trait]
impl VisionModel for OllamaClient {
    async fn analyze_image(
        &self,
        image_base64: &str,
        prompt: &str,
    ) -> Result<VisionResponse, VisionError> {
        let image = normalize_image(image_base64)?;
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            images: vec![image],
            stream: false,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = %status, error = %message, "Vision model error");
            return Err(VisionError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| VisionError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .response
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| VisionError::InvalidResponse("empty response text".to_string()))?;
        if text.chars().count() > MAX_RESPONSE_TEXT_LENGTH {
            return Err(VisionError::InvalidResponse(format!(
                "response text exceeds {} characters",
                MAX_RESPONSE_TEXT_LENGTH
            )));
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        metrics::histogram!("vision_request_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        debug!(
            model = %self.model,
            duration_ms = duration_ms,
            response_length = text.len(),
            "Vision model answered"
        );

        Ok(VisionResponse {
            text,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
        })
    }

    async fn health(&self) -> VisionHealth {
        let url = format!("{}/api/tags", self.base_url);
        let result = async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| self.map_transport_error(e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(VisionError::Upstream {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }
            response
                .json::<TagsResponse>()
                .await
                .map_err(|e| VisionError::InvalidResponse(e.to_string()))
        }
        .await;

        match result {
            Ok(tags) => VisionHealth {
                available: true,
                model: self.model.clone(),
                model_installed: tags.models.iter().any(|t| tag_matches(&t.name, &self.model)),
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "Vision model health check failed");
                VisionHealth {
                    available: false,
                    model: self.model.clone(),
                    model_installed: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Canned vision model for development and tests.
#[derive(Clone)]
pub struct MockVisionModel {
    pub response: String,
    pub model: String,
    pub unavailable: bool,
    calls: Arc<AtomicUsize>,
}

impl MockVisionModel {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            model: "mock-vision".to_string(),
            unavailable: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new("")
        }
    }

    /// Number of images analysed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl VisionModel for MockVisionModel {
    async fn analyze_image(
        &self,
        image_base64: &str,
        _prompt: &str,
    ) -> Result<VisionResponse, VisionError> {
        normalize_image(image_base64)?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(VisionError::Unavailable("Simulated outage".to_string()));
        }
        Ok(VisionResponse {
            text: self.response.clone(),
            model: self.model.clone(),
        })
    }

    async fn health(&self) -> VisionHealth {
        VisionHealth {
            available: !self.unavailable,
            model: self.model.clone(),
            model_installed: !self.unavailable,
            error: self.unavailable.then(|| "Simulated outage".to_string()),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
