use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use domain::error::ConfigurationError;
use domain::services::{AlertNotifier, AlertStore, AnalysisOrchestrator, SubscriptionDirectory};
use persistence::repositories::{AlertRepository, SubscriptionRepository};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, require_caller, trace_id,
    RateLimiterState,
};
use crate::routes::{alerts, analysis, health, subscriptions};
use crate::services::{EmailError, EmailService, OllamaClient, VisionError, VisionModel};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub orchestrator: AnalysisOrchestrator,
    pub vision: Arc<dyn VisionModel>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

/// Errors raised while wiring the application together.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid detection configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Email service: {0}")]
    Email(#[from] EmailError),

    #[error("Vision client: {0}")]
    Vision(#[from] VisionError),
}

impl AppState {
    /// Builds state around explicit ports.
    ///
    /// Production code goes through [`build_state`]; tests use this to swap in
    /// in-memory stores and mock clients.
    pub fn with_ports(
        config: Config,
        pool: PgPool,
        alerts: Arc<dyn AlertStore>,
        subscriptions: Arc<dyn SubscriptionDirectory>,
        notifier: Arc<dyn AlertNotifier>,
        vision: Arc<dyn VisionModel>,
    ) -> Result<Self, StartupError> {
        let rules = Arc::new(config.detection.rule_table()?);
        let extractor = Arc::new(config.detection.object_extractor()?);
        let orchestrator =
            AnalysisOrchestrator::new(rules, extractor, alerts, subscriptions, notifier);

        // Rate limiting is disabled when the quota is 0
        let rate_limiter = if config.security.analyze_rate_limit_per_minute > 0 {
            Some(Arc::new(RateLimiterState::new(
                config.security.analyze_rate_limit_per_minute,
            )))
        } else {
            None
        };

        Ok(Self {
            pool,
            config: Arc::new(config),
            orchestrator,
            vision,
            rate_limiter,
        })
    }
}

/// Builds state backed by Postgres, the configured email provider and Ollama.
pub fn build_state(config: Config, pool: PgPool) -> Result<AppState, StartupError> {
    let alerts = Arc::new(AlertRepository::new(pool.clone()));
    let subscriptions = Arc::new(SubscriptionRepository::new(pool.clone()));
    let notifier = Arc::new(EmailService::new(config.email.clone())?);
    let vision = Arc::new(OllamaClient::new(&config.vision)?);

    AppState::with_ports(config, pool, alerts, subscriptions, notifier, vision)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    // Image analysis: caller identity runs first, then the per-user quota
    let model_routes = Router::new()
        .route("/api/v1/model/analyze", post(analysis::analyze))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn(require_caller));

    let caller_routes = Router::new()
        .route("/api/v1/alerts", get(alerts::list_alerts))
        .route("/api/v1/alerts/stats", get(alerts::alert_stats))
        .route("/api/v1/alerts/:alert_id", get(alerts::get_alert))
        .route(
            "/api/v1/alerts/:alert_id/acknowledge",
            post(alerts::acknowledge_alert),
        )
        .route(
            "/api/v1/subscriptions",
            post(subscriptions::create_subscription).get(subscriptions::list_subscriptions),
        )
        .route(
            "/api/v1/subscriptions/:subscription_id",
            patch(subscriptions::update_subscription).delete(subscriptions::delete_subscription),
        )
        .route_layer(middleware::from_fn(require_caller));

    // Public routes (no caller identity required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/api/v1/model/health", get(analysis::model_health))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(model_routes)
        .merge(caller_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config))
        .with_state(state)
}

pub fn create_app(config: Config, pool: PgPool) -> Result<Router, StartupError> {
    Ok(build_router(build_state(config, pool)?))
}
