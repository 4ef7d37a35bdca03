use std::time::Duration;

use anyhow::Result;
use tracing::info;

use drishti_api::{app, config, maintenance::Maintenance, middleware};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    info!("Starting Drishti API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let state = app::build_state(config.clone(), pool.clone())?;

    let maintenance = Maintenance::start(pool, state.rate_limiter.clone());

    let app = app::build_router(state);

    let addr = config.socket_addr()?;
    info!(vision_model = %config.vision.model, "Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    maintenance.stop(Duration::from_secs(10)).await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
