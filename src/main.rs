use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use viewcurve::api::{self, AppState};
use viewcurve::config::Config;
use viewcurve::estimator::FRONT_LOADED_ACCUMULATION;
use viewcurve::provider;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");
    info!(
        "📈 Growth exponent {} ({}), rate policy {:?}",
        config.estimator.growth_exponent, FRONT_LOADED_ACCUMULATION, config.estimator.rate_policy
    );

    let provider = provider::from_config(&config.provider)?;
    let state = Arc::new(AppState {
        config: config.estimator.clone(),
        provider,
    });
    let router = api::create_api_router(state);

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 API server listening on http://{}", addr);
    info!("   - POST /api/rates, POST /api/cohort");
    info!("   - GET  /api/channels/{{channel_id}}/report");

    axum::serve(listener, router).await?;

    Ok(())
}
