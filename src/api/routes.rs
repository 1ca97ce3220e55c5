use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::handlers::{channel_report, compute_cohort, compute_rates, health_check, AppState};

pub fn create_api_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/rates", post(compute_rates))
        .route("/cohort", post(compute_cohort))
        .route("/channels/{channel_id}/report", get(channel_report))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
