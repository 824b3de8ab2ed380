pub mod health;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        // Analysis API; /api/analyze mirrors /analyze for hosted deployments
        .route("/analyze", post(handlers::handle_analyze))
        .route("/api/analyze", post(handlers::handle_analyze))
        .layer(body_limit)
        .with_state(state)
}

/// CORS for the browser frontend. `*` allows any origin.
pub fn cors_layer(frontend_origin: &str) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if frontend_origin == "*" {
        return Ok(layer.allow_origin(Any));
    }

    let origin = frontend_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("FRONTEND_ORIGIN is not a valid origin: {frontend_origin}"))?;
    Ok(layer.allow_origin(origin))
}
