//! Route definitions

use axum::{routing::get, Router};

use super::handlers::{self, AppState};

/// Create the router: edge-local routes, everything else to the edge handler
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/_edge/health", get(handlers::health))
        .route("/_edge/metrics", get(handlers::prometheus_metrics))
        .fallback(handlers::edge)
        .with_state(app_state)
}
