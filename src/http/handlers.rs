//! Route handlers

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use super::types::{ErrorResponse, HealthResponse};
use crate::edge::EdgeHandler;
use crate::metrics::EdgeMetrics;
use crate::types::{FinalResponse, IncomingRequest};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<EdgeHandler>,
    pub metrics: Arc<EdgeMetrics>,
    /// Scheme + host prepended to request paths
    pub public_origin: Arc<str>,
    pub max_body_bytes: usize,
    pub metrics_enabled: bool,
}

impl IntoResponse for FinalResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus metrics endpoint
pub async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    if !state.metrics_enabled {
        return (StatusCode::NOT_FOUND, Json(ErrorResponse::not_found())).into_response();
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.to_prometheus(),
    )
        .into_response()
}

/// Every other request goes through the edge handler
pub async fn edge(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let body = match to_bytes(body, state.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => {
            debug!("Rejecting request body: {}", e);
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ErrorResponse::payload_too_large(format!(
                    "Request body exceeds {} bytes",
                    state.max_body_bytes
                ))),
            )
                .into_response();
        }
    };

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let incoming = IncomingRequest {
        method: parts.method,
        url: format!("{}{}", state.public_origin, path_and_query),
        headers: parts.headers,
        body,
    };

    match state.handler.handle(incoming).await {
        Ok(response) => response.into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse::mirror_fetch_failed(e.to_string())),
        )
            .into_response(),
    }
}
