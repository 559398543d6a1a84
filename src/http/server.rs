//! Edge HTTP server
//!
//! Axum-based server fronting the edge handler.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers::AppState;
use super::routes::create_router;
use crate::config::Config;
use crate::edge::EdgeHandler;
use crate::metrics::EdgeMetrics;

/// HTTP server running the edge handler
pub struct EdgeServer {
    listen_addr: String,
    app_state: AppState,
}

impl EdgeServer {
    pub fn new(config: &Config, handler: Arc<EdgeHandler>, metrics: Arc<EdgeMetrics>) -> Self {
        let public_origin = config.mirror.public_origin.trim_end_matches('/');
        Self {
            listen_addr: config.http.listen_addr.clone(),
            app_state: AppState {
                handler,
                metrics,
                public_origin: Arc::from(public_origin),
                max_body_bytes: config.http.max_body_bytes,
                metrics_enabled: config.metrics.enabled,
            },
        }
    }

    /// Run until a shutdown signal arrives
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let addr: SocketAddr = self
            .listen_addr
            .parse()
            .context("Invalid HTTP listen address")?;

        let app = create_router(self.app_state.clone()).layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind(&addr)
            .await
            .context("Failed to bind HTTP server")?;

        info!("Edge server listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("HTTP server shutting down");
            })
            .await
            .context("HTTP server error")?;

        Ok(())
    }
}
