use anyhow::Result;
use indexable_redirect::{
    config::Config,
    edge::EdgeHandler,
    http::EdgeServer,
    metrics::EdgeMetrics,
    transport::{HttpTransport, Transport},
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Run the edge server until Ctrl-C
pub async fn serve(mut config: Config, listen: Option<String>) -> Result<()> {
    if let Some(addr) = listen {
        config.http.listen_addr = addr;
        config.validate()?;
    }

    info!(
        "Mirroring {}{} -> {} (backend {})",
        config.mirror.mirror_host,
        config.mirror.mirror_prefix,
        config.mirror.canonical_host,
        config.mirror.backend_origin
    );

    let metrics = EdgeMetrics::shared();
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.transport)?);
    let handler = Arc::new(EdgeHandler::new(&config, transport, metrics.clone())?);
    let server = EdgeServer::new(&config, handler, metrics);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, shutting down"),
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    server.run(shutdown_rx).await
}
