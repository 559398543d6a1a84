//! Mirror backing-store fetch

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

use crate::transport::{
    FetchOptions, OutboundRequest, Transport, TransportError, TransportResponse,
};
use crate::types::IncomingRequest;

/// Forwards inbound requests to the mirror's own backing store
#[derive(Debug, Clone)]
pub struct MirrorFetcher {
    transport: Arc<dyn Transport>,
    backend_origin: Url,
    cache_ttl: Option<Duration>,
}

impl MirrorFetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        backend_origin: Url,
        cache_ttl: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            backend_origin,
            cache_ttl,
        }
    }

    /// Backend URL serving the same path and query as the public request
    pub fn backend_url(&self, request_url: &str) -> Result<String, TransportError> {
        let public = Url::parse(request_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{} ({})", request_url, e)))?;
        let mut target = self.backend_origin.clone();
        target.set_path(public.path());
        target.set_query(public.query());
        Ok(target.to_string())
    }

    /// Forward the request. Failures propagate; there is nothing to fall back to.
    pub async fn fetch(
        &self,
        request: &IncomingRequest,
    ) -> Result<TransportResponse, TransportError> {
        let url = self.backend_url(&request.url)?;
        self.transport
            .fetch(
                OutboundRequest::forward(request, url),
                FetchOptions::mirror(self.cache_ttl),
            )
            .await
    }

    /// Start the fetch on its own task so it runs while the caller probes.
    ///
    /// Dropping the handle detaches the task; its result is then discarded.
    pub fn spawn(
        self: Arc<Self>,
        request: IncomingRequest,
    ) -> JoinHandle<Result<TransportResponse, TransportError>> {
        tokio::spawn(async move { self.fetch(&request).await })
    }
}
