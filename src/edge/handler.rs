//! Per-request orchestration
//!
//! The mirror fetch is spawned before the probe so both network round trips
//! overlap. The probe is always resolved first; redirect branches return
//! without waiting for the mirror, whose task is then left to finish in the
//! background.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

use super::composer::ResponseComposer;
use super::freshness::{DatetimeMarkerExtractor, FreshnessExtractor};
use super::mirror::MirrorFetcher;
use super::prober::OriginProber;
use super::translator::UrlTranslator;
use super::{classify, EdgeError};
use crate::config::Config;
use crate::metrics::{EdgeMetrics, Timer};
use crate::transport::Transport;
use crate::types::{FinalResponse, IncomingRequest, ProbeVerdict, Route};

/// Stateless request handler; one instance serves all requests
#[derive(Debug)]
pub struct EdgeHandler {
    translator: UrlTranslator,
    index_route: String,
    prober: OriginProber,
    mirror: Arc<MirrorFetcher>,
    composer: ResponseComposer,
    metrics: Arc<EdgeMetrics>,
}

impl EdgeHandler {
    /// Build a handler with the default datetime-marker extractor
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        metrics: Arc<EdgeMetrics>,
    ) -> Result<Self> {
        let extractor = DatetimeMarkerExtractor::new(&config.mirror.timestamp_selector)?;
        Self::with_extractor(config, transport, Arc::new(extractor), metrics)
    }

    /// Build a handler with a custom freshness extractor
    pub fn with_extractor(
        config: &Config,
        transport: Arc<dyn Transport>,
        extractor: Arc<dyn FreshnessExtractor>,
        metrics: Arc<EdgeMetrics>,
    ) -> Result<Self> {
        let mirror_config = &config.mirror;
        let translator = UrlTranslator::from_config(mirror_config);

        let backend_origin = Url::parse(&mirror_config.backend_origin)
            .with_context(|| format!("Invalid backend origin '{}'", mirror_config.backend_origin))?;

        let prober = OriginProber::from_config(config, transport.clone(), extractor)?;
        let mirror = Arc::new(MirrorFetcher::new(
            transport,
            backend_origin,
            config.transport.mirror_cache_ttl(),
        ));
        let composer =
            ResponseComposer::new(translator.clone(), mirror_config.notice_marker.clone());

        Ok(Self {
            translator,
            index_route: mirror_config.index_route.clone(),
            prober,
            mirror,
            composer,
            metrics,
        })
    }

    /// Decide and build the response for one request.
    ///
    /// Only a mirror fetch failure is returned as an error.
    pub async fn handle(&self, request: IncomingRequest) -> Result<FinalResponse, EdgeError> {
        let timer = Timer::start();
        self.metrics.requests_total.inc();

        let canonical_url = self.translator.to_canonical(&request.url);
        let route = classify(&canonical_url, &self.index_route);

        let mirror_task = Arc::clone(&self.mirror).spawn(request);
        let mirror = async move {
            match mirror_task.await {
                Ok(result) => result.map_err(EdgeError::MirrorFetch),
                Err(e) => Err(EdgeError::MirrorTask(e.to_string())),
            }
        };

        let verdict = match route {
            Route::Index => None,
            Route::Content => Some(self.probe(&canonical_url).await),
        };

        let composed = self
            .composer
            .compose(route, verdict.as_ref(), &canonical_url, mirror)
            .await;
        timer.record(&self.metrics.request_latency);

        let verdict_kind = verdict.as_ref().map_or("skipped", ProbeVerdict::kind);
        match composed {
            Ok(composition) => {
                self.metrics.record_outcome(composition.outcome);
                info!(
                    route = %route,
                    verdict = verdict_kind,
                    outcome = %composition.outcome,
                    status = composition.response.status.as_u16(),
                    "{}: {}",
                    if composition.outcome.is_redirect() { "Redirect" } else { "No redirect" },
                    canonical_url
                );
                Ok(composition.response)
            }
            Err(e) => {
                if matches!(e, EdgeError::MirrorFetch(_) | EdgeError::MirrorTask(_)) {
                    self.metrics.mirror_failures.inc();
                }
                error!(
                    route = %route,
                    verdict = verdict_kind,
                    "Failed to respond for {}: {}",
                    canonical_url,
                    e
                );
                Err(e)
            }
        }
    }

    /// Probe, degrading any failure to "not indexable, no timestamp"
    async fn probe(&self, canonical_url: &str) -> ProbeVerdict {
        let timer = Timer::start();
        let result = self.prober.probe(canonical_url).await;
        timer.record(&self.metrics.probe_latency);

        result.unwrap_or_else(|e| {
            self.metrics.probe_failures.inc();
            warn!("Probe failed for {}: {}", canonical_url, e);
            ProbeVerdict::unknown()
        })
    }
}
