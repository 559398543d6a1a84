//! Canonical page indexability probe
//!
//! The probe fetches the canonical URL (following redirects) and classifies
//! the result:
//! - 200 without a suppression header: indexable
//! - redirected to another account/repository: moved
//! - anything else: not indexable, with a best-effort scraped timestamp
//!
//! The moved check compares path prefixes before and after redirects. It is
//! a heuristic; a missed move simply falls through to "not indexable".

use axum::http::{HeaderName, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::freshness::FreshnessExtractor;
use crate::config::Config;
use crate::transport::{FetchOptions, OutboundRequest, Transport, TransportError};
use crate::types::ProbeVerdict;

/// Errors that can occur while probing
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Probe transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("Invalid suppression header name: {0}")]
    InvalidHeaderName(String),
}

/// Probes the canonical site for indexability
#[derive(Debug, Clone)]
pub struct OriginProber {
    transport: Arc<dyn Transport>,
    extractor: Arc<dyn FreshnessExtractor>,
    suppression_headers: Vec<HeaderName>,
    cache_ttl: Option<Duration>,
}

impl OriginProber {
    pub fn new(
        transport: Arc<dyn Transport>,
        extractor: Arc<dyn FreshnessExtractor>,
        suppression_headers: Vec<HeaderName>,
        cache_ttl: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            extractor,
            suppression_headers,
            cache_ttl,
        }
    }

    /// Build a prober from the mirror and transport configuration
    pub fn from_config(
        config: &Config,
        transport: Arc<dyn Transport>,
        extractor: Arc<dyn FreshnessExtractor>,
    ) -> Result<Self, ProbeError> {
        let suppression_headers = config
            .mirror
            .suppression_headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
                    .map_err(|_| ProbeError::InvalidHeaderName(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            transport,
            extractor,
            suppression_headers,
            config.transport.probe_cache_ttl(),
        ))
    }

    /// Probe a canonical URL. A single attempt, never retried.
    pub async fn probe(&self, canonical_url: &str) -> Result<ProbeVerdict, ProbeError> {
        let response = self
            .transport
            .fetch(
                OutboundRequest::get(canonical_url),
                FetchOptions::probe(self.cache_ttl),
            )
            .await?;

        let suppressed_by = self
            .suppression_headers
            .iter()
            .find(|name| response.headers.contains_key(*name));

        if response.status == StatusCode::OK && suppressed_by.is_none() {
            return Ok(ProbeVerdict::Indexable);
        }

        debug!(
            status = response.status.as_u16(),
            suppressed_by = suppressed_by.map(|h| h.as_str()),
            "Canonical page {} is not indexable",
            canonical_url
        );

        // A moved page's body says nothing about the original, so check first
        if response.redirected && has_moved(canonical_url, &response.url) {
            return Ok(ProbeVerdict::Moved {
                destination_url: response.url,
            });
        }

        let body = response.text().await?;
        Ok(ProbeVerdict::NotIndexable {
            last_modified: self.extractor.extract(&body),
        })
    }
}

/// The `<account>/<repository>` prefix of a URL path
pub fn repository_prefix(url: &str) -> Option<(String, String)> {
    let url = Url::parse(url).ok()?;
    let mut segments = url.path_segments()?;
    let account = segments.next().unwrap_or_default().to_string();
    let repository = segments.next().unwrap_or_default().to_string();
    Some((account, repository))
}

/// Whether a redirect landed under a different account/repository.
/// Unparseable URLs never count as moved.
pub fn has_moved(original_url: &str, final_url: &str) -> bool {
    match (repository_prefix(original_url), repository_prefix(final_url)) {
        (Some(original), Some(destination)) => original != destination,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_prefix() {
        assert_eq!(
            repository_prefix("https://github.com/OrgA/ProjA/wiki/Page"),
            Some(("OrgA".to_string(), "ProjA".to_string()))
        );
        assert_eq!(
            repository_prefix("https://github.com/OrgA"),
            Some(("OrgA".to_string(), String::new()))
        );
        assert_eq!(repository_prefix("::"), None);
    }

    #[test]
    fn test_has_moved() {
        assert!(has_moved(
            "https://github.com/OrgA/ProjA/wiki",
            "https://github.com/OrgB/ProjA/wiki"
        ));
        assert!(has_moved(
            "https://github.com/OrgA/ProjA/wiki",
            "https://github.com/OrgA/Renamed/wiki"
        ));
        // Same repository, different page
        assert!(!has_moved(
            "https://github.com/OrgA/ProjA/wiki/Old",
            "https://github.com/OrgA/ProjA/wiki"
        ));
        assert!(!has_moved("https://github.com/OrgA/ProjA/wiki", "not a url"));
    }
}
