//! reqwest-backed transport
//!
//! Holds two clients: one follows redirects (canonical probes) and one
//! returns 3xx responses untouched (mirror passthrough). Both share the
//! optional response cache.

use async_trait::async_trait;
use axum::http::{header, HeaderMap, Method};
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{
    CacheKey, CachedResponse, FetchOptions, OutboundRequest, RedirectMode, ResponseBody,
    ResponseCache, Transport, TransportError, TransportResponse,
};
use crate::config::TransportConfig;

/// HTTP transport over reqwest
#[derive(Debug)]
pub struct HttpTransport {
    follow_client: reqwest::Client,
    manual_client: reqwest::Client,
    cache: Option<ResponseCache>,
    max_cached_body_bytes: usize,
}

impl HttpTransport {
    /// Create a new transport
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let follow_client = Self::builder(config)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;
        let manual_client = Self::builder(config)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            follow_client,
            manual_client,
            cache: NonZeroUsize::new(config.cache_capacity).map(ResponseCache::new),
            max_cached_body_bytes: config.max_cached_body_bytes,
        })
    }

    fn builder(config: &TransportConfig) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
    }

    /// The response cache, when enabled
    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Only body-less GET/HEAD requests without credentials are cacheable
    fn cache_key(request: &OutboundRequest, options: &FetchOptions) -> Option<CacheKey> {
        options.cache_ttl?;
        let safe = request.method == Method::GET || request.method == Method::HEAD;
        if !safe || !request.body.is_empty() {
            return None;
        }
        if request.headers.contains_key(header::COOKIE)
            || request.headers.contains_key(header::AUTHORIZATION)
        {
            return None;
        }
        Some(CacheKey {
            method: request.method.clone(),
            redirect: options.redirect,
            url: request.url.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        request: OutboundRequest,
        options: FetchOptions,
    ) -> Result<TransportResponse, TransportError> {
        let url = Url::parse(&request.url)
            .map_err(|e| TransportError::InvalidUrl(format!("{} ({})", request.url, e)))?;

        // Key and cache only matter together
        let cached = match (Self::cache_key(&request, &options), self.cache.as_ref()) {
            (Some(key), Some(cache)) => Some((key, cache)),
            _ => None,
        };

        if let Some((key, cache)) = &cached {
            if let Some(hit) = cache.get(key) {
                debug!("Cache hit for {}", request.url);
                return Ok(hit.into());
            }
        }

        let request_url = request.url;
        let client = match options.redirect {
            RedirectMode::Follow => &self.follow_client,
            RedirectMode::Manual => &self.manual_client,
        };

        let mut builder = client
            .request(request.method, url.clone())
            .headers(request.headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }
        let response = builder.send().await?;

        let status = response.status();
        let redirected = response.url() != &url;
        let final_url = response.url().to_string();
        let headers = response.headers().clone();

        match (cached, options.cache_ttl) {
            (Some((key, cache)), Some(ttl))
                if !status.is_server_error() && is_shareable(&headers) =>
            {
                let body = response.bytes().await?;
                if body.len() <= self.max_cached_body_bytes {
                    cache.insert(
                        key,
                        CachedResponse {
                            status,
                            url: final_url.clone(),
                            redirected,
                            headers: headers.clone(),
                            body: body.clone(),
                        },
                        ttl,
                    );
                } else {
                    debug!("Not caching {} ({} bytes)", request_url, body.len());
                }
                Ok(TransportResponse {
                    status,
                    url: final_url,
                    redirected,
                    headers,
                    body: ResponseBody::Buffered(body),
                })
            }
            _ => Ok(TransportResponse {
                status,
                url: final_url,
                redirected,
                headers,
                body: ResponseBody::Streaming(response),
            }),
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Whether a response may be replayed to other requesters.
///
/// Per-user responses (cookies, private or uncacheable directives) are never
/// shared, nor are responses that vary on a forwarded request header.
/// `Accept-Encoding` is set by the transport itself, so varying on it is fine.
fn is_shareable(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::SET_COOKIE) {
        return false;
    }
    let varies_per_request = list_values(headers, header::VARY)
        .any(|name| name != header::ACCEPT_ENCODING.as_str());
    let private = list_values(headers, header::CACHE_CONTROL).any(|directive| {
        directive == "no-store" || directive == "no-cache" || directive.starts_with("private")
    });
    !varies_per_request && !private
}

/// Lowercased items of a comma-separated header
fn list_values(
    headers: &HeaderMap,
    name: header::HeaderName,
) -> impl Iterator<Item = String> + '_ {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|item| item.trim().to_ascii_lowercase())
        .filter(|item| !item.is_empty())
}
