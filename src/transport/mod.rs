//! Outbound HTTP transport
//!
//! The edge engine never talks to reqwest directly. It goes through the
//! [`Transport`] trait so that probing and mirror fetching can be exercised
//! against scripted responses, and so that caching stays a per-fetch option
//! rather than ambient state:
//! - `HttpTransport`: reqwest-backed implementation with follow/manual redirect clients
//! - `ResponseCache`: TTL-bounded LRU of buffered responses

pub mod cache;
pub mod http;

pub use cache::{CacheKey, CachedResponse, ResponseCache};
pub use http::HttpTransport;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use std::fmt::Debug;
use std::time::Duration;
use thiserror::Error;

use crate::types::IncomingRequest;

/// Errors that can occur while fetching
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// How redirects are handled by a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectMode {
    /// Follow redirects and report the final URL
    Follow,
    /// Return 3xx responses as-is
    Manual,
}

/// Per-fetch options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub redirect: RedirectMode,
    /// How long the response may be served from cache; `None` bypasses the cache
    pub cache_ttl: Option<Duration>,
}

impl FetchOptions {
    /// Options for probing the canonical site
    pub fn probe(cache_ttl: Option<Duration>) -> Self {
        Self {
            redirect: RedirectMode::Follow,
            cache_ttl,
        }
    }

    /// Options for forwarding to the mirror backing store
    pub fn mirror(cache_ttl: Option<Duration>) -> Self {
        Self {
            redirect: RedirectMode::Manual,
            cache_ttl,
        }
    }
}

/// A request sent by the transport
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OutboundRequest {
    /// Body-less GET
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Forward an inbound request to another URL, keeping method, headers and body.
    ///
    /// `Accept-Encoding` is dropped so the client negotiates only encodings it
    /// can decode; the body may need to be rewritten.
    pub fn forward(request: &IncomingRequest, url: impl Into<String>) -> Self {
        let mut headers = request.headers.clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        headers.remove(header::ACCEPT_ENCODING);
        Self {
            method: request.method.clone(),
            url: url.into(),
            headers,
            body: request.body.clone(),
        }
    }
}

/// Response body, read at most once
pub enum ResponseBody {
    /// Already in memory (cached or scripted)
    Buffered(Bytes),
    /// Still on the wire
    Streaming(reqwest::Response),
}

impl ResponseBody {
    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        match self {
            Self::Buffered(bytes) => Ok(bytes),
            Self::Streaming(response) => Ok(response.bytes().await?),
        }
    }
}

impl Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            Self::Streaming(_) => f.write_str("Streaming"),
        }
    }
}

/// Response returned by a transport
#[derive(Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    /// Final URL after any redirects
    pub url: String,
    /// Whether redirects were followed to reach `url`
    pub redirected: bool,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl TransportResponse {
    /// Build an in-memory response
    pub fn buffered(status: StatusCode, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            url: url.into(),
            redirected: false,
            headers: HeaderMap::new(),
            body: ResponseBody::Buffered(body.into()),
        }
    }

    /// Mark the response as reached through redirects
    pub fn with_redirected(mut self, redirected: bool) -> Self {
        self.redirected = redirected;
        self
    }

    /// Add a header; invalid names or values are ignored
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Get a header value as text
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Read the whole body
    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        self.body.bytes().await
    }

    /// Read the whole body as (lossy) UTF-8 text
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.body.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Outbound HTTP capability used by the edge engine
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Perform a single fetch. No retries.
    async fn fetch(
        &self,
        request: OutboundRequest,
        options: FetchOptions,
    ) -> Result<TransportResponse, TransportError>;

    /// Transport name for logs
    fn name(&self) -> &str;
}

/// Headers that describe a single connection and must not be forwarded
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers and `content-length`
pub(crate) fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    headers.remove(header::CONTENT_LENGTH);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_drops_connection_headers() {
        let mut request = IncomingRequest::get("https://github-wiki-see.page/m/OrgA/ProjA/wiki");
        request.headers.insert(header::HOST, "github-wiki-see.page".parse().unwrap());
        request.headers.insert(header::CONNECTION, "keep-alive".parse().unwrap());
        request.headers.insert(header::CONTENT_LENGTH, "0".parse().unwrap());
        request.headers.insert(header::ACCEPT, "text/html".parse().unwrap());
        request.headers.insert(header::ACCEPT_ENCODING, "zstd, deflate".parse().unwrap());

        let outbound = OutboundRequest::forward(&request, "http://backend/m/OrgA/ProjA/wiki");
        assert_eq!(outbound.url, "http://backend/m/OrgA/ProjA/wiki");
        assert_eq!(outbound.method, Method::GET);
        assert!(outbound.headers.get(header::HOST).is_none());
        assert!(outbound.headers.get(header::CONNECTION).is_none());
        assert!(outbound.headers.get(header::CONTENT_LENGTH).is_none());
        assert!(outbound.headers.get(header::ACCEPT_ENCODING).is_none());
        assert_eq!(outbound.headers.get(header::ACCEPT).unwrap(), "text/html");
    }

    #[test]
    fn test_fetch_options() {
        let probe = FetchOptions::probe(Some(Duration::from_secs(60)));
        assert_eq!(probe.redirect, RedirectMode::Follow);
        let mirror = FetchOptions::mirror(None);
        assert_eq!(mirror.redirect, RedirectMode::Manual);
        assert!(mirror.cache_ttl.is_none());
    }

    #[tokio::test]
    async fn test_buffered_response_text() {
        let response =
            TransportResponse::buffered(StatusCode::OK, "https://github.com/a/b/wiki", "héllo")
                .with_header("X-Robots-Tag", "none");
        assert_eq!(response.header("x-robots-tag"), Some("none"));
        assert_eq!(response.text().await.unwrap(), "héllo");
    }
}
