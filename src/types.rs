//! Core types for the edge handler

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Inbound
// ============================================================================

/// A request routed to the edge handler. The handler only reads it.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute public URL of the request (mirror host)
    pub url: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Buffered request body
    pub body: Bytes,
}

impl IncomingRequest {
    /// Create a body-less GET request for a URL
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Route class of a canonical URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Mirror-synthesized index page, never redirected
    Index,
    /// Regular mirrored content page
    Content,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of probing the canonical page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ProbeVerdict {
    /// Canonical page answered 200 without a suppression header
    Indexable,
    /// Canonical page is not indexable; carries a scraped timestamp when one was found
    NotIndexable {
        last_modified: Option<DateTime<Utc>>,
    },
    /// Canonical page redirected to a different account/repository
    Moved { destination_url: String },
}

impl ProbeVerdict {
    /// Verdict used whenever probing fails
    pub fn unknown() -> Self {
        Self::NotIndexable {
            last_modified: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Indexable => "indexable",
            Self::NotIndexable { .. } => "not_indexable",
            Self::Moved { .. } => "moved",
        }
    }
}

impl fmt::Display for ProbeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indexable => f.write_str("indexable"),
            Self::NotIndexable {
                last_modified: Some(ts),
            } => write!(f, "not indexable (last modified {})", ts.to_rfc3339()),
            Self::NotIndexable { last_modified: None } => f.write_str("not indexable"),
            Self::Moved { destination_url } => write!(f, "moved to {}", destination_url),
        }
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// What the composer decided to send back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 308 to the canonical URL
    Redirect,
    /// 308 to the mirror equivalent of a moved repository
    MovedRedirect,
    /// Mirror content without a freshness annotation
    Passthrough,
    /// Mirror content with `Last-Modified` and a freshness notice
    AnnotatedPassthrough,
    /// Index route, mirror content returned untouched
    IndexPassthrough,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redirect => "redirect",
            Self::MovedRedirect => "moved_redirect",
            Self::Passthrough => "passthrough",
            Self::AnnotatedPassthrough => "annotated_passthrough",
            Self::IndexPassthrough => "index_passthrough",
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect | Self::MovedRedirect)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response handed back to the caller
#[derive(Debug, Clone)]
pub struct FinalResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FinalResponse {
    /// 308 Permanent Redirect with an empty body
    pub fn permanent_redirect(location: HeaderValue) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, location);
        Self {
            status: StatusCode::PERMANENT_REDIRECT,
            headers,
            body: Bytes::new(),
        }
    }

    /// Canonical reason phrase for the status code
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    /// `Location` header, if any
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// `Last-Modified` header, if any
    pub fn last_modified(&self) -> Option<&str> {
        self.headers
            .get(header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_permanent_redirect() {
        let response = FinalResponse::permanent_redirect(HeaderValue::from_static(
            "https://github.com/OrgA/ProjA/wiki",
        ));
        assert_eq!(response.status, StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.status_text(), "Permanent Redirect");
        assert_eq!(response.location(), Some("https://github.com/OrgA/ProjA/wiki"));
        assert!(response.body.is_empty());
        assert!(response.last_modified().is_none());
    }

    #[test]
    fn test_verdict_json_shape() {
        let ts = Utc.with_ymd_and_hms(2022, 4, 24, 17, 7, 11).unwrap();
        let verdict = ProbeVerdict::NotIndexable {
            last_modified: Some(ts),
        };
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["verdict"], "not_indexable");
        assert_eq!(json["last_modified"], "2022-04-24T17:07:11Z");

        let moved = ProbeVerdict::Moved {
            destination_url: "https://github.com/OrgB/ProjB/wiki".to_string(),
        };
        assert_eq!(moved.kind(), "moved");
        assert_eq!(moved.to_string(), "moved to https://github.com/OrgB/ProjB/wiki");
    }

    #[test]
    fn test_unknown_verdict_has_no_timestamp() {
        assert_eq!(
            ProbeVerdict::unknown(),
            ProbeVerdict::NotIndexable {
                last_modified: None
            }
        );
    }
}
