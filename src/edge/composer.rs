//! Final response composition
//!
//! Priority order:
//! 1. Index route: mirror response, untouched
//! 2. Moved: 308 to the mirror equivalent of the new location
//! 3. Indexable: 308 to the canonical URL
//! 4. Otherwise: mirror response, annotated when a timestamp is known
//!
//! The mirror response is only awaited for branches 1 and 4.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::future::Future;
use tracing::{debug, warn};

use super::translator::UrlTranslator;
use super::EdgeError;
use crate::transport::{strip_hop_by_hop, TransportResponse};
use crate::types::{FinalResponse, Outcome, ProbeVerdict, Route};

/// A composed response and the branch that produced it
#[derive(Debug)]
pub struct Composition {
    pub response: FinalResponse,
    pub outcome: Outcome,
}

/// Builds the outbound response from a verdict and the mirror response
#[derive(Debug, Clone)]
pub struct ResponseComposer {
    translator: UrlTranslator,
    notice_marker: String,
}

impl ResponseComposer {
    pub fn new(translator: UrlTranslator, notice_marker: impl Into<String>) -> Self {
        Self {
            translator,
            notice_marker: notice_marker.into(),
        }
    }

    /// Compose the final response.
    ///
    /// `verdict` is `None` only for the index route, which is never probed.
    pub async fn compose<F>(
        &self,
        route: Route,
        verdict: Option<&ProbeVerdict>,
        canonical_url: &str,
        mirror: F,
    ) -> Result<Composition, EdgeError>
    where
        F: Future<Output = Result<TransportResponse, EdgeError>>,
    {
        if route == Route::Index {
            let response = self.passthrough(mirror.await?, None).await?;
            return Ok(Composition {
                response,
                outcome: Outcome::IndexPassthrough,
            });
        }

        match verdict {
            Some(ProbeVerdict::Moved { destination_url }) => Ok(Composition {
                response: redirect(&self.translator.to_mirror(destination_url))?,
                outcome: Outcome::MovedRedirect,
            }),
            Some(ProbeVerdict::Indexable) => Ok(Composition {
                response: redirect(canonical_url)?,
                outcome: Outcome::Redirect,
            }),
            Some(ProbeVerdict::NotIndexable { last_modified }) => {
                let response = self.passthrough(mirror.await?, *last_modified).await?;
                let outcome = if last_modified.is_some() {
                    Outcome::AnnotatedPassthrough
                } else {
                    Outcome::Passthrough
                };
                Ok(Composition { response, outcome })
            }
            None => Ok(Composition {
                response: self.passthrough(mirror.await?, None).await?,
                outcome: Outcome::Passthrough,
            }),
        }
    }

    /// Copy the mirror response, setting or clearing `Last-Modified`
    async fn passthrough(
        &self,
        mirror: TransportResponse,
        last_modified: Option<DateTime<Utc>>,
    ) -> Result<FinalResponse, EdgeError> {
        if mirror.status == StatusCode::PERMANENT_REDIRECT {
            warn!(
                "Redirected unindexable: {}",
                mirror.header(header::LOCATION.as_str()).unwrap_or_default()
            );
        }

        let TransportResponse {
            status,
            mut headers,
            body,
            ..
        } = mirror;
        strip_hop_by_hop(&mut headers);
        let mut body = body.bytes().await.map_err(EdgeError::MirrorFetch)?;

        match last_modified {
            Some(ts) => {
                let value = HeaderValue::from_str(&http_date(ts))
                    .map_err(|e| EdgeError::InvalidHeader(e.to_string()))?;
                headers.insert(header::LAST_MODIFIED, value);
                if is_encoded(&headers) {
                    debug!("Skipping freshness notice for encoded body");
                } else if is_html(&headers) {
                    body = annotate(body, &freshness_notice(ts), &self.notice_marker);
                } else {
                    debug!("Skipping freshness notice for non-HTML body");
                }
            }
            // Never vouch for a freshness value we did not verify
            None => {
                headers.remove(header::LAST_MODIFIED);
            }
        }

        Ok(FinalResponse {
            status,
            headers,
            body,
        })
    }
}

fn redirect(location: &str) -> Result<FinalResponse, EdgeError> {
    let value =
        HeaderValue::from_str(location).map_err(|e| EdgeError::InvalidHeader(e.to_string()))?;
    Ok(FinalResponse::permanent_redirect(value))
}

/// RFC 1123 rendering used by HTTP date headers
pub fn http_date(ts: DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Human-readable freshness notice
pub fn freshness_notice(ts: DateTime<Utc>) -> String {
    format!(
        r#"<p class="last-modified-notice">Last Modified: {}</p>"#,
        ts.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Insert `notice` right before the first `marker`, or append it
pub fn inject_notice(html: &str, notice: &str, marker: &str) -> String {
    let mut out = String::with_capacity(html.len() + notice.len());
    match html.find(marker) {
        Some(pos) => {
            out.push_str(&html[..pos]);
            out.push_str(notice);
            out.push_str(&html[pos..]);
        }
        None => {
            out.push_str(html);
            out.push_str(notice);
        }
    }
    out
}

fn annotate(body: Bytes, notice: &str, marker: &str) -> Bytes {
    match std::str::from_utf8(&body) {
        Ok(html) => Bytes::from(inject_notice(html, notice, marker)),
        Err(_) => {
            debug!("Skipping freshness notice for non-UTF-8 body");
            body
        }
    }
}

/// A body still under a content coding cannot be spliced as text
fn is_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|coding| !coding.trim().eq_ignore_ascii_case("identity"))
}

/// Missing content types are treated as HTML
fn is_html(headers: &HeaderMap) -> bool {
    match headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        Some(content_type) => content_type.to_ascii_lowercase().contains("text/html"),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CANONICAL: &str = "https://github.com/OrgA/ProjA/wiki";
    const PAGE: &str = "<html><body><h1>Wiki</h1></body></html>";

    fn composer() -> ResponseComposer {
        ResponseComposer::new(
            UrlTranslator::new("github-wiki-see.page", "/m", "github.com"),
            "</body>",
        )
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 4, 24, 17, 7, 11).unwrap()
    }

    fn mirror_page() -> TransportResponse {
        TransportResponse::buffered(
            StatusCode::OK,
            "http://backend/m/OrgA/ProjA/wiki",
            PAGE,
        )
        .with_header("content-type", "text/html; charset=utf-8")
        .with_header("last-modified", "Mon, 01 Jan 2001 00:00:00 GMT")
        .with_header("transfer-encoding", "chunked")
    }

    async fn never_awaited() -> Result<TransportResponse, EdgeError> {
        panic!("mirror response must not be awaited")
    }

    #[tokio::test]
    async fn test_indexable_redirects_to_canonical() {
        let composed = composer()
            .compose(Route::Content, Some(&ProbeVerdict::Indexable), CANONICAL, never_awaited())
            .await
            .unwrap();
        assert_eq!(composed.outcome, Outcome::Redirect);
        assert_eq!(composed.response.status, StatusCode::PERMANENT_REDIRECT);
        assert_eq!(composed.response.location(), Some(CANONICAL));
        assert!(composed.response.body.is_empty());
    }

    #[tokio::test]
    async fn test_moved_redirects_to_mirror_destination() {
        let verdict = ProbeVerdict::Moved {
            destination_url: "https://github.com/OrgB/ProjB/wiki".to_string(),
        };
        let composed = composer()
            .compose(Route::Content, Some(&verdict), CANONICAL, never_awaited())
            .await
            .unwrap();
        assert_eq!(composed.outcome, Outcome::MovedRedirect);
        assert_eq!(
            composed.response.location(),
            Some("https://github-wiki-see.page/m/OrgB/ProjB/wiki")
        );
    }

    #[tokio::test]
    async fn test_annotated_passthrough() {
        let verdict = ProbeVerdict::NotIndexable {
            last_modified: Some(timestamp()),
        };
        let composed = composer()
            .compose(Route::Content, Some(&verdict), CANONICAL, async {
                Ok::<_, EdgeError>(mirror_page())
            })
            .await
            .unwrap();
        assert_eq!(composed.outcome, Outcome::AnnotatedPassthrough);

        let response = composed.response;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.last_modified(), Some("Sun, 24 Apr 2022 17:07:11 GMT"));
        assert!(response.headers.get("transfer-encoding").is_none());
        let body = String::from_utf8(response.body.to_vec()).unwrap();
        assert_eq!(
            body,
            concat!(
                "<html><body><h1>Wiki</h1>",
                "<p class=\"last-modified-notice\">Last Modified: 2022-04-24 17:07:11 UTC</p>",
                "</body></html>"
            )
        );
    }

    #[tokio::test]
    async fn test_encoded_body_keeps_header_but_not_notice() {
        let verdict = ProbeVerdict::NotIndexable {
            last_modified: Some(timestamp()),
        };
        let encoded = mirror_page().with_header("content-encoding", "zstd");
        let composed = composer()
            .compose(Route::Content, Some(&verdict), CANONICAL, async {
                Ok::<_, EdgeError>(encoded)
            })
            .await
            .unwrap();

        let response = composed.response;
        assert_eq!(response.last_modified(), Some("Sun, 24 Apr 2022 17:07:11 GMT"));
        assert_eq!(response.headers.get("content-encoding").unwrap(), "zstd");
        assert_eq!(response.body, Bytes::from_static(PAGE.as_bytes()));
    }

    #[tokio::test]
    async fn test_plain_passthrough_clears_last_modified() {
        let verdict = ProbeVerdict::unknown();
        let composed = composer()
            .compose(Route::Content, Some(&verdict), CANONICAL, async {
                Ok::<_, EdgeError>(mirror_page())
            })
            .await
            .unwrap();
        assert_eq!(composed.outcome, Outcome::Passthrough);
        assert!(composed.response.last_modified().is_none());
        assert_eq!(composed.response.body, Bytes::from_static(PAGE.as_bytes()));
        assert_eq!(
            composed.response.headers.get("content-type").unwrap(),
            "text/html; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_index_route_is_untouched() {
        let composed = composer()
            .compose(Route::Index, None, "https://github.com/OrgA/ProjA/wiki_index", async {
                Ok::<_, EdgeError>(mirror_page())
            })
            .await
            .unwrap();
        assert_eq!(composed.outcome, Outcome::IndexPassthrough);
        assert_eq!(composed.response.status, StatusCode::OK);
        assert!(composed.response.last_modified().is_none());
        assert_eq!(composed.response.body, Bytes::from_static(PAGE.as_bytes()));
    }

    #[tokio::test]
    async fn test_mirror_failure_propagates() {
        let verdict = ProbeVerdict::unknown();
        let result = composer()
            .compose(Route::Content, Some(&verdict), CANONICAL, async {
                Err::<TransportResponse, _>(EdgeError::MirrorTask("boom".to_string()))
            })
            .await;
        assert!(matches!(result, Err(EdgeError::MirrorTask(_))));
    }

    #[tokio::test]
    async fn test_non_html_gets_header_only() {
        let verdict = ProbeVerdict::NotIndexable {
            last_modified: Some(timestamp()),
        };
        let composed = composer()
            .compose(Route::Content, Some(&verdict), CANONICAL, async {
                Ok::<_, EdgeError>(
                    TransportResponse::buffered(StatusCode::OK, "http://backend/x", "{}")
                        .with_header("content-type", "application/json"),
                )
            })
            .await
            .unwrap();
        assert_eq!(composed.response.body, Bytes::from_static(b"{}"));
        assert_eq!(
            composed.response.last_modified(),
            Some("Sun, 24 Apr 2022 17:07:11 GMT")
        );
    }

    #[test]
    fn test_inject_notice_without_marker_appends() {
        assert_eq!(inject_notice("<p>hi</p>", "<p>n</p>", "</body>"), "<p>hi</p><p>n</p>");
        assert_eq!(
            inject_notice("<body>a</body></body>", "N", "</body>"),
            "<body>aN</body></body>"
        );
    }

    #[test]
    fn test_http_date() {
        assert_eq!(http_date(timestamp()), "Sun, 24 Apr 2022 17:07:11 GMT");
        let early = Utc.with_ymd_and_hms(2021, 3, 5, 1, 2, 3).unwrap();
        assert_eq!(http_date(early), "Fri, 05 Mar 2021 01:02:03 GMT");
    }
}
