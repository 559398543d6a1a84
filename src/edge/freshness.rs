//! Freshness extraction from canonical page markup
//!
//! The canonical site renders "last edited" information as an element with a
//! machine-readable `datetime` attribute. Extraction sits behind
//! [`FreshnessExtractor`] so a markup change only needs a new extractor.

use chrono::{DateTime, NaiveDateTime, Utc};
use scraper::{Html, Selector};
use std::fmt::Debug;
use thiserror::Error;
use tracing::debug;

/// Default marker: `<relative-time datetime="...">`
pub const DEFAULT_TIMESTAMP_SELECTOR: &str = "relative-time[datetime]";

#[derive(Debug, Error)]
pub enum FreshnessError {
    #[error("Invalid timestamp selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Pulls a last-modified timestamp out of an HTML page
pub trait FreshnessExtractor: Send + Sync + Debug {
    /// Best-effort: `None` when no usable timestamp is present
    fn extract(&self, html: &str) -> Option<DateTime<Utc>>;

    fn name(&self) -> &str;
}

/// Reads the `datetime` attribute of the first element matching a selector
#[derive(Debug)]
pub struct DatetimeMarkerExtractor {
    selector: Selector,
}

impl DatetimeMarkerExtractor {
    pub fn new(selector: &str) -> Result<Self, FreshnessError> {
        let parsed = Selector::parse(selector).map_err(|e| FreshnessError::InvalidSelector {
            selector: selector.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { selector: parsed })
    }
}

impl FreshnessExtractor for DatetimeMarkerExtractor {
    fn extract(&self, html: &str) -> Option<DateTime<Utc>> {
        let document = Html::parse_document(html);
        let marker = document.select(&self.selector).next()?;
        let raw = marker.value().attr("datetime")?;
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            debug!("Ignoring unparseable datetime marker: {:?}", raw);
        }
        parsed
    }

    fn name(&self) -> &str {
        "datetime-marker"
    }
}

/// Parse an ISO-8601 timestamp. Zone-less values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }
    None
}
