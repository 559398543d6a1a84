//! Indexability probe and redirect decision engine
//!
//! For each mirrored request the engine decides whether to send the visitor
//! (and crawlers) to the canonical page, or to serve the mirror's own copy:
//! - `UrlTranslator`: mirror URL <-> canonical URL
//! - `classify`: detects the synthesized index route
//! - `OriginProber`: indexable / not indexable / moved
//! - `FreshnessExtractor`: last-modified timestamp from canonical markup
//! - `MirrorFetcher`: the mirror backing store's response
//! - `ResponseComposer`: redirect or (annotated) passthrough
//! - `EdgeHandler`: runs the above for one request

pub mod classifier;
pub mod composer;
pub mod freshness;
pub mod handler;
pub mod mirror;
pub mod prober;
pub mod translator;

pub use classifier::classify;
pub use composer::{Composition, ResponseComposer};
pub use freshness::{DatetimeMarkerExtractor, FreshnessExtractor};
pub use handler::EdgeHandler;
pub use mirror::MirrorFetcher;
pub use prober::{OriginProber, ProbeError};
pub use translator::UrlTranslator;

use thiserror::Error;

use crate::transport::TransportError;

/// Failures that reach the requester
#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("Mirror fetch failed: {0}")]
    MirrorFetch(#[source] TransportError),
    #[error("Mirror fetch task failed: {0}")]
    MirrorTask(String),
    #[error("Invalid response header: {0}")]
    InvalidHeader(String),
}
