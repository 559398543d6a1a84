//! Indexable redirect: edge handler for a mirror site
//!
//! For every mirrored page the handler checks, per request and without
//! persistent state, whether the canonical page can be indexed by search
//! engines:
//! - indexable: permanent redirect to the canonical page
//! - moved: permanent redirect to the mirror copy of the new location
//! - otherwise: the mirror's own content, annotated with a last-modified
//!   timestamp scraped from the canonical page when one is available

pub mod config;
pub mod edge;
pub mod http;
pub mod metrics;
pub mod transport;
pub mod types;

pub use config::Config;
pub use types::*;
