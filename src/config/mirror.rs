//! Mirror and canonical site configuration

use serde::{Deserialize, Serialize};

use crate::edge::freshness::DEFAULT_TIMESTAMP_SELECTOR;

/// Hostnames, routes and markup hooks for the mirror
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Public hostname of the mirror
    pub mirror_host: String,
    /// Path prefix under which the mirror serves canonical paths
    pub mirror_prefix: String,
    /// Hostname of the canonical site
    pub canonical_host: String,
    /// Scheme + host used to rebuild the absolute URL of inbound requests
    pub public_origin: String,
    /// Scheme + host of the mirror's backing store
    pub backend_origin: String,
    /// Route name of the synthesized index page
    pub index_route: String,
    /// Response headers that suppress indexing when present
    pub suppression_headers: Vec<String>,
    /// CSS selector for the element carrying the last-modified datetime
    pub timestamp_selector: String,
    /// The freshness notice is inserted right before this text
    pub notice_marker: String,
}

impl MirrorConfig {
    /// The `<mirror-host><prefix>` token replaced by the URL translator
    pub fn mirror_token(&self) -> String {
        format!("{}{}", self.mirror_host, self.mirror_prefix)
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            mirror_host: "github-wiki-see.page".to_string(),
            mirror_prefix: "/m".to_string(),
            canonical_host: "github.com".to_string(),
            public_origin: "https://github-wiki-see.page".to_string(),
            backend_origin: "http://127.0.0.1:8000".to_string(),
            index_route: "wiki_index".to_string(),
            suppression_headers: vec!["x-robots-tag".to_string()],
            timestamp_selector: DEFAULT_TIMESTAMP_SELECTOR.to_string(),
            notice_marker: "</body>".to_string(),
        }
    }
}
