//! Mirror <-> canonical URL translation

use crate::config::MirrorConfig;

/// Rewrites URLs between the mirror and the canonical site.
///
/// `https://<mirror-host>/m/OrgA/ProjA/wiki` maps to
/// `https://<canonical-host>/OrgA/ProjA/wiki`; everything after the token
/// (path, query, fragment) is kept verbatim. A URL without the token is
/// returned unchanged.
#[derive(Debug, Clone)]
pub struct UrlTranslator {
    mirror_token: String,
    canonical_host: String,
}

impl UrlTranslator {
    pub fn new(mirror_host: &str, mirror_prefix: &str, canonical_host: &str) -> Self {
        Self {
            mirror_token: format!("{}{}", mirror_host, mirror_prefix),
            canonical_host: canonical_host.to_string(),
        }
    }

    pub fn from_config(config: &MirrorConfig) -> Self {
        Self {
            mirror_token: config.mirror_token(),
            canonical_host: config.canonical_host.clone(),
        }
    }

    /// Mirror URL -> canonical URL
    pub fn to_canonical(&self, mirror_url: &str) -> String {
        mirror_url.replacen(&self.mirror_token, &self.canonical_host, 1)
    }

    /// Canonical URL -> mirror URL
    pub fn to_mirror(&self, canonical_url: &str) -> String {
        canonical_url.replacen(&self.canonical_host, &self.mirror_token, 1)
    }
}
