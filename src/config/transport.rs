//! Outbound transport configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::DEFAULT_USER_AGENT;

/// Outbound HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// User agent for canonical probes
    pub user_agent: String,
    /// Cache TTL for canonical probes (seconds)
    pub probe_cache_ttl_secs: u64,
    /// Cache TTL for mirror fetches (seconds)
    pub mirror_cache_ttl_secs: u64,
    /// Maximum number of cached responses (0 disables caching)
    pub cache_capacity: usize,
    /// Larger response bodies are served but never cached
    pub max_cached_body_bytes: usize,
    /// Maximum redirects followed while probing
    pub max_redirects: usize,
    /// Overall request timeout (seconds)
    pub timeout_secs: u64,
    /// Connection timeout (seconds)
    pub connect_timeout_secs: u64,
}

impl TransportConfig {
    pub fn probe_cache_ttl(&self) -> Option<Duration> {
        ttl(self.probe_cache_ttl_secs)
    }

    pub fn mirror_cache_ttl(&self) -> Option<Duration> {
        ttl(self.mirror_cache_ttl_secs)
    }
}

fn ttl(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            probe_cache_ttl_secs: 3 * 24 * 60 * 60, // 3 days
            mirror_cache_ttl_secs: 60 * 60,
            cache_capacity: 4096,
            max_cached_body_bytes: 1024 * 1024,
            max_redirects: 10,
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}
