//! Configuration for the edge handler

mod http;
mod logging;
mod mirror;
mod transport;

pub use http::{HttpConfig, MetricsConfig};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use mirror::MirrorConfig;
pub use transport::TransportConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Default user agent for outbound probes
pub const DEFAULT_USER_AGENT: &str =
    "IndexableRedirect/0.1 (+https://github-wiki-see.page)";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Mirror and canonical site settings
    #[serde(default)]
    pub mirror: MirrorConfig,
    /// Outbound transport settings
    #[serde(default)]
    pub transport: TransportConfig,
    /// Inbound HTTP server settings
    #[serde(default)]
    pub http: HttpConfig,
    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Validate all configuration fields.
    ///
    /// Collects every problem and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Mirror validation
        let mirror = &self.mirror;
        if mirror.mirror_host.is_empty() {
            errors.push("mirror_host must not be empty".to_string());
        }
        if mirror.canonical_host.is_empty() {
            errors.push("canonical_host must not be empty".to_string());
        }
        if !mirror.mirror_prefix.starts_with('/') {
            errors.push(format!(
                "mirror_prefix must start with '/', got '{}'",
                mirror.mirror_prefix
            ));
        }
        if mirror.index_route.is_empty() || mirror.index_route.contains('/') {
            errors.push("index_route must be a single non-empty path segment".to_string());
        }
        for (name, origin) in [
            ("public_origin", &mirror.public_origin),
            ("backend_origin", &mirror.backend_origin),
        ] {
            match url::Url::parse(origin) {
                Ok(url) if url.has_host() => {}
                Ok(_) => errors.push(format!("{} must include a host, got '{}'", name, origin)),
                Err(e) => errors.push(format!("{} is not a valid URL ({}): '{}'", name, e, origin)),
            }
        }
        if scraper::Selector::parse(&mirror.timestamp_selector).is_err() {
            errors.push(format!(
                "timestamp_selector is not a valid CSS selector: '{}'",
                mirror.timestamp_selector
            ));
        }
        if mirror.notice_marker.is_empty() {
            errors.push("notice_marker must not be empty".to_string());
        }

        // Transport validation
        let transport = &self.transport;
        if transport.probe_cache_ttl_secs < transport.mirror_cache_ttl_secs {
            errors.push(format!(
                "probe_cache_ttl_secs ({}) must be >= mirror_cache_ttl_secs ({})",
                transport.probe_cache_ttl_secs, transport.mirror_cache_ttl_secs
            ));
        }
        if transport.max_redirects == 0 {
            errors.push("max_redirects must be positive".to_string());
        }
        if transport.timeout_secs == 0 {
            errors.push("timeout_secs must be positive".to_string());
        }
        if transport.user_agent.is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }

        // HTTP validation
        if self.http.listen_addr.parse::<SocketAddr>().is_err() {
            errors.push(format!(
                "HTTP listen address must be host:port, got '{}'",
                self.http.listen_addr
            ));
        }
        if self.http.max_body_bytes == 0 {
            errors.push("max_body_bytes must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn default_config_passes_validation() {
        let cfg = valid_config();
        assert!(cfg.validate().is_ok(), "default config should be valid");
    }

    #[test]
    fn validate_rejects_probe_ttl_shorter_than_mirror_ttl() {
        let mut cfg = valid_config();
        cfg.transport.probe_cache_ttl_secs = 10;
        cfg.transport.mirror_cache_ttl_secs = 60;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("probe_cache_ttl_secs"), "got: {}", err);
    }

    #[test]
    fn validate_rejects_prefix_without_slash() {
        let mut cfg = valid_config();
        cfg.mirror.mirror_prefix = "m".to_string();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("mirror_prefix"), "got: {}", err);
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut cfg = valid_config();
        cfg.mirror.timestamp_selector = "relative-time[".to_string();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("timestamp_selector"), "got: {}", err);
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let mut cfg = valid_config();
        cfg.mirror.mirror_host = String::new();
        cfg.http.listen_addr = "not-an-addr".to_string();
        cfg.mirror.backend_origin = "nope".to_string();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("mirror_host"), "got: {}", err);
        assert!(err.contains("listen address"), "got: {}", err);
        assert!(err.contains("backend_origin"), "got: {}", err);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [mirror]
            backend_origin = "https://backend.example"

            [transport]
            mirror_cache_ttl_secs = 120
            "#,
        )
        .unwrap();
        assert_eq!(cfg.mirror.backend_origin, "https://backend.example");
        assert_eq!(cfg.mirror.canonical_host, "github.com");
        assert_eq!(cfg.transport.mirror_cache_ttl_secs, 120);
        assert_eq!(cfg.transport.probe_cache_ttl_secs, 3 * 24 * 60 * 60);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_round_trips_through_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = valid_config();
        std::fs::write(&path, cfg.to_toml().unwrap()).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.mirror.mirror_token(), "github-wiki-see.page/m");
        assert_eq!(loaded.http.listen_addr, cfg.http.listen_addr);
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(cfg.mirror.index_route, "wiki_index");
    }
}
