//! Runtime configuration, read from the environment.

use std::time::Duration;

/// Settings for a single enrichment deployment.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Prefer the paid structured KBO API over the public interface.
    pub kbo_api_enabled: bool,
    /// API key for the paid KBO API, required when `kbo_api_enabled`.
    pub kbo_api_key: Option<String>,
    /// Per-request timeout applied to every registry client.
    pub registry_timeout: Duration,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            kbo_api_enabled: false,
            kbo_api_key: None,
            registry_timeout: Duration::from_secs(30),
        }
    }
}

impl EnrichmentConfig {
    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let kbo_api_key = std::env::var("KBO_API_KEY").ok().filter(|k| !k.is_empty());
        let kbo_api_enabled = std::env::var("KBO_API_ENABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
            && kbo_api_key.is_some();
        let registry_timeout = std::env::var("REGISTRY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Self {
            kbo_api_enabled,
            kbo_api_key,
            registry_timeout,
        }
    }
}
