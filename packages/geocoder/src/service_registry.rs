//! Compile-time registry of geocoding service configurations.
//!
//! Each service is defined in a TOML file under `services/`. The registry
//! embeds these at compile time and exposes them via [`all_services`] and
//! [`service`].

use std::time::Duration;

use serde::Deserialize;

/// Environment variable overriding the Nominatim base URL.
pub const NOMINATIM_URL_ENV: &str = "SURPLUS_NOMINATIM_URL";

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// API base URL, without a trailing endpoint
    /// (e.g., `"https://nominatim.openstreetmap.org"`).
    pub base_url: String,
    /// Minimum delay between requests in milliseconds.
    pub rate_limit_ms: u64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Fixed wait between retries.
    pub retry_wait_seconds: u64,
    /// Per-request timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Entries kept per lookup cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

const fn default_timeout_seconds() -> u64 {
    30
}

const fn default_cache_capacity() -> usize {
    128
}

impl GeocodingService {
    #[must_use]
    pub const fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    #[must_use]
    pub const fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_wait_seconds)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Replaces the base URL with `url` when it is set and non-empty.
    #[must_use]
    pub fn with_base_url_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|url| !url.trim().is_empty()) {
            log::debug!("{}: base url overridden to {url}", self.id);
            self.base_url = url;
        }
        self
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[("nominatim", include_str!("../services/nominatim.toml"))];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 1;

/// Returns all geocoding service configurations.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<GeocodingService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse geocoding service '{name}': {e}"))
        })
        .collect()
}

/// Returns the service with the given `id`.
#[must_use]
pub fn service(id: &str) -> Option<GeocodingService> {
    all_services().into_iter().find(|s| s.id == id)
}

/// Returns the Nominatim configuration with the environment override
/// applied.
///
/// # Panics
///
/// Panics if the embedded Nominatim config is missing.
#[must_use]
pub fn nominatim() -> GeocodingService {
    service("nominatim")
        .unwrap_or_else(|| panic!("Missing embedded 'nominatim' service"))
        .with_base_url_override(std::env::var(NOMINATIM_URL_ENV).ok())
}
