use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::duration;

use crate::errors::{AppError, AppResult};
use crate::models::{ContentKind, FallbackPreference, QualityTag};
use crate::utils::retry::RetryPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub versions: VersionsConfig,
    #[serde(default)]
    pub failover: FailoverConfig,
    #[serde(default)]
    pub metadata_cache: MetadataCacheConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default = "default_artwork_retry")]
    pub artwork_retry: RetryPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Namespace for identities and the playback URL scheme
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// Quality versions created per catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionsConfig {
    /// Ordered tiers; empty means a single clean item
    #[serde(default)]
    pub enabled_tiers: Vec<QualityTag>,
    /// Versions per tier, clamped to [1, 10]
    #[serde(default = "default_max_per_tier")]
    pub max_per_tier: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverConfig {
    #[serde(default = "default_true")]
    pub movies_enabled: bool,
    #[serde(default = "default_true")]
    pub series_enabled: bool,
    /// Same candidate is served while this window is open
    #[serde(default = "default_grace_period", with = "duration")]
    pub grace_period: Duration,
    /// Idle time after which the last candidate is assumed to have worked.
    /// Must be longer than `grace_period`.
    #[serde(default = "default_reset_window", with = "duration")]
    pub reset_window: Duration,
    /// How often stale failover entries are dropped
    #[serde(default = "default_reap_interval", with = "duration")]
    pub reap_interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataCacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    #[serde(default = "default_upstream_timeout", with = "duration")]
    pub timeout: Duration,
    #[serde(default)]
    pub fallback_preference: FallbackPreference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_timeout", with = "duration")]
    pub timeout: Duration,
}

fn default_true() -> bool {
    true
}
fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}
fn default_max_per_tier() -> u32 {
    DEFAULT_MAX_PER_TIER
}
fn default_grace_period() -> Duration {
    Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS)
}
fn default_reset_window() -> Duration {
    Duration::from_secs(DEFAULT_RESET_WINDOW_SECS)
}
fn default_reap_interval() -> Duration {
    Duration::from_secs(DEFAULT_REAP_INTERVAL_SECS)
}
fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}
fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}
fn default_upstream_timeout() -> Duration {
    Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS)
}
fn default_store_timeout() -> Duration {
    Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS)
}
fn default_artwork_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: DEFAULT_ARTWORK_MAX_ATTEMPTS,
        base_delay: Duration::from_millis(DEFAULT_ARTWORK_BASE_DELAY_MS),
        multiplier: DEFAULT_ARTWORK_MULTIPLIER,
        max_delay: Duration::from_secs(DEFAULT_ARTWORK_MAX_DELAY_SECS),
        jitter: true,
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

impl Default for VersionsConfig {
    fn default() -> Self {
        Self {
            enabled_tiers: Vec::new(),
            max_per_tier: default_max_per_tier(),
        }
    }
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            movies_enabled: true,
            series_enabled: true,
            grace_period: default_grace_period(),
            reset_window: default_reset_window(),
            reap_interval: default_reap_interval(),
        }
    }
}

impl Default for MetadataCacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            timeout: default_upstream_timeout(),
            fallback_preference: FallbackPreference::Auto,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout: default_store_timeout(),
        }
    }
}

impl VersionsConfig {
    /// `max_per_tier` clamped into [1, 10]
    pub fn effective_max_per_tier(&self) -> u32 {
        let clamped = self.max_per_tier.clamp(MIN_MAX_PER_TIER, MAX_MAX_PER_TIER);
        if clamped != self.max_per_tier {
            warn!(
                "versions.max_per_tier = {} is outside [{}, {}], using {}",
                self.max_per_tier, MIN_MAX_PER_TIER, MAX_MAX_PER_TIER, clamped
            );
        }
        clamped
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.enabled_tiers.iter().any(QualityTag::is_clean) {
            return Err(AppError::invariant(
                "versions.enabled_tiers must not contain the empty (clean) tag",
            ));
        }
        Ok(())
    }
}

impl FailoverConfig {
    pub fn enabled_for(&self, kind: ContentKind) -> bool {
        match kind {
            ContentKind::Movie => self.movies_enabled,
            ContentKind::Series => self.series_enabled,
        }
    }

    /// The grace period must end before the reset window
    pub fn validate(&self) -> AppResult<()> {
        if self.grace_period >= self.reset_window {
            return Err(AppError::invariant(format!(
                "failover.grace_period ({:?}) must be shorter than failover.reset_window ({:?})",
                self.grace_period, self.reset_window
            )));
        }
        if self.reap_interval.is_zero() {
            return Err(AppError::invariant("failover.reap_interval must be non-zero"));
        }
        Ok(())
    }
}

impl Config {
    /// Check every section; the first violation wins
    pub fn validate(&self) -> AppResult<()> {
        validate_namespace(&self.identity.namespace)?;
        self.versions.validate()?;
        self.failover.validate()?;

        if self.metadata_cache.capacity == 0 {
            return Err(AppError::invariant("metadata_cache.capacity must be at least 1"));
        }
        if self.upstream.timeout.is_zero() || self.store.timeout.is_zero() {
            return Err(AppError::invariant("upstream.timeout and store.timeout must be non-zero"));
        }
        url::Url::parse(&self.upstream.base_url).map_err(|e| {
            AppError::invariant(format!(
                "upstream.base_url '{}' is not a URL: {e}",
                self.upstream.base_url
            ))
        })?;
        if self.artwork_retry.max_attempts == 0 {
            return Err(AppError::invariant("artwork_retry.max_attempts must be at least 1"));
        }
        if self.artwork_retry.multiplier < 1.0 {
            return Err(AppError::invariant("artwork_retry.multiplier must be >= 1.0"));
        }
        Ok(())
    }

    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("VOD_RESOLVE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    /// Load and validate; a missing file is created with defaults
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let config = if Path::new(config_file).exists() {
            let contents = std::fs::read_to_string(config_file)
                .with_context(|| format!("reading {config_file}"))?;
            Self::from_toml(&contents).with_context(|| format!("parsing {config_file}"))?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            default_config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> AppResult<Self> {
        toml::from_str(contents).map_err(|e| AppError::configuration(e.to_string()))
    }
}

/// The namespace doubles as a URL scheme
fn validate_namespace(namespace: &str) -> AppResult<()> {
    let mut chars = namespace.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+-.".contains(c));
    if valid {
        Ok(())
    } else {
        Err(AppError::invariant(format!(
            "identity.namespace '{namespace}' must be a lowercase URL scheme"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.failover.grace_period, Duration::from_secs(45));
        assert_eq!(config.failover.reset_window, Duration::from_secs(120));
        assert_eq!(config.metadata_cache.capacity, 500);
        assert!(config.versions.enabled_tiers.is_empty());
    }

    #[test]
    fn test_parse_full_file() {
        let config = Config::from_toml(
            r#"
            [identity]
            namespace = "jfx"

            [versions]
            enabled_tiers = ["4K", "1080p"]
            max_per_tier = 2

            [failover]
            series_enabled = false
            grace_period = "30s"
            reset_window = "3m"

            [upstream]
            base_url = "https://streams.example.org/manifest"
            fallback_preference = "1080p"

            [artwork_retry]
            max_attempts = 4
            base_delay = "250ms"
            multiplier = 1.5
            max_delay = "2s"
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.versions.enabled_tiers, vec![QualityTag::Uhd4k, QualityTag::FullHd]);
        assert!(!config.failover.enabled_for(ContentKind::Series));
        assert!(config.failover.enabled_for(ContentKind::Movie));
        assert_eq!(config.failover.reset_window, Duration::from_secs(180));
        assert_eq!(config.artwork_retry.base_delay, Duration::from_millis(250));
        assert_eq!(config.store.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_grace_must_be_shorter_than_reset() {
        let mut config = Config::default();
        config.failover.grace_period = Duration::from_secs(120);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation { .. }));
    }

    #[test]
    fn test_max_per_tier_is_clamped() {
        let mut versions = VersionsConfig {
            enabled_tiers: vec![QualityTag::FullHd],
            max_per_tier: 0,
        };
        assert_eq!(versions.effective_max_per_tier(), 1);

        versions.max_per_tier = 25;
        assert_eq!(versions.effective_max_per_tier(), 10);
    }

    #[test]
    fn test_rejects_clean_tier_and_bad_namespace() {
        let mut config = Config::default();
        config.versions.enabled_tiers = vec![QualityTag::Clean];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.identity.namespace = "Not A Scheme".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_tier_label() {
        let parsed = Config::from_toml(
            r#"
            [versions]
            enabled_tiers = ["8K"]
            "#,
        );
        assert!(matches!(parsed, Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let config = Config::load_from_file(path).unwrap();
        assert_eq!(config.identity.namespace, DEFAULT_NAMESPACE);

        let reloaded = Config::load_from_file(path).unwrap();
        assert_eq!(reloaded.failover.grace_period, config.failover.grace_period);
    }
}
