//! Configuration default values
//!
//! All defaults live here so they can be changed in one place.
// Identity defaults
pub const DEFAULT_NAMESPACE: &str = "vodresolve";

// Versioning defaults
pub const DEFAULT_MAX_PER_TIER: u32 = 1;
pub const MIN_MAX_PER_TIER: u32 = 1;
pub const MAX_MAX_PER_TIER: u32 = 10;

// Failover defaults
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 45;
pub const DEFAULT_RESET_WINDOW_SECS: u64 = 120;
pub const DEFAULT_REAP_INTERVAL_SECS: u64 = 300;

// Metadata cache defaults
pub const DEFAULT_CACHE_CAPACITY: usize = 500;
pub const CACHE_EVICTION_PERCENT: usize = 10;

// Upstream defaults
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:7000";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 15;

// Host store defaults
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;

// Artwork retry defaults
pub const DEFAULT_ARTWORK_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_ARTWORK_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_ARTWORK_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_ARTWORK_MAX_DELAY_SECS: u64 = 5;
