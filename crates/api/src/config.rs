//! Client configuration from the environment.

use std::time::Duration;

pub const ENV_BASE_URL: &str = "KDASH_BASE_URL";
pub const ENV_SYNTHETIC: &str = "KDASH_SYNTHETIC";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "KDASH_REQUEST_TIMEOUT_SECS";
pub const ENV_WATCH_TIMEOUT_MS: &str = "KDASH_WATCH_TIMEOUT_MS";

pub const DEFAULT_BASE_URL: &str = "http://localhost:3100";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub synthetic: bool,
    /// Applies to snapshot requests only; streams have no total timeout.
    pub request_timeout: Duration,
    /// Optional cap on how long a single-workload watch reports loading.
    pub watch_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            synthetic: false,
            request_timeout: Duration::from_secs(10),
            watch_timeout: None,
        }
    }
}

fn env_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(url) = get(ENV_BASE_URL) {
            cfg.base_url = crate::base::normalize(&url);
        }
        cfg.synthetic = get(ENV_SYNTHETIC).map(|v| env_flag(&v)).unwrap_or(false);
        if let Some(secs) = get(ENV_REQUEST_TIMEOUT_SECS).and_then(|s| s.parse::<u64>().ok()) {
            cfg.request_timeout = Duration::from_secs(secs.max(1));
        }
        cfg.watch_timeout = get(ENV_WATCH_TIMEOUT_MS)
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        cfg
    }
}
