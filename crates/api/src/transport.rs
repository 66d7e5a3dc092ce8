//! Transport mode selection.
//!
//! Pure functions of the URL string, so mode decisions are testable without
//! a network.

use crate::WorkloadApi;

/// Substring marking a URL that has no live stream behind it.
pub const SNAPSHOT_ONLY_MARKER: &str = "mock-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Live,
    SnapshotOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transport {
    pub mode: TransportMode,
    pub url: String,
}

impl Transport {
    /// URL to hand to the stream subscriber; `None` disables streaming.
    pub fn stream_url(&self) -> Option<&str> {
        match self.mode {
            TransportMode::Live => Some(&self.url),
            TransportMode::SnapshotOnly => None,
        }
    }
}

pub fn classify(url: &str) -> TransportMode {
    if url.contains(SNAPSHOT_ONLY_MARKER) {
        TransportMode::SnapshotOnly
    } else {
        TransportMode::Live
    }
}

fn join(base: &str, suffix: &str) -> String {
    let base = base.trim_end_matches('/');
    if suffix.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base, suffix.trim_start_matches('/'))
}

pub fn resolve(base: &str, suffix: &str) -> Transport {
    let url = join(base, suffix);
    Transport { mode: classify(&url), url }
}

/// Which watch endpoint a subscription wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    List { namespace: &'a str },
    One { namespace: &'a str, name: &'a str },
}

impl Endpoint<'_> {
    pub fn suffix(&self, api: &dyn WorkloadApi) -> String {
        match *self {
            Endpoint::List { namespace } => api.watch_list_path(namespace),
            Endpoint::One { namespace, name } => api.watch_one_path(namespace, name),
        }
    }
}

pub fn resolve_endpoint(base: &str, api: &dyn WorkloadApi, endpoint: Endpoint<'_>) -> Transport {
    resolve(base, &endpoint.suffix(api))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_urls_are_joined_with_one_slash() {
        let t = resolve("http://h:3100/rollouts/", "/api/v1/rollouts/default/info/watch");
        assert_eq!(t.url, "http://h:3100/rollouts/api/v1/rollouts/default/info/watch");
        assert_eq!(t.mode, TransportMode::Live);
        assert_eq!(t.stream_url(), Some(t.url.as_str()));
    }

    #[test]
    fn marker_means_snapshot_only() {
        let t = resolve("", "/mock-stream/web");
        assert_eq!(t.url, "/mock-stream/web");
        assert_eq!(t.mode, TransportMode::SnapshotOnly);
        assert_eq!(t.stream_url(), None);
    }

    #[test]
    fn classify_is_substring_based() {
        assert_eq!(classify("http://x/mock-stream"), TransportMode::SnapshotOnly);
        assert_eq!(classify("http://x/api/v1/rollouts/ns/info/watch"), TransportMode::Live);
    }
}
