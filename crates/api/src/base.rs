//! Process-wide base path.
//!
//! Resolved once, lazily, on first use and never torn down. It must not
//! change during the life of the process: every watch URL is built from it.

use once_cell::sync::OnceCell;

use crate::config::{DEFAULT_BASE_URL, ENV_BASE_URL};

static BASE_PATH: OnceCell<String> = OnceCell::new();

pub(crate) fn normalize(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Seed the base path before first use. Returns false if it was already
/// resolved (the first value wins).
pub fn init_base_path(raw: &str) -> bool {
    BASE_PATH.set(normalize(raw)).is_ok()
}

/// Base path without trailing `/`, from `KDASH_BASE_URL` or the default.
pub fn base_path() -> &'static str {
    BASE_PATH.get_or_init(|| {
        let raw = std::env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        normalize(&raw)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_trailing_slashes() {
        assert_eq!(normalize("http://h:1/rollouts/"), "http://h:1/rollouts");
        assert_eq!(normalize(" http://h:1// "), "http://h:1");
        assert_eq!(normalize("/"), "");
    }

    #[test]
    fn first_value_wins() {
        let first = base_path().to_string();
        assert!(!init_base_path("http://elsewhere"));
        assert_eq!(base_path(), first);
    }
}
