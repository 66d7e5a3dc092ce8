//! Error side-channel.

use tracing::error;

/// Receives human-readable failures. Must not block; calling it never
/// changes subscription state.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str, description: &str);
}

/// Default notifier: structured log line at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str, description: &str) {
        error!(%description, "{}", message);
    }
}
