use std::sync::Arc;
use std::time::Instant;

use kdash_api::{ApiResult, WorkloadApi};
use kdash_core::WorkloadInfo;
use metrics::histogram;
use tracing::{info, warn};

use crate::notify::Notifier;

pub const FETCH_ERROR_MESSAGE: &str = "Error fetching workloads";
pub const FETCH_ERROR_FALLBACK: &str = "An unexpected error occurred while fetching workloads.";

/// Single-shot full listing for a namespace. Failures are reported to the
/// notifier and returned; there is no retry here.
#[derive(Clone)]
pub struct SnapshotLoader {
    api: Arc<dyn WorkloadApi>,
    notifier: Arc<dyn Notifier>,
}

impl SnapshotLoader {
    pub fn new(api: Arc<dyn WorkloadApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    pub async fn load(&self, namespace: &str) -> ApiResult<Vec<WorkloadInfo>> {
        let t0 = Instant::now();
        info!(ns = %namespace, "snapshot: request start");
        match self.api.list_workloads(namespace).await {
            Ok(items) => {
                let ms = t0.elapsed().as_secs_f64() * 1000.0;
                histogram!("snapshot_load_ms", ms);
                info!(ns = %namespace, items = items.len(), took_ms = %t0.elapsed().as_millis(), "snapshot: response ok");
                Ok(items)
            }
            Err(e) => {
                warn!(ns = %namespace, error = %e, "snapshot: request failed");
                let text = e.to_string();
                let description = if text.trim().is_empty() { FETCH_ERROR_FALLBACK } else { text.as_str() };
                self.notifier.error(FETCH_ERROR_MESSAGE, description);
                Err(e)
            }
        }
    }
}
