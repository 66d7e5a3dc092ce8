//! Live workload views.
//!
//! A subscription loads a snapshot and opens a watch stream at the same
//! time, folds stream changes into its state as they arrive, and exposes
//! the result as cheap `Arc` snapshots plus a change signal. Failures go to
//! a [`Notifier`]; nothing retries.

#![forbid(unsafe_code)]

use std::sync::Arc;

use kdash_api::{base_path, ApiError, Backend, FrameSource, WorkloadApi};
use kdash_core::{NamespaceInfo, WorkloadInfo};
use tracing::warn;

mod entity;
mod list;
mod notify;
mod publish;
mod snapshot;

pub use entity::{EntityState, EntitySubscription, UpdateCallback, WatchOptions};
pub use list::{ListState, ListSubscription};
pub use notify::{Notifier, TracingNotifier};
pub use snapshot::{SnapshotLoader, FETCH_ERROR_FALLBACK, FETCH_ERROR_MESSAGE};

pub const STREAM_ERROR_MESSAGE: &str = "Watch stream interrupted";

/// What a stream callback hands to a subscription driver.
pub(crate) enum StreamMsg<E> {
    Event(E),
    Failed(ApiError),
}

#[derive(Clone)]
pub(crate) struct Ctx {
    pub(crate) api: Arc<dyn WorkloadApi>,
    pub(crate) frames: Arc<dyn FrameSource>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) base: String,
}

/// Entry point for frontends: owns the injected provider and hands out
/// subscriptions. Cheap to clone.
#[derive(Clone)]
pub struct Dashboard {
    ctx: Ctx,
}

impl Dashboard {
    pub fn new(api: Arc<dyn WorkloadApi>, frames: Arc<dyn FrameSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self { ctx: Ctx { api, frames, notifier, base: base_path().to_string() } }
    }

    pub fn from_backend(backend: Backend, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(backend.api, backend.frames, notifier)
    }

    /// Override the base path watch URLs are resolved against.
    pub fn with_base(mut self, base: &str) -> Self {
        self.ctx.base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn base(&self) -> &str {
        &self.ctx.base
    }

    pub async fn namespaces(&self) -> Result<NamespaceInfo, ApiError> {
        self.ctx.api.namespace_info().await.map_err(|e| {
            warn!(error = %e, "namespaces: request failed");
            e
        })
    }

    /// One-shot listing. Failures are notified and yield an empty list.
    pub async fn list(&self, namespace: &str) -> Vec<WorkloadInfo> {
        self.loader().load(namespace).await.unwrap_or_default()
    }

    /// Live list of every workload in `namespace`. Must be called inside a
    /// tokio runtime.
    pub fn watch_list(&self, namespace: &str) -> ListSubscription {
        ListSubscription::start(self.ctx.clone(), namespace)
    }

    /// Live view of one workload. Must be called inside a tokio runtime.
    pub fn watch_one(&self, namespace: &str, name: &str, opts: WatchOptions) -> EntitySubscription {
        EntitySubscription::start(self.ctx.clone(), namespace, name, opts)
    }

    fn loader(&self) -> SnapshotLoader {
        SnapshotLoader::new(Arc::clone(&self.ctx.api), Arc::clone(&self.ctx.notifier))
    }
}
