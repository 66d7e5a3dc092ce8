//! kdash API capability.
//!
//! Frontends depend on [`WorkloadApi`] only. Two variants exist: [`HttpApi`]
//! talks to a live dashboard backend, [`SyntheticApi`] serves generated
//! CloneSets from memory. The variant is picked once at composition time
//! ([`Backend::from_config`]) and injected; nothing downstream branches on
//! which one it got.

#![forbid(unsafe_code)]

use std::sync::Arc;

use kdash_core::{NamespaceInfo, WorkloadInfo};
use serde::{Deserialize, Serialize};

pub mod base;
pub mod config;
pub mod http;
pub mod stream;
pub mod synthetic;
pub mod transport;

pub use base::{base_path, init_base_path};
pub use config::ClientConfig;
pub use http::{HttpApi, HttpFrameSource};
pub use stream::{subscribe, CancelHandle, FrameSource, FrameStream};
pub use synthetic::{NoFrames, SyntheticApi};
pub use transport::{classify, resolve, resolve_endpoint, Endpoint, Transport, TransportMode};

/// API errors. Payloads are strings so errors stay `Clone` and can be
/// handed to notifiers and logs freely.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ApiError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("decode: {0}")]
    Decode(String),
    #[error("stream: {0}")]
    Stream(String),
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("invalid_request: {0}")]
    InvalidRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Dashboard API surface shared by the live and synthetic providers.
#[async_trait::async_trait]
pub trait WorkloadApi: Send + Sync {
    /// Full listing for a namespace. An empty namespace means all of them
    /// where the provider supports it; `HttpApi` rejects it with
    /// [`ApiError::InvalidRequest`] since the backend routes are namespaced.
    async fn list_workloads(&self, namespace: &str) -> ApiResult<Vec<WorkloadInfo>>;

    /// Current namespace and the namespaces the backend can show.
    async fn namespace_info(&self) -> ApiResult<NamespaceInfo>;

    /// Path suffix of the list watch endpoint, joined onto the base path.
    fn watch_list_path(&self, namespace: &str) -> String;

    /// Path suffix of the single-workload watch endpoint.
    fn watch_one_path(&self, namespace: &str, name: &str) -> String;
}

/// The selected provider plus the frame source its watch URLs resolve to.
#[derive(Clone)]
pub struct Backend {
    pub api: Arc<dyn WorkloadApi>,
    pub frames: Arc<dyn FrameSource>,
}

impl Backend {
    pub fn from_config(cfg: &ClientConfig) -> ApiResult<Self> {
        if cfg.synthetic {
            tracing::info!("backend: synthetic workloads");
            return Ok(Self { api: Arc::new(SyntheticApi::new()), frames: Arc::new(NoFrames) });
        }
        tracing::info!(base = %cfg.base_url, "backend: live http");
        Ok(Self {
            api: Arc::new(HttpApi::new(cfg)?),
            frames: Arc::new(HttpFrameSource::new(cfg)?),
        })
    }
}
