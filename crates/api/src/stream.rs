//! Stream subscriber: frames in, decoded payloads out, in arrival order.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{Stream, StreamExt};
use metrics::counter;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{ApiError, ApiResult};

/// Raw frames (one JSON document each) as delivered by a transport.
pub type FrameStream = Pin<Box<dyn Stream<Item = ApiResult<String>> + Send>>;

/// Opens long-lived frame streams for a URL.
#[async_trait::async_trait]
pub trait FrameSource: Send + Sync {
    async fn open(&self, url: &str) -> ApiResult<FrameStream>;
}

/// Cancellation handle for one subscription.
///
/// Cancelling stops further callback delivery; the connection itself is
/// closed when the pump task observes the abort. Dropping also cancels.
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl CancelHandle {
    /// Handle with nothing behind it (snapshot-only mode).
    pub fn inert() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)), task: None }
    }

    pub fn is_inert(&self) -> bool {
        self.task.is_none()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(h) = self.task.take() {
            h.abort();
        }
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum FrameError {
    /// The server reported an error inside the stream.
    Remote(String),
    /// Undecodable frame; skipped.
    Malformed(String),
}

/// Decode `{"result": P}`. Blank frames and `null` results are keepalives.
pub(crate) fn decode_frame<P: DeserializeOwned>(raw: &str) -> Result<Option<P>, FrameError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let mut v: Value = serde_json::from_str(raw).map_err(|e| FrameError::Malformed(e.to_string()))?;
    if let Some(err) = v.get("error").filter(|e| !e.is_null()) {
        let msg = err
            .get("message")
            .and_then(|m| m.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| err.to_string());
        return Err(FrameError::Remote(msg));
    }
    match v.get_mut("result").map(Value::take) {
        None => Err(FrameError::Malformed("frame without result".into())),
        Some(Value::Null) => Ok(None),
        Some(result) => serde_json::from_value(result).map(Some).map_err(|e| FrameError::Malformed(e.to_string())),
    }
}

/// Subscribe to `url`, calling `on_event` once per decoded frame in order.
///
/// `url == None` is a no-op returning an inert handle. Connection failures,
/// server-side error frames and end of stream call `on_error` once and stop;
/// there is no reconnect. Must be called inside a tokio runtime.
pub fn subscribe<P, F, E>(source: Arc<dyn FrameSource>, url: Option<&str>, mut on_event: F, mut on_error: E) -> CancelHandle
where
    P: DeserializeOwned + Send + 'static,
    F: FnMut(P) + Send + 'static,
    E: FnMut(ApiError) + Send + 'static,
{
    let Some(url) = url else {
        debug!("stream: no url; inert subscription");
        return CancelHandle::inert();
    };
    let url = url.to_string();
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    let live = move || !flag.load(Ordering::Acquire);

    let task = tokio::spawn(async move {
        let mut frames = match source.open(&url).await {
            Ok(s) => s,
            Err(e) => {
                warn!(url = %url, error = %e, "stream: open failed");
                counter!("watch_stream_errors_total", 1);
                if live() {
                    on_error(e);
                }
                return;
            }
        };
        info!(url = %url, "stream: opened");
        let mut delivered = 0u64;
        let failure = loop {
            let Some(next) = frames.next().await else {
                break ApiError::Stream("stream closed by server".into());
            };
            if !live() {
                return;
            }
            match next {
                Ok(raw) => match decode_frame::<P>(&raw) {
                    Ok(Some(p)) => {
                        on_event(p);
                        delivered += 1;
                    }
                    Ok(None) => {}
                    Err(FrameError::Remote(msg)) => break ApiError::Stream(msg),
                    Err(FrameError::Malformed(e)) => {
                        counter!("watch_frames_malformed_total", 1);
                        warn!(url = %url, error = %e, "stream: skipping malformed frame");
                    }
                },
                Err(e) => break e,
            }
        };
        counter!("watch_stream_errors_total", 1);
        warn!(url = %url, delivered, error = %failure, "stream: ended");
        if live() {
            on_error(failure);
        }
    });
    CancelHandle { cancelled, task: Some(task) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdash_core::WorkloadInfo;

    #[test]
    fn decodes_result_envelope() {
        let got: Option<WorkloadInfo> =
            decode_frame(r#"{"result":{"objectMeta":{"name":"a","namespace":"d","resourceVersion":"1"}}}"#)
                .expect("ok");
        assert_eq!(got.map(|w| w.name().to_string()).as_deref(), Some("a"));
    }

    #[test]
    fn keepalives_and_null_results_are_skipped() {
        assert_eq!(decode_frame::<WorkloadInfo>("  ").expect("ok"), None);
        assert_eq!(decode_frame::<WorkloadInfo>(r#"{"result":null}"#).expect("ok"), None);
    }

    #[test]
    fn error_frame_is_remote_failure() {
        let err = decode_frame::<WorkloadInfo>(r#"{"error":{"code":5,"message":"not found"}}"#).unwrap_err();
        assert_eq!(err, FrameError::Remote("not found".into()));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(decode_frame::<WorkloadInfo>("{oops"), Err(FrameError::Malformed(_))));
        assert!(matches!(decode_frame::<WorkloadInfo>(r#"{"other":1}"#), Err(FrameError::Malformed(_))));
        assert!(matches!(decode_frame::<WorkloadInfo>(r#"{"result":[1,2]}"#), Err(FrameError::Malformed(_))));
    }

    #[test]
    fn inert_handle_has_no_task() {
        let h = CancelHandle::inert();
        assert!(h.is_inert());
        assert!(!h.is_cancelled());
        h.cancel();
    }
}
