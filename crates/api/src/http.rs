//! Live provider over HTTP: JSON snapshots and server-sent-event watches.

use std::time::Instant;

use bytes::BytesMut;
use futures::{stream, StreamExt};
use kdash_core::{NamespaceInfo, WorkloadInfo};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::stream::{FrameSource, FrameStream};
use crate::{ApiError, ApiResult, ClientConfig, WorkloadApi};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WorkloadInfoList {
    rollouts: Option<Vec<WorkloadInfo>>,
}

async fn check(resp: reqwest::Response, what: &str) -> ApiResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(format!("{}: {}", what, body.trim())));
    }
    Err(ApiError::Status { status: status.as_u16(), message: body.trim().to_string() })
}

/// Dashboard backend client.
pub struct HttpApi {
    client: reqwest::Client,
    base: String,
}

impl HttpApi {
    pub fn new(cfg: &ClientConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder().timeout(cfg.request_timeout).build()?;
        Ok(Self { client, base: crate::base::normalize(&cfg.base_url) })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let t0 = Instant::now();
        let url = self.url(path);
        debug!(url = %url, "http: GET");
        let resp = self.client.get(&url).header(ACCEPT, "application/json").send().await?;
        let resp = check(resp, path).await?;
        let out = resp.json::<T>().await?;
        info!(path = %path, took_ms = %t0.elapsed().as_millis(), "http: GET ok");
        Ok(out)
    }
}

#[async_trait::async_trait]
impl WorkloadApi for HttpApi {
    async fn list_workloads(&self, namespace: &str) -> ApiResult<Vec<WorkloadInfo>> {
        if namespace.trim().is_empty() {
            return Err(ApiError::InvalidRequest("namespace is required".into()));
        }
        let list: WorkloadInfoList = self.get_json(&format!("/api/v1/rollouts/{}/info", namespace)).await?;
        Ok(list.rollouts.unwrap_or_default())
    }

    async fn namespace_info(&self) -> ApiResult<NamespaceInfo> {
        self.get_json("/api/v1/namespace").await
    }

    fn watch_list_path(&self, namespace: &str) -> String {
        format!("/api/v1/rollouts/{}/info/watch", namespace)
    }

    fn watch_one_path(&self, namespace: &str, name: &str) -> String {
        format!("/api/v1/rollouts/{}/{}/info/watch", namespace, name)
    }
}

/// Longest line or event body held while waiting for its terminator.
pub const MAX_PENDING_BYTES: usize = 1 << 20;

/// Incremental server-sent-events splitter.
///
/// `data:` lines accumulate until a blank line ends the event; comment
/// lines (`:`) and other fields are ignored. A bare JSON line outside an
/// event is taken as a frame of its own (newline-delimited streams).
#[derive(Default)]
pub struct SseDecoder {
    buf: BytesMut,
    data: String,
}

impl SseDecoder {
    /// Feed a chunk and return the frames it completed. Fails once an
    /// unterminated line or event grows past [`MAX_PENDING_BYTES`]; the
    /// pending state is dropped.
    pub fn push(&mut self, chunk: &[u8]) -> ApiResult<Vec<String>> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf.split_to(pos);
            let _ = self.buf.split_to(1);
            let line = String::from_utf8_lossy(&line);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            self.line(line, &mut out);
        }
        if self.buf.len() > MAX_PENDING_BYTES || self.data.len() > MAX_PENDING_BYTES {
            let pending = self.buf.len().max(self.data.len());
            self.buf.clear();
            self.data.clear();
            return Err(ApiError::Decode(format!("sse: {} pending bytes without terminator", pending)));
        }
        Ok(out)
    }

    /// Flush a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.buf.is_empty() {
            let rest = String::from_utf8_lossy(&self.buf).to_string();
            self.buf.clear();
            let mut out = Vec::new();
            self.line(rest.trim_end_matches('\r'), &mut out);
            if let Some(f) = out.pop() {
                return Some(f);
            }
        }
        self.take_event()
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let mut ev = std::mem::take(&mut self.data);
        if ev.ends_with('\n') {
            ev.pop();
        }
        Some(ev)
    }

    fn line(&mut self, line: &str, out: &mut Vec<String>) {
        if line.starts_with(':') {
            return;
        }
        if line.is_empty() {
            out.extend(self.take_event());
        } else if let Some(rest) = line.strip_prefix("data:") {
            self.data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
            self.data.push('\n');
        } else if self.data.is_empty() && line.trim_start().starts_with('{') {
            out.push(line.to_string());
        }
    }
}

/// Frame source for the live backend.
pub struct HttpFrameSource {
    client: reqwest::Client,
}

impl HttpFrameSource {
    pub fn new(cfg: &ClientConfig) -> ApiResult<Self> {
        // no total timeout: watches are long-lived
        let client = reqwest::Client::builder().connect_timeout(cfg.request_timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl FrameSource for HttpFrameSource {
    async fn open(&self, url: &str) -> ApiResult<FrameStream> {
        let resp = self.client.get(url).header(ACCEPT, "text/event-stream").send().await?;
        let resp = check(resp, url).await?;
        let mut dec = SseDecoder::default();
        let frames = resp
            .bytes_stream()
            .map(Some)
            .chain(stream::once(async { None }))
            .map(move |item| match item {
                Some(Ok(chunk)) => match dec.push(&chunk) {
                    Ok(frames) => frames.into_iter().map(Ok).collect::<Vec<_>>(),
                    Err(e) => vec![Err(e)],
                },
                Some(Err(e)) => vec![Err(ApiError::from(e))],
                None => dec.finish().into_iter().map(Ok).collect(),
            })
            .flat_map(stream::iter);
        Ok(Box::pin(frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_events_across_chunks() {
        let mut d = SseDecoder::default();
        assert!(d.push(b"data: {\"result\":").expect("push").is_empty());
        assert!(d.push(b"1}\n").expect("push").is_empty());
        let got = d.push(b"\ndata: {\"result\":2}\r\n\r\n").expect("push");
        assert_eq!(got, vec!["{\"result\":1}".to_string(), "{\"result\":2}".to_string()]);
    }

    #[test]
    fn multi_line_data_and_comments() {
        let mut d = SseDecoder::default();
        let got = d.push(b": keepalive\nevent: message\ndata: {\"a\":\ndata: 1}\n\n").expect("push");
        assert_eq!(got, vec!["{\"a\":\n1}".to_string()]);
    }

    #[test]
    fn bare_json_lines_are_frames() {
        let mut d = SseDecoder::default();
        let got = d.push(b"{\"result\":1}\n{\"result\":2}\n").expect("push");
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut d = SseDecoder::default();
        assert!(d.push(b"data: {\"result\":3}\n").expect("push").is_empty());
        assert_eq!(d.finish().as_deref(), Some("{\"result\":3}"));
        assert_eq!(d.finish(), None);
    }

    #[test]
    fn unterminated_line_past_cap_is_decode_error() {
        let mut d = SseDecoder::default();
        let big = vec![b'x'; MAX_PENDING_BYTES / 2 + 1];
        assert!(d.push(&big).expect("under cap").is_empty());
        assert!(matches!(d.push(&big), Err(ApiError::Decode(_))));
        // Pending state was dropped; the decoder keeps working.
        assert_eq!(d.push(b"{\"result\":1}\n").expect("push").len(), 1);
    }

    #[test]
    fn oversized_event_body_is_decode_error() {
        let mut d = SseDecoder::default();
        let mut line = b"data: ".to_vec();
        line.extend(vec![b'y'; MAX_PENDING_BYTES]);
        line.extend_from_slice(b"\ndata: z\n");
        assert!(matches!(d.push(&line), Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn empty_namespace_listing_is_rejected() {
        let api = HttpApi::new(&ClientConfig::default()).expect("client");
        let err = api.list_workloads("").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn paths_match_dashboard_routes() {
        let api = HttpApi::new(&ClientConfig::default()).expect("client");
        assert_eq!(api.watch_list_path("default"), "/api/v1/rollouts/default/info/watch");
        assert_eq!(api.url("/api/v1/namespace"), "http://localhost:3100/api/v1/namespace");
    }
}
