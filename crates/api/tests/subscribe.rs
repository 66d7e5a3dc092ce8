#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use kdash_api::{subscribe, ApiError, ApiResult, FrameSource, FrameStream};
use kdash_core::{ChangeEvent, Versioned, WorkloadWatchEvent};
use tokio::sync::mpsc;

/// Replays fixed frames, optionally pausing between them.
struct Scripted {
    frames: Vec<ApiResult<String>>,
    gap: Option<Duration>,
    fail_open: bool,
}

#[async_trait::async_trait]
impl FrameSource for Scripted {
    async fn open(&self, url: &str) -> ApiResult<FrameStream> {
        if self.fail_open {
            return Err(ApiError::Transport(format!("connect refused: {}", url)));
        }
        let frames = self.frames.clone();
        let gap = self.gap;
        Ok(Box::pin(async_stream::stream! {
            for f in frames {
                if let Some(g) = gap { tokio::time::sleep(g).await; }
                yield f;
            }
        }))
    }
}

fn upsert(name: &str, rv: &str) -> ApiResult<String> {
    Ok(serde_json::json!({
        "result": { "type": "MODIFIED", "rolloutInfo": { "objectMeta": { "name": name, "namespace": "default", "resourceVersion": rv } } }
    })
    .to_string())
}

enum Out {
    Event(ChangeEvent<kdash_core::WorkloadInfo>),
    Error(ApiError),
}

fn run(source: Scripted, url: Option<&str>) -> (kdash_api::CancelHandle, mpsc::UnboundedReceiver<Out>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let etx = tx.clone();
    let h = subscribe::<WorkloadWatchEvent, _, _>(
        Arc::new(source),
        url,
        move |ev| {
            let _ = tx.send(Out::Event(ev.into_change()));
        },
        move |e| {
            let _ = etx.send(Out::Error(e));
        },
    );
    (h, rx)
}

#[tokio::test]
async fn delivers_in_order_skips_malformed_and_reports_end() {
    let source = Scripted {
        frames: vec![upsert("a", "1"), Ok("{not json".into()), upsert("b", "1"), Ok(String::new()), upsert("a", "2")],
        gap: None,
        fail_open: false,
    };
    let (_h, mut rx) = run(source, Some("http://test/watch"));
    let mut names = Vec::new();
    let mut errors = Vec::new();
    while let Some(o) = rx.recv().await {
        match o {
            Out::Event(ChangeEvent::Upsert(w)) => names.push(format!("{}@{}", w.name(), w.version().unwrap_or_default())),
            Out::Event(other) => panic!("unexpected {:?}", other),
            Out::Error(e) => errors.push(e),
        }
    }
    assert_eq!(names, vec!["a@1", "b@1", "a@2"]);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ApiError::Stream(_)));
}

#[tokio::test]
async fn error_frame_stops_the_stream() {
    let source = Scripted {
        frames: vec![upsert("a", "1"), Ok(r#"{"error":{"message":"watch expired"}}"#.into()), upsert("b", "1")],
        gap: None,
        fail_open: false,
    };
    let (_h, mut rx) = run(source, Some("http://test/watch"));
    let mut seen = 0;
    let mut last_err = None;
    while let Some(o) = rx.recv().await {
        match o {
            Out::Event(_) => seen += 1,
            Out::Error(e) => last_err = Some(e),
        }
    }
    assert_eq!(seen, 1);
    assert_eq!(last_err, Some(ApiError::Stream("watch expired".into())));
}

#[tokio::test]
async fn open_failure_goes_to_on_error() {
    let source = Scripted { frames: vec![], gap: None, fail_open: true };
    let (_h, mut rx) = run(source, Some("http://down/watch"));
    match rx.recv().await {
        Some(Out::Error(ApiError::Transport(msg))) => assert!(msg.contains("http://down/watch")),
        _ => panic!("expected transport error"),
    }
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn no_url_is_inert() {
    let source = Scripted { frames: vec![upsert("a", "1")], gap: None, fail_open: false };
    let (h, mut rx) = run(source, None);
    assert!(h.is_inert());
    drop(h);
    assert!(rx.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_delivery() {
    let source = Scripted {
        frames: vec![upsert("a", "1"), upsert("b", "1"), upsert("c", "1")],
        gap: Some(Duration::from_millis(100)),
        fail_open: false,
    };
    let (h, mut rx) = run(source, Some("http://test/watch"));
    match rx.recv().await {
        Some(Out::Event(ChangeEvent::Upsert(w))) => assert_eq!(w.name(), "a"),
        _ => panic!("expected first event"),
    }
    h.cancel();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(rx.recv().await.is_none(), "nothing after cancel");
}
