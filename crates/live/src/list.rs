use std::sync::Arc;

use kdash_api::{resolve_endpoint, subscribe, ApiError, CancelHandle, Endpoint, TransportMode};
use kdash_core::{ChangeEvent, WorkloadInfo, WorkloadWatchEvent};
use kdash_store::{Collection, ListReconciler};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::publish::{Publisher, Reader};
use crate::snapshot::SnapshotLoader;
use crate::{Ctx, StreamMsg, STREAM_ERROR_MESSAGE};

/// Observable value of a list subscription.
#[derive(Debug, Clone)]
pub struct ListState {
    pub items: Collection<WorkloadInfo>,
    pub loading: bool,
}

impl ListState {
    fn initial() -> Self {
        Self { items: Arc::new(Vec::new()), loading: true }
    }
}

/// Live view of every workload in a namespace.
///
/// Owns at most one stream handle and one driver task. Dropping it tears
/// both down.
pub struct ListSubscription {
    ctx: Ctx,
    namespace: String,
    mode: TransportMode,
    reader: Reader<ListState>,
    stream: Option<CancelHandle>,
    driver: Option<JoinHandle<()>>,
}

impl ListSubscription {
    pub(crate) fn start(ctx: Ctx, namespace: &str) -> Self {
        let transport = resolve_endpoint(&ctx.base, ctx.api.as_ref(), Endpoint::List { namespace });
        info!(ns = %namespace, url = %transport.url, mode = ?transport.mode, "watch_list: starting snapshot + watch");
        let (publisher, reader) = Publisher::new(ListState::initial());
        let (tx, rx) = mpsc::unbounded_channel();
        let err_tx = tx.clone();
        let stream = subscribe::<WorkloadWatchEvent, _, _>(
            Arc::clone(&ctx.frames),
            transport.stream_url(),
            move |ev| {
                let _ = tx.send(StreamMsg::Event(ev.into_change()));
            },
            move |e| {
                let _ = err_tx.send(StreamMsg::Failed(e));
            },
        );
        let loader = SnapshotLoader::new(Arc::clone(&ctx.api), Arc::clone(&ctx.notifier));
        let driver = tokio::spawn(drive(ctx.clone(), loader, namespace.to_string(), rx, publisher));
        Self {
            ctx,
            namespace: namespace.to_string(),
            mode: transport.mode,
            reader,
            stream: Some(stream),
            driver: Some(driver),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn state(&self) -> Arc<ListState> {
        self.reader.current()
    }

    pub fn items(&self) -> Collection<WorkloadInfo> {
        Arc::clone(&self.reader.current().items)
    }

    pub fn loading(&self) -> bool {
        self.reader.current().loading
    }

    /// Number of observable changes so far.
    pub fn epoch(&self) -> u64 {
        self.reader.epoch()
    }

    /// Wait for the next observable change. False once the subscription has
    /// nothing more to deliver.
    pub async fn changed(&mut self) -> bool {
        self.reader.changed().await
    }

    /// Switch to another namespace. The old stream is released before the
    /// new one is opened; same namespace is a no-op. Returns true on restart.
    pub fn rescope(&mut self, namespace: &str) -> bool {
        if namespace == self.namespace {
            return false;
        }
        info!(from = %self.namespace, to = %namespace, "watch_list: namespace changed");
        self.teardown();
        *self = Self::start(self.ctx.clone(), namespace);
        true
    }

    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!(ns = %self.namespace, "watch_list: stopping stream");
            stream.cancel();
        }
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

impl Drop for ListSubscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn drive(
    ctx: Ctx,
    loader: SnapshotLoader,
    namespace: String,
    mut events: mpsc::UnboundedReceiver<StreamMsg<ChangeEvent<WorkloadInfo>>>,
    mut publisher: Publisher<ListState>,
) {
    let mut rec: ListReconciler<WorkloadInfo> = ListReconciler::new();
    let mut loading = true;
    let snapshot = loader.load(&namespace);
    tokio::pin!(snapshot);
    let mut snapshot_pending = true;
    let mut stream_open = true;
    while snapshot_pending || stream_open {
        tokio::select! {
            res = &mut snapshot, if snapshot_pending => {
                snapshot_pending = false;
                // Failure keeps whatever is held; either way loading ends.
                if let Ok(items) = res {
                    rec.reseed(items);
                }
                loading = false;
                publisher.publish(ListState { items: rec.current(), loading });
            }
            msg = events.recv(), if stream_open => match msg {
                Some(StreamMsg::Event(ev)) => {
                    if rec.apply(ev) {
                        publisher.publish(ListState { items: rec.current(), loading });
                    }
                }
                Some(StreamMsg::Failed(e)) => report_stream_failure(&ctx, &namespace, &e),
                None => stream_open = false,
            },
        }
    }
    debug!(ns = %namespace, epoch = rec.epoch(), "watch_list: driver finished");
}

fn report_stream_failure(ctx: &Ctx, namespace: &str, e: &ApiError) {
    info!(ns = %namespace, error = %e, "watch_list: stream failed; not reconnecting");
    ctx.notifier.error(STREAM_ERROR_MESSAGE, &e.to_string());
}
