use std::sync::Arc;
use std::time::Duration;

use kdash_api::{resolve_endpoint, subscribe, CancelHandle, Endpoint, TransportMode};
use kdash_core::{policy, ChangeEvent, ObjectKey, WorkloadInfo};
use kdash_store::EntityReconciler;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::publish::{Publisher, Reader};
use crate::snapshot::SnapshotLoader;
use crate::{Ctx, StreamMsg, STREAM_ERROR_MESSAGE};

/// Called with the new value every time the held workload is replaced.
pub type UpdateCallback = Arc<dyn Fn(&WorkloadInfo) + Send + Sync>;

#[derive(Clone)]
pub struct WatchOptions {
    /// Open the watch stream. When off (or in snapshot-only mode) the value
    /// comes from a one-shot list lookup instead.
    pub subscribe: bool,
    /// Force `loading` off after this long without data.
    pub timeout: Option<Duration>,
    pub on_update: Option<UpdateCallback>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self { subscribe: true, timeout: None, on_update: None }
    }
}

impl WatchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn on_update(mut self, f: impl Fn(&WorkloadInfo) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Arc::new(f));
        self
    }
}

#[derive(Debug, Clone)]
pub struct EntityState {
    /// Last accepted value, or an empty placeholder before the first one.
    pub entity: Arc<WorkloadInfo>,
    pub loading: bool,
}

/// Live view of one workload.
pub struct EntitySubscription {
    key: ObjectKey,
    mode: TransportMode,
    reader: Reader<EntityState>,
    stream: Option<CancelHandle>,
    driver: Option<JoinHandle<()>>,
}

impl EntitySubscription {
    pub(crate) fn start(ctx: Ctx, namespace: &str, name: &str, opts: WatchOptions) -> Self {
        let key = ObjectKey::new(namespace, name);
        let transport = resolve_endpoint(&ctx.base, ctx.api.as_ref(), Endpoint::One { namespace, name });
        let streaming = opts.subscribe && transport.mode == TransportMode::Live;
        info!(key = %key, url = %transport.url, mode = ?transport.mode, streaming, "watch_one: starting");

        let placeholder = WorkloadInfo::default();
        let (publisher, reader) =
            Publisher::new(EntityState { entity: Arc::new(placeholder.clone()), loading: true });
        let (tx, rx) = mpsc::unbounded_channel();
        let stream = if streaming {
            let err_tx = tx.clone();
            subscribe::<WorkloadInfo, _, _>(
                Arc::clone(&ctx.frames),
                transport.stream_url(),
                move |info| {
                    let _ = tx.send(StreamMsg::Event(ChangeEvent::Upsert(info)));
                },
                move |e| {
                    let _ = err_tx.send(StreamMsg::Failed(e));
                },
            )
        } else {
            drop(tx);
            CancelHandle::inert()
        };

        let driver = Driver {
            lookup: (!streaming)
                .then(|| SnapshotLoader::new(Arc::clone(&ctx.api), Arc::clone(&ctx.notifier))),
            rec: EntityReconciler::new(key.clone(), placeholder),
            on_update: opts.on_update,
            publisher,
            ctx,
        };
        let driver = tokio::spawn(driver.run(rx, opts.timeout));
        Self { key, mode: transport.mode, reader, stream: Some(stream), driver: Some(driver) }
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn state(&self) -> Arc<EntityState> {
        self.reader.current()
    }

    pub fn entity(&self) -> Arc<WorkloadInfo> {
        Arc::clone(&self.reader.current().entity)
    }

    pub fn loading(&self) -> bool {
        self.reader.current().loading
    }

    pub fn epoch(&self) -> u64 {
        self.reader.epoch()
    }

    pub async fn changed(&mut self) -> bool {
        self.reader.changed().await
    }

    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!(key = %self.key, "watch_one: stopping stream");
            stream.cancel();
        }
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

impl Drop for EntitySubscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

struct Driver {
    ctx: Ctx,
    lookup: Option<SnapshotLoader>,
    rec: EntityReconciler<WorkloadInfo>,
    on_update: Option<UpdateCallback>,
    publisher: Publisher<EntityState>,
}

impl Driver {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<StreamMsg<ChangeEvent<WorkloadInfo>>>, timeout: Option<Duration>) {
        let key = self.rec.key().clone();
        let lookup = self.lookup.take();
        let snapshot = async {
            match &lookup {
                Some(loader) => loader.load(&key.namespace).await,
                None => Ok(Vec::new()),
            }
        };
        tokio::pin!(snapshot);
        let mut snapshot_pending = lookup.is_some();

        let sleep = tokio::time::sleep(timeout.unwrap_or_default());
        tokio::pin!(sleep);
        let mut armed = timeout.is_some();

        let mut stream_open = true;
        while snapshot_pending || stream_open || (armed && self.rec.loading()) {
            tokio::select! {
                res = &mut snapshot, if snapshot_pending => {
                    snapshot_pending = false;
                    let found = res
                        .ok()
                        .and_then(|items| items.into_iter().find(|w| policy::matches(&key, w)));
                    match found {
                        Some(w) => {
                            self.accept(ChangeEvent::Upsert(w));
                        }
                        None => debug!(key = %key, "watch_one: not in snapshot"),
                    }
                    if self.rec.force_ready() {
                        self.publish();
                    }
                }
                msg = events.recv(), if stream_open => match msg {
                    Some(StreamMsg::Event(ev)) => {
                        self.accept(ev);
                    }
                    Some(StreamMsg::Failed(e)) => {
                        info!(key = %key, error = %e, "watch_one: stream failed; not reconnecting");
                        self.ctx.notifier.error(STREAM_ERROR_MESSAGE, &e.to_string());
                        // No reconnect: nothing more can arrive to end loading.
                        if self.rec.force_ready() {
                            self.publish();
                        }
                    }
                    None => stream_open = false,
                },
                _ = &mut sleep, if armed && self.rec.loading() => {
                    armed = false;
                    // Stream stays open; late data still lands.
                    if self.rec.force_ready() {
                        info!(key = %key, "watch_one: timed out waiting for data");
                        self.publish();
                    }
                }
            }
        }
        debug!(key = %key, "watch_one: driver finished");
    }

    fn accept(&mut self, ev: ChangeEvent<WorkloadInfo>) -> bool {
        if !self.rec.apply(ev) {
            return false;
        }
        if let Some(f) = &self.on_update {
            f(self.rec.current().as_ref());
        }
        self.publish();
        true
    }

    fn publish(&mut self) {
        self.publisher.publish(EntityState { entity: self.rec.current(), loading: self.rec.loading() });
    }
}
