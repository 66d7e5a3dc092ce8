use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

/// Writer side of a subscription's state: swap the snapshot, bump the epoch.
pub(crate) struct Publisher<S> {
    state: Arc<ArcSwap<S>>,
    epoch: u64,
    epoch_tx: watch::Sender<u64>,
}

impl<S> Publisher<S> {
    pub(crate) fn new(initial: S) -> (Self, Reader<S>) {
        let state = Arc::new(ArcSwap::from_pointee(initial));
        let (epoch_tx, epoch_rx) = watch::channel(0u64);
        let reader = Reader { state: Arc::clone(&state), epoch_rx };
        (Self { state, epoch: 0, epoch_tx }, reader)
    }

    pub(crate) fn publish(&mut self, next: S) {
        self.state.store(Arc::new(next));
        self.epoch = self.epoch.saturating_add(1);
        let _ = self.epoch_tx.send(self.epoch);
    }
}

/// Read side held by the subscription handle.
pub(crate) struct Reader<S> {
    state: Arc<ArcSwap<S>>,
    epoch_rx: watch::Receiver<u64>,
}

impl<S> Reader<S> {
    pub(crate) fn current(&self) -> Arc<S> {
        self.state.load_full()
    }

    pub(crate) fn epoch(&self) -> u64 {
        *self.epoch_rx.borrow()
    }

    /// Wait for the next publish. False once the writer is gone.
    pub(crate) async fn changed(&mut self) -> bool {
        self.epoch_rx.changed().await.is_ok()
    }
}
