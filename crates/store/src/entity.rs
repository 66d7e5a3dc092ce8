use std::sync::Arc;

use kdash_core::{policy, ChangeEvent, ObjectKey, Versioned};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
}

/// Single-entity state machine: `Loading -> Ready`, never back.
///
/// Starts from a caller-supplied placeholder so there is always something
/// to render. Events for other identities (broadcast streams) are ignored,
/// as are deletes.
pub struct EntityReconciler<T> {
    key: ObjectKey,
    current: Arc<T>,
    phase: Phase,
}

impl<T: Versioned> EntityReconciler<T> {
    pub fn new(key: ObjectKey, placeholder: T) -> Self {
        Self { key, current: Arc::new(placeholder), phase: Phase::Loading }
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn current(&self) -> Arc<T> {
        Arc::clone(&self.current)
    }

    /// Returns true iff the held entity or the phase changed.
    pub fn apply(&mut self, ev: ChangeEvent<T>) -> bool {
        let incoming = match ev {
            ChangeEvent::Upsert(e) => e,
            ChangeEvent::Delete(k) => {
                trace!(key = ?k, "entity: delete ignored");
                return false;
            }
        };
        if !policy::matches(&self.key, &incoming) {
            trace!(target_key = %self.key, "entity: event for another identity ignored");
            return false;
        }
        if policy::equal(self.current.as_ref(), &incoming) {
            return false;
        }
        self.current = Arc::new(incoming);
        if self.phase == Phase::Loading {
            self.phase = Phase::Ready;
            debug!(key = %self.key, "entity: first value received");
        }
        true
    }

    /// Clear loading without data (timeout). True only the first time.
    pub fn force_ready(&mut self) -> bool {
        if self.phase == Phase::Ready {
            return false;
        }
        self.phase = Phase::Ready;
        debug!(key = %self.key, "entity: loading cleared by timeout");
        true
    }
}
