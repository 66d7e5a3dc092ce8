//! kdash store: folds change events into identity-keyed state.
//!
//! [`ListReconciler`] holds an ordered Collection; [`EntityReconciler`]
//! follows one identity. Both only produce a new value when something
//! observable changed, so consumers can compare `Arc` pointers to skip work.

#![forbid(unsafe_code)]

use std::sync::Arc;

use kdash_core::{policy, ChangeEvent, ObjectKey, Versioned};
use metrics::counter;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

mod entity;

pub use entity::{EntityReconciler, Phase};

/// Ordered, identity-unique sequence of entities.
pub type Collection<T> = Arc<Vec<T>>;

enum Step {
    Keep,
    Remove(usize),
    Replace(usize),
    Append,
}

fn plan<T: Versioned>(items: &[T], pos: Option<usize>, ev: &ChangeEvent<T>) -> Step {
    match (ev, pos) {
        (ChangeEvent::Delete(_), Some(idx)) => Step::Remove(idx),
        (ChangeEvent::Delete(_), None) => Step::Keep,
        (ChangeEvent::Upsert(incoming), Some(idx)) => {
            if policy::equal(&items[idx], incoming) {
                Step::Keep
            } else {
                Step::Replace(idx)
            }
        }
        (ChangeEvent::Upsert(incoming), None) => {
            if incoming.key().is_some() {
                Step::Append
            } else {
                // Malformed: no identity to file it under.
                Step::Keep
            }
        }
    }
}

fn execute<T: Clone>(items: &[T], step: Step, ev: ChangeEvent<T>) -> Option<Vec<T>> {
    if matches!(step, Step::Keep) {
        return None;
    }
    let mut next = items.to_vec();
    match (step, ev) {
        (Step::Remove(idx), _) => {
            next.remove(idx);
        }
        (Step::Replace(idx), ChangeEvent::Upsert(e)) => next[idx] = e,
        (Step::Append, ChangeEvent::Upsert(e)) => next.push(e),
        _ => return None,
    }
    Some(next)
}

/// Apply one event to `current`. Returns `None` when nothing changed
/// (unknown delete, equal version, malformed entity).
pub fn reconcile<T: Versioned + Clone>(current: &Collection<T>, ev: ChangeEvent<T>) -> Option<Collection<T>> {
    let pos = ev.key().and_then(|k| current.iter().position(|x| x.key().as_ref() == Some(&k)));
    let step = plan(current, pos, &ev);
    execute(current, step, ev).map(Arc::new)
}

/// Stateful Collection holder with an identity → position index.
pub struct ListReconciler<T> {
    epoch: u64,
    items: Collection<T>,
    index: FxHashMap<ObjectKey, usize>,
}

impl<T: Versioned + Clone> Default for ListReconciler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Versioned + Clone> ListReconciler<T> {
    pub fn new() -> Self {
        Self { epoch: 0, items: Arc::new(Vec::new()), index: FxHashMap::default() }
    }

    pub fn seeded(items: Vec<T>) -> Self {
        let mut r = Self::new();
        r.reseed(items);
        r
    }

    /// Bumped on every observable change, starting at 0.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn current(&self) -> Collection<T> {
        Arc::clone(&self.items)
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&T> {
        self.index.get(key).and_then(|&i| self.items.get(i))
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, it) in self.items.iter().enumerate() {
            if let Some(k) = it.key() {
                self.index.insert(k, i);
            }
        }
    }

    /// Replace everything with a fresh snapshot. Stream-accumulated state is
    /// discarded. Duplicate identities keep the first position and the last
    /// value; items without identity are dropped.
    pub fn reseed(&mut self, items: Vec<T>) {
        let mut out: Vec<T> = Vec::with_capacity(items.len());
        let mut seen: FxHashMap<ObjectKey, usize> = FxHashMap::default();
        let mut dropped = 0usize;
        for it in items {
            match it.key() {
                Some(k) => match seen.get(&k) {
                    Some(&i) => out[i] = it,
                    None => {
                        seen.insert(k, out.len());
                        out.push(it);
                    }
                },
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(dropped, "reseed: skipped items without identity");
        }
        self.items = Arc::new(out);
        self.index = seen;
        self.epoch = self.epoch.saturating_add(1);
        debug!(items = self.items.len(), epoch = self.epoch, "reseed: collection replaced");
    }

    /// Fold one event. Returns true iff the Collection changed.
    pub fn apply(&mut self, ev: ChangeEvent<T>) -> bool {
        let pos = ev.key().and_then(|k| self.index.get(&k).copied());
        let step = plan(&self.items, pos, &ev);
        let structural = matches!(step, Step::Remove(_) | Step::Append);
        match execute(&self.items, step, ev) {
            Some(next) => {
                self.items = Arc::new(next);
                if structural {
                    self.rebuild_index();
                }
                self.epoch = self.epoch.saturating_add(1);
                counter!("watch_events_applied_total", 1);
                trace!(epoch = self.epoch, items = self.items.len(), "event applied");
                true
            }
            None => {
                counter!("watch_events_suppressed_total", 1);
                false
            }
        }
    }
}
