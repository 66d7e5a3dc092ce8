#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use kdash_core::{ChangeEvent, ObjectKey, Versioned, WorkloadInfo, WorkloadMeta};
use kdash_store::{reconcile, ListReconciler};
use proptest::prelude::*;

fn info(name: &str, rv: u8) -> WorkloadInfo {
    WorkloadInfo {
        object_meta: Some(WorkloadMeta {
            name: name.to_string(),
            namespace: "default".into(),
            resource_version: Some(rv.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn event() -> impl Strategy<Value = ChangeEvent<WorkloadInfo>> {
    let name = prop::sample::select(vec!["a", "b", "c", "d"]);
    prop_oneof![
        3 => (name.clone(), 0u8..4).prop_map(|(n, rv)| ChangeEvent::Upsert(info(n, rv))),
        1 => name.prop_map(|n| ChangeEvent::Delete(Some(ObjectKey::new("default", n)))),
    ]
}

proptest! {
    #[test]
    fn one_entity_per_identity_equal_to_last_upsert(events in prop::collection::vec(event(), 0..64)) {
        let mut r = ListReconciler::new();
        let mut model: BTreeMap<ObjectKey, String> = BTreeMap::new();
        for ev in events {
            match &ev {
                ChangeEvent::Upsert(w) => {
                    model.insert(w.key().expect("key"), w.version().unwrap_or("").to_string());
                }
                ChangeEvent::Delete(Some(k)) => {
                    model.remove(k);
                }
                ChangeEvent::Delete(None) => {}
            }
            r.apply(ev);
        }
        let got: BTreeMap<ObjectKey, String> = r
            .current()
            .iter()
            .map(|w| (w.key().expect("key"), w.version().unwrap_or("").to_string()))
            .collect();
        prop_assert_eq!(got.len(), r.len());
        prop_assert_eq!(got, model);
    }

    #[test]
    fn applying_an_event_twice_is_idempotent(events in prop::collection::vec(event(), 1..32)) {
        let mut current: Arc<Vec<WorkloadInfo>> = Arc::new(Vec::new());
        for ev in events {
            if let Some(next) = reconcile(&current, ev.clone()) {
                current = next;
            }
            let again = reconcile(&current, ev);
            prop_assert!(again.is_none());
        }
    }

    #[test]
    fn pure_and_indexed_forms_agree(events in prop::collection::vec(event(), 0..48)) {
        let mut r = ListReconciler::new();
        let mut pure: Arc<Vec<WorkloadInfo>> = Arc::new(Vec::new());
        for ev in events {
            let changed = r.apply(ev.clone());
            let next = reconcile(&pure, ev);
            prop_assert_eq!(changed, next.is_some());
            if let Some(n) = next {
                pure = n;
            }
            let cur = r.current();
            prop_assert_eq!(cur.as_ref(), pure.as_ref());
        }
    }
}
