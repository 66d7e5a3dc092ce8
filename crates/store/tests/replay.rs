#![forbid(unsafe_code)]

use std::sync::Arc;

use kdash_core::{ChangeEvent, ObjectKey, WorkloadInfo, WorkloadWatchEvent};
use kdash_store::ListReconciler;

fn info(ns: &str, name: &str, rv: &str) -> WorkloadInfo {
    serde_json::from_value(serde_json::json!({
        "objectMeta": { "name": name, "namespace": ns, "resourceVersion": rv }
    }))
    .expect("decode")
}

fn frame(v: serde_json::Value) -> ChangeEvent<WorkloadInfo> {
    serde_json::from_value::<WorkloadWatchEvent>(v).expect("decode").into_change()
}

#[test]
fn snapshot_then_update_duplicate_and_delete() {
    let mut r = ListReconciler::seeded(vec![info("default", "a", "1")]);
    let seeded = r.current();

    assert!(r.apply(frame(serde_json::json!({
        "rolloutInfo": { "objectMeta": { "name": "a", "namespace": "default", "resourceVersion": "2" } }
    }))));
    let after_update = r.current();
    assert!(!Arc::ptr_eq(&seeded, &after_update));
    assert_eq!(after_update.len(), 1);
    assert_eq!(after_update[0].object_meta.as_ref().and_then(|m| m.resource_version.as_deref()), Some("2"));

    // same version again: same reference
    assert!(!r.apply(frame(serde_json::json!({
        "rolloutInfo": { "objectMeta": { "name": "a", "namespace": "default", "resourceVersion": "2" } }
    }))));
    assert!(Arc::ptr_eq(&after_update, &r.current()));

    assert!(r.apply(frame(serde_json::json!({ "rolloutInfo": null, "name": "a", "namespace": "default" }))));
    assert!(r.current().is_empty());
}

#[test]
fn update_in_place_preserves_order() {
    let mut r = ListReconciler::new();
    r.apply(ChangeEvent::Upsert(info("default", "a", "1")));
    r.apply(ChangeEvent::Upsert(info("default", "b", "1")));
    r.apply(ChangeEvent::Upsert(info("default", "a", "2")));
    let names: Vec<_> = r.current().iter().map(|w| w.name().to_string()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(r.current()[0].object_meta.as_ref().and_then(|m| m.resource_version.clone()), Some("2".into()));
}

#[test]
fn delete_unknown_is_noop_and_known_removed_once() {
    let mut r = ListReconciler::seeded(vec![info("default", "a", "1")]);
    let epoch = r.epoch();
    assert!(!r.apply(ChangeEvent::Delete(Some(ObjectKey::new("default", "zzz")))));
    assert_eq!(r.epoch(), epoch);
    assert!(r.apply(ChangeEvent::Delete(Some(ObjectKey::new("default", "a")))));
    assert!(!r.apply(ChangeEvent::Delete(Some(ObjectKey::new("default", "a")))));
    assert!(r.is_empty());
}

#[test]
fn same_name_in_other_namespace_is_distinct() {
    let mut r = ListReconciler::new();
    r.apply(ChangeEvent::Upsert(info("ns1", "a", "1")));
    r.apply(ChangeEvent::Upsert(info("ns2", "a", "1")));
    assert_eq!(r.len(), 2);
}

#[test]
fn reseed_discards_stream_state() {
    let mut r = ListReconciler::new();
    r.apply(ChangeEvent::Upsert(info("default", "streamed", "9")));
    r.reseed(vec![info("default", "a", "1")]);
    let names: Vec<_> = r.current().iter().map(|w| w.name().to_string()).collect();
    assert_eq!(names, vec!["a"]);
}
