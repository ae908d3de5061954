//! Unit tests for WatchRegistry
//!
//! Covers registration dedup, fire-once consumption, targeted and kind-wide
//! unregistration, and the read-only views used by removal planning.

use super::*;
use crate::test_utils::recording_subscriber;

#[test]
fn test_register_single_watch() {
    let registry = WatchRegistry::new();
    let (watcher, _rx) = recording_subscriber();

    assert!(registry.register("/a", WatchKind::Data, watcher.clone()).unwrap());

    assert_eq!(registry.watch_count("/a"), 1);
    assert_eq!(registry.watched_path_count(), 1);
    assert!(registry.contains("/a", WatchKind::Data, &watcher));
    assert!(!registry.contains("/a", WatchKind::Children, &watcher));
    assert!(registry.contains("/a", WatchKind::Any, &watcher));
}

#[test]
fn test_register_same_triple_twice_is_deduplicated() {
    let registry = WatchRegistry::new();
    let (watcher, _rx) = recording_subscriber();

    assert!(registry.register("/a", WatchKind::Data, watcher.clone()).unwrap());
    assert!(!registry.register("/a", WatchKind::Data, watcher.clone()).unwrap());
    assert!(registry.register("/a", WatchKind::Children, watcher).unwrap());

    assert_eq!(registry.watch_count("/a"), 2);
}

#[test]
fn test_register_any_kind_is_rejected() {
    let registry = WatchRegistry::new();

    let result = registry.register("/a", WatchKind::Any, Subscriber::Default);

    assert!(result.unwrap_err().is_invalid_argument());
    assert_eq!(registry.watched_path_count(), 0);
}

#[test]
fn test_distinct_subscribers_on_same_path() {
    let registry = WatchRegistry::new();
    let (w1, _rx1) = recording_subscriber();
    let (w2, _rx2) = recording_subscriber();

    registry.register("/a", WatchKind::Data, w1).unwrap();
    registry.register("/a", WatchKind::Data, w2).unwrap();
    registry.register("/a", WatchKind::Data, Subscriber::Default).unwrap();

    assert_eq!(registry.watch_count("/a"), 3);
    assert_eq!(registry.watched_path_count(), 1);
}

#[test]
fn test_take_triggered_consumes_matching_kind_only() {
    let registry = WatchRegistry::new();
    let (w1, _rx1) = recording_subscriber();
    let (w2, _rx2) = recording_subscriber();
    registry.register("/a", WatchKind::Data, w1.clone()).unwrap();
    registry.register("/a", WatchKind::Children, w2.clone()).unwrap();

    let fired = registry.take_triggered("/a", EventType::NodeDataChanged);

    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].kind, WatchKind::Data);
    assert_eq!(fired[0].subscriber, w1);
    assert!(!registry.contains("/a", WatchKind::Data, &w1));
    assert!(registry.contains("/a", WatchKind::Children, &w2));

    // Fire-once: a second notification finds nothing
    assert!(registry.take_triggered("/a", EventType::NodeDataChanged).is_empty());
}

#[test]
fn test_take_triggered_node_deleted_consumes_both_kinds() {
    let registry = WatchRegistry::new();
    let (w1, _rx1) = recording_subscriber();
    registry.register("/a", WatchKind::Data, w1.clone()).unwrap();
    registry.register("/a", WatchKind::Children, w1).unwrap();

    let fired = registry.take_triggered("/a", EventType::NodeDeleted);

    assert_eq!(fired.len(), 2);
    assert_eq!(registry.watched_path_count(), 0);
}

#[test]
fn test_take_triggered_unknown_path() {
    let registry = WatchRegistry::new();
    assert!(registry.take_triggered("/missing", EventType::NodeCreated).is_empty());
}

#[test]
fn test_unregister_single_subscriber_leaves_others() {
    let registry = WatchRegistry::new();
    let (w1, _rx1) = recording_subscriber();
    let (w2, _rx2) = recording_subscriber();
    registry.register("/a", WatchKind::Data, w1.clone()).unwrap();
    registry.register("/a", WatchKind::Data, w2.clone()).unwrap();

    let removed = registry.unregister("/a", WatchKind::Data, &RemovalTarget::Subscriber(w1.clone()));

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].subscriber, w1);
    assert!(registry.contains("/a", WatchKind::Data, &w2));
}

#[test]
fn test_unregister_any_kind_for_subscriber() {
    let registry = WatchRegistry::new();
    let (w1, _rx1) = recording_subscriber();
    registry.register("/a", WatchKind::Data, w1.clone()).unwrap();
    registry.register("/a", WatchKind::Children, w1.clone()).unwrap();

    let removed = registry.unregister("/a", WatchKind::Any, &RemovalTarget::Subscriber(w1));

    assert_eq!(removed.len(), 2);
    assert_eq!(registry.watched_path_count(), 0);
}

#[test]
fn test_unregister_all_of_kind() {
    let registry = WatchRegistry::new();
    let (w1, _rx1) = recording_subscriber();
    let (w2, _rx2) = recording_subscriber();
    registry.register("/a", WatchKind::Data, w1.clone()).unwrap();
    registry.register("/a", WatchKind::Data, w2).unwrap();
    registry.register("/a", WatchKind::Children, w1.clone()).unwrap();

    let removed = registry.unregister("/a", WatchKind::Data, &RemovalTarget::AllOfKind);

    assert_eq!(removed.len(), 2);
    assert!(removed.iter().all(|e| e.kind == WatchKind::Data));
    assert!(registry.contains("/a", WatchKind::Children, &w1));
}

#[test]
fn test_unregister_nothing_matched() {
    let registry = WatchRegistry::new();
    let (w1, _rx1) = recording_subscriber();
    let (w2, _rx2) = recording_subscriber();
    registry.register("/a", WatchKind::Data, w1).unwrap();

    assert!(registry
        .unregister("/a", WatchKind::Data, &RemovalTarget::Subscriber(w2))
        .is_empty());
    assert!(registry
        .unregister("/b", WatchKind::Any, &RemovalTarget::AllOfKind)
        .is_empty());
    assert_eq!(registry.watch_count("/a"), 1);
}

#[test]
fn test_subscriber_kinds_reports_sole_ownership() {
    let registry = WatchRegistry::new();
    let (w1, _rx1) = recording_subscriber();
    let (w2, _rx2) = recording_subscriber();
    registry.register("/a", WatchKind::Data, w1.clone()).unwrap();
    registry.register("/a", WatchKind::Data, w2).unwrap();
    registry.register("/a", WatchKind::Children, w1.clone()).unwrap();

    let kinds = registry.subscriber_kinds("/a", WatchKind::Any, &w1);

    assert_eq!(kinds, vec![(WatchKind::Data, false), (WatchKind::Children, true)]);
    assert_eq!(
        registry.subscriber_kinds("/a", WatchKind::Children, &w1),
        vec![(WatchKind::Children, true)]
    );
    assert!(registry.subscriber_kinds("/b", WatchKind::Any, &w1).is_empty());
}

#[test]
fn test_registered_kinds() {
    let registry = WatchRegistry::new();
    let (w1, _rx1) = recording_subscriber();
    registry.register("/a", WatchKind::Children, w1.clone()).unwrap();

    assert_eq!(
        registry.registered_kinds("/a", WatchKind::Any, &RemovalTarget::AllOfKind),
        vec![WatchKind::Children]
    );
    assert!(registry
        .registered_kinds("/a", WatchKind::Any, &RemovalTarget::Subscriber(Subscriber::Default))
        .is_empty());
}

#[test]
fn test_snapshot_and_drain_are_sorted() {
    let registry = WatchRegistry::new();
    let (w1, _rx1) = recording_subscriber();
    registry.register("/b", WatchKind::Children, w1.clone()).unwrap();
    registry.register("/a", WatchKind::Children, w1.clone()).unwrap();
    registry.register("/a", WatchKind::Data, w1).unwrap();

    let all = registry.snapshot(None);
    let keys: Vec<(&str, WatchKind)> = all.iter().map(|e| (e.path.as_str(), e.kind)).collect();
    assert_eq!(
        keys,
        vec![
            ("/a", WatchKind::Data),
            ("/a", WatchKind::Children),
            ("/b", WatchKind::Children)
        ]
    );
    assert_eq!(registry.snapshot(Some("/b")).len(), 1);

    let drained = registry.drain();
    assert_eq!(drained, all);
    assert_eq!(registry.watched_path_count(), 0);
    assert!(registry.snapshot(None).is_empty());
}
