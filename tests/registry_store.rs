//! Tests for the subscription registry and the report store.

use emergency_stomp::{EventReport, ReportStore, SubscriptionRegistry};
use std::sync::Arc;
use std::thread;

fn report(name: &str, at: i64) -> EventReport {
    EventReport {
        event_name: name.to_string(),
        occurred_at: at,
        ..EventReport::default()
    }
}

// =============================================================================
// SubscriptionRegistry
// =============================================================================

#[test]
fn join_is_idempotent() {
    let registry = SubscriptionRegistry::new();
    registry.join("/police");
    registry.join("/police");
    assert!(registry.is_joined("/police"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn leave_removes_and_ignores_unknown() {
    let registry = SubscriptionRegistry::new();
    registry.join("/fire");
    registry.leave("/police");
    assert!(registry.is_joined("/fire"));
    registry.leave("/fire");
    assert!(!registry.is_joined("/fire"));
    assert!(registry.is_empty());
}

#[test]
fn topics_are_sorted() {
    let registry = SubscriptionRegistry::new();
    registry.join("/police");
    registry.join("/ambulance");
    assert_eq!(registry.topics(), vec!["/ambulance".to_string(), "/police".to_string()]);
}

#[test]
fn concurrent_joins() {
    let registry = Arc::new(SubscriptionRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = registry.clone();
            thread::spawn(move || {
                for j in 0..50 {
                    registry.join(&format!("/t{}", (i * 50 + j) % 100));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("thread");
    }
    assert_eq!(registry.len(), 100);
}

// =============================================================================
// ReportStore
// =============================================================================

#[test]
fn fetch_returns_insertion_order() {
    let store = ReportStore::new();
    store.append("/police", "alice", report("late", 300));
    store.append("/police", "alice", report("early", 100));
    store.append("/police", "alice", report("middle", 200));
    let names: Vec<String> = store
        .fetch("/police", "alice")
        .into_iter()
        .map(|r| r.event_name)
        .collect();
    assert_eq!(names, vec!["late", "early", "middle"]);
}

#[test]
fn fetch_unknown_key_is_empty() {
    let store = ReportStore::new();
    store.append("/police", "alice", report("x", 1));
    assert!(store.fetch("/police", "bob").is_empty());
    assert!(store.fetch("/fire", "alice").is_empty());
}

#[test]
fn keys_are_independent() {
    let store = ReportStore::new();
    store.append("/police", "alice", report("a", 1));
    store.append("/fire", "alice", report("b", 2));
    store.append("/police", "bob", report("c", 3));
    assert_eq!(store.fetch("/police", "alice").len(), 1);
    assert_eq!(store.fetch("/fire", "alice")[0].event_name, "b");
    assert_eq!(store.len(), 3);
}

#[test]
fn fetch_returns_a_copy() {
    let store = ReportStore::new();
    store.append("/police", "alice", report("a", 1));
    let mut copy = store.fetch("/police", "alice");
    copy.clear();
    assert_eq!(store.fetch("/police", "alice").len(), 1);
}

#[test]
fn concurrent_appends_keep_every_report() {
    let store = Arc::new(ReportStore::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                for j in 0..25 {
                    store.append("/police", "alice", report(&format!("{}-{}", i, j), j));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("thread");
    }
    assert_eq!(store.fetch("/police", "alice").len(), 100);
}
