//! Obsolete-link reclamation tests.

use strand_deque::{DequeConfig, VersionedDeque};
use strand_test::utils::{contents, init_tracing, live_contents};

#[test]
fn test_no_obsolete_links_without_snapshots() {
    init_tracing();
    let deque = VersionedDeque::new();
    for i in 0..100u32 {
        deque.append(i).unwrap();
        if i % 2 == 0 {
            deque.poll_first().unwrap();
        }
    }
    let stats = deque.stats();
    assert_eq!(stats.obsolete_links, 0);
    assert_eq!(stats.arena_nodes, stats.len);
}

#[test]
fn test_closing_last_snapshot_reclaims_everything() {
    init_tracing();
    let deque = VersionedDeque::new();
    deque.link_all(0..10u32).unwrap();

    let mut snapshot = deque.create_snapshot().unwrap();
    for _ in 0..5 {
        deque.poll_first().unwrap();
    }
    deque.append(10).unwrap();
    assert!(deque.stats().obsolete_links > 0);
    assert_eq!(deque.stats().arena_nodes, 11);

    let result = snapshot.close();
    assert!(result.did_work());
    assert_eq!(result.nodes_disposed, 5);
    assert_eq!(result.remaining, 0);

    let stats = deque.stats();
    assert_eq!(stats.obsolete_links, 0);
    assert_eq!(stats.arena_nodes, 6);
    assert_eq!(stats.nodes_disposed, 5);
}

#[test]
fn test_reclaim_respects_batch_size() {
    init_tracing();
    let config = DequeConfig::default().with_reclaim_batch(2);
    let deque = VersionedDeque::with_config(config).unwrap();
    deque.link_all(0..10u32).unwrap();

    let mut snapshot = deque.create_snapshot().unwrap();
    deque.clear().unwrap();
    let retired = deque.stats().obsolete_links;
    assert!(retired > 2);

    let first = snapshot.close();
    assert!(first.links_reclaimed <= 2);
    assert_eq!(first.remaining, retired - first.links_reclaimed);

    // Every call drains at most two batches: one pending pass on entry and
    // the explicit one.
    let mut before = deque.stats().obsolete_links;
    while before > 0 {
        let result = deque.reclaim().unwrap();
        assert!(result.links_reclaimed <= 2);
        let after = deque.stats().obsolete_links;
        assert!(after < before);
        assert!(before - after <= 4);
        before = after;
    }
    assert_eq!(deque.stats().arena_nodes, 0);
}

#[test]
fn test_writes_reclaim_pending_links() {
    init_tracing();
    let config = DequeConfig::default().with_reclaim_batch(1);
    let deque = VersionedDeque::with_config(config).unwrap();
    deque.link_all(0..8u32).unwrap();

    let snapshot = deque.create_snapshot().unwrap();
    deque.clear().unwrap();
    drop(snapshot);
    let pending = deque.stats().obsolete_links;
    assert!(pending > 0);

    // Each write drains a batch before doing its own work.
    for i in 0..pending {
        deque.append(100 + i as u32).unwrap();
        deque.poll_first().unwrap();
    }
    assert_eq!(deque.stats().obsolete_links, 0);
}

#[test]
fn test_older_snapshot_holds_links_for_newer_versions() {
    init_tracing();
    let deque = VersionedDeque::new();
    deque.link_all(["a", "b"]).unwrap();

    let mut old = deque.create_snapshot().unwrap();
    deque.append("c").unwrap();
    let mut new = deque.create_snapshot().unwrap();
    deque.poll_first().unwrap();

    new.close();
    // The old snapshot still needs the pre-append links.
    assert!(deque.stats().obsolete_links > 0);
    assert_eq!(contents(&old), vec!["a", "b"]);

    old.close();
    assert_eq!(deque.stats().obsolete_links, 0);
    assert_eq!(live_contents(&deque), vec!["b", "c"]);
}

#[test]
fn test_steady_state_does_not_grow() {
    init_tracing();
    let deque = VersionedDeque::new();
    deque.link_all(0..16u64).unwrap();

    for round in 0..200u64 {
        let snapshot = deque.create_snapshot().unwrap();
        deque.poll_first().unwrap();
        deque.append(16 + round).unwrap();
        assert_eq!(snapshot.len().unwrap(), 16);
        drop(snapshot);
    }

    let stats = deque.stats();
    assert_eq!(stats.len, 16);
    assert_eq!(stats.arena_nodes, 16);
    assert_eq!(stats.obsolete_links, 0);
    assert_eq!(stats.open_snapshots, 0);
    assert!(stats.pinned_versions.is_empty());
}

#[test]
fn test_stats_track_runs() {
    init_tracing();
    let deque = VersionedDeque::new();
    deque.link_all([1u8, 2, 3]).unwrap();

    assert_eq!(deque.stats().gc_runs, 0);
    let snapshot = deque.create_snapshot().unwrap();
    deque.poll_last().unwrap();
    drop(snapshot);

    let stats = deque.stats();
    assert!(stats.gc_runs >= 1);
    assert!(stats.links_reclaimed >= 1);
    assert_eq!(stats.nodes_disposed, 1);

    // Nothing left to do.
    assert!(!deque.reclaim().unwrap().did_work());
}
