//! Snapshot isolation tests.
//!
//! These tests check that a snapshot keeps showing exactly the contents the
//! deque had when it was opened, whatever happens to the live deque later.

use strand_deque::VersionedDeque;
use strand_test::utils::{contents, contents_rev, init_tracing, live_contents};

#[test]
fn test_end_to_end_scenario() {
    init_tracing();
    let deque = VersionedDeque::new();
    deque.append("A").unwrap();
    let b = deque.append("B").unwrap();
    deque.append("C").unwrap();

    let mut s1 = deque.create_snapshot().unwrap();
    assert_eq!(contents(&s1), vec!["A", "B", "C"]);

    deque.unlink(b).unwrap();
    assert_eq!(live_contents(&deque), vec!["A", "C"]);
    assert_eq!(contents(&s1), vec!["A", "B", "C"]);

    let mut s2 = deque.create_snapshot().unwrap();
    assert_eq!(contents(&s2), vec!["A", "C"]);

    deque.append("D").unwrap();
    assert_eq!(live_contents(&deque), vec!["A", "C", "D"]);
    assert_eq!(contents(&s2), vec!["A", "C"]);

    s1.close();
    s2.close();

    let s3 = deque.create_snapshot().unwrap();
    assert_eq!(contents(&s3), vec!["A", "C", "D"]);
    assert_eq!(contents_rev(&s3), vec!["D", "C", "A"]);
}

#[test]
fn test_snapshot_size_is_fixed() {
    init_tracing();
    let deque = VersionedDeque::new();
    deque.link_all(0..10).unwrap();
    let snapshot = deque.create_snapshot().unwrap();

    for i in 10..20 {
        deque.append(i).unwrap();
        deque.poll_first().unwrap();
        assert_eq!(snapshot.len().unwrap(), 10);
    }
    assert_eq!(contents(&snapshot), (0..10).collect::<Vec<_>>());
    assert_eq!(live_contents(&deque), (10..20).collect::<Vec<_>>());
}

#[test]
fn test_close_order_does_not_affect_other_snapshot() {
    init_tracing();
    for close_first in [true, false] {
        let deque = VersionedDeque::new();
        deque.link_all([1, 2, 3]).unwrap();

        let mut s1 = deque.create_snapshot().unwrap();
        deque.append(4).unwrap();
        deque.poll_first().unwrap();
        let mut s2 = deque.create_snapshot().unwrap();

        if close_first {
            s1.close();
            assert_eq!(contents(&s2), vec![2, 3, 4]);
            s2.close();
        } else {
            s2.close();
            assert_eq!(contents(&s1), vec![1, 2, 3]);
            s1.close();
        }
        assert_eq!(deque.stats().obsolete_links, 0);
    }
}

#[test]
fn test_unlinked_node_disposed_when_last_observer_closes() {
    init_tracing();
    let deque = VersionedDeque::new();
    let a = deque.append("A").unwrap();
    deque.append("B").unwrap();
    let c = deque.append("C").unwrap();

    let mut s1 = deque.create_snapshot().unwrap();
    deque.unlink(a).unwrap();
    deque.append("D").unwrap();
    let mut s2 = deque.create_snapshot().unwrap();
    deque.unlink(c).unwrap();

    assert_eq!(contents(&s1), vec!["A", "B", "C"]);
    assert_eq!(contents(&s2), vec!["B", "C", "D"]);
    assert_eq!(live_contents(&deque), vec!["B", "D"]);

    // Both unlinked nodes stay reachable while s2 is open.
    s1.close();
    assert!(deque.node_info(c).is_some());
    assert!(!deque.is_linked(c));
    assert_eq!(contents(&s2), vec!["B", "C", "D"]);

    s2.close();
    assert!(deque.node_info(a).is_none());
    assert!(deque.node_info(c).is_none());
    assert_eq!(deque.stats().arena_nodes, 2);
}

#[test]
fn test_many_snapshots_at_different_versions() {
    init_tracing();
    let deque = VersionedDeque::new();
    let mut snapshots = Vec::new();
    let mut expected = Vec::new();

    for i in 0..20u32 {
        if i % 3 == 0 {
            deque.prepend(i).unwrap();
        } else {
            deque.append(i).unwrap();
        }
        if i % 4 == 0 {
            deque.poll_last().unwrap();
        }
        snapshots.push(deque.create_snapshot().unwrap());
        expected.push(live_contents(&deque));
    }

    for (snapshot, expected) in snapshots.iter().zip(&expected) {
        assert_eq!(&contents(snapshot), expected);
        assert_eq!(
            contents_rev(snapshot),
            expected.iter().rev().copied().collect::<Vec<_>>()
        );
    }

    // Close every other one and check the rest are intact.
    let mut kept = Vec::new();
    for (i, mut snapshot) in snapshots.into_iter().enumerate() {
        if i % 2 == 0 {
            snapshot.close();
        } else {
            kept.push((snapshot, expected[i].clone()));
        }
    }
    deque.append(100).unwrap();
    for (snapshot, expected) in &kept {
        assert_eq!(&contents(snapshot), expected);
    }
}

#[test]
fn test_snapshot_nodes_track_live_state() {
    init_tracing();
    let deque = VersionedDeque::new();
    deque.link_all(["x", "y", "z"]).unwrap();
    let snapshot = deque.create_snapshot().unwrap();

    let nodes: Vec<_> = snapshot.nodes().unwrap().collect();
    assert_eq!(nodes.len(), 3);
    deque.unlink(nodes[1].node).unwrap();

    assert!(deque.is_linked(nodes[0].node));
    assert!(!deque.is_linked(nodes[1].node));
    assert_eq!(*deque.element(nodes[1].node).unwrap(), "y");
    assert_eq!(*snapshot.last_node().unwrap().unwrap().element, "z");
}
