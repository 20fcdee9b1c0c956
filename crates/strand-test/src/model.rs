//! Reference model checking.
//!
//! [`ModelHarness`] applies every operation both to a [`VersionedDeque`] and
//! to a plain `VecDeque`, and remembers what each open snapshot must show.
//! [`ModelHarness::verify`] compares the two.

use std::collections::VecDeque;

use strand_deque::{DequeConfig, DequeError, DequeStats, NodeHandle, Snapshot, VersionedDeque};

use crate::workload::Op;

/// Result of a model check: `Err` carries a description of the mismatch.
pub type CheckResult = Result<(), String>;

struct OpenSnapshot {
    snapshot: Snapshot<u64>,
    expected: Vec<u64>,
}

/// Replays operations against a deque and a reference model.
pub struct ModelHarness {
    deque: VersionedDeque<u64>,
    live: VecDeque<(u64, NodeHandle)>,
    snapshots: Vec<OpenSnapshot>,
    capacity: Option<usize>,
}

impl ModelHarness {
    /// Creates a harness over an unbounded deque.
    pub fn new() -> Self {
        Self::with_config(DequeConfig::default())
    }

    /// Creates a harness over a deque built from `config`.
    pub fn with_config(config: DequeConfig) -> Self {
        let capacity = config.capacity;
        Self {
            deque: VersionedDeque::with_config(config).expect("valid config"),
            live: VecDeque::new(),
            snapshots: Vec::new(),
            capacity,
        }
    }

    /// Returns the deque under test.
    pub fn deque(&self) -> &VersionedDeque<u64> {
        &self.deque
    }

    /// Returns the number of snapshots the harness keeps open.
    pub fn open_snapshots(&self) -> usize {
        self.snapshots.len()
    }

    fn is_full(&self) -> bool {
        self.capacity.is_some_and(|capacity| self.live.len() >= capacity)
    }

    fn link(&mut self, value: u64, front: bool) -> CheckResult {
        let result = if front {
            self.deque.prepend(value)
        } else {
            self.deque.append(value)
        };
        match result {
            Ok(node) if !self.is_full() => {
                if front {
                    self.live.push_front((value, node));
                } else {
                    self.live.push_back((value, node));
                }
                Ok(())
            }
            Ok(_) => Err(format!("insert of {value} succeeded past capacity")),
            Err(DequeError::CapacityExceeded { .. }) if self.is_full() => Ok(()),
            Err(err) => Err(format!("insert of {value} failed: {err}")),
        }
    }

    /// Applies one operation to both the deque and the model.
    pub fn apply(&mut self, op: Op) -> CheckResult {
        match op {
            Op::Append(value) => self.link(value, false)?,
            Op::Prepend(value) => self.link(value, true)?,
            Op::PollFirst => {
                let got = self.deque.poll_first().map_err(|e| e.to_string())?;
                let expected = self.live.pop_front().map(|(value, _)| value);
                if got.as_deref().copied() != expected {
                    return Err(format!("poll_first returned {got:?}, expected {expected:?}"));
                }
            }
            Op::PollLast => {
                let got = self.deque.poll_last().map_err(|e| e.to_string())?;
                let expected = self.live.pop_back().map(|(value, _)| value);
                if got.as_deref().copied() != expected {
                    return Err(format!("poll_last returned {got:?}, expected {expected:?}"));
                }
            }
            Op::UnlinkAt(index) => {
                if !self.live.is_empty() {
                    let index = index % self.live.len();
                    if let Some((value, node)) = self.live.remove(index) {
                        let unlinked = self.deque.unlink(node).map_err(|e| e.to_string())?;
                        if !unlinked {
                            return Err(format!("node {node} holding {value} was not linked"));
                        }
                    }
                }
            }
            Op::OpenSnapshot => {
                let snapshot = self.deque.create_snapshot().map_err(|e| e.to_string())?;
                let expected = self.live.iter().map(|(value, _)| *value).collect();
                self.snapshots.push(OpenSnapshot { snapshot, expected });
            }
            Op::OpenPollSnapshot(max) => {
                let snapshot = self
                    .deque
                    .create_snapshot_poll(max)
                    .map_err(|e| e.to_string())?;
                let take = max.map_or(self.live.len(), |max| max.min(self.live.len()));
                let expected = self.live.drain(..take).map(|(value, _)| value).collect();
                self.snapshots.push(OpenSnapshot { snapshot, expected });
            }
            Op::CloseSnapshot(index) => {
                if !self.snapshots.is_empty() {
                    let index = index % self.snapshots.len();
                    let mut open = self.snapshots.swap_remove(index);
                    open.snapshot.close();
                }
            }
        }
        Ok(())
    }

    /// Checks the live deque and every open snapshot against the model.
    pub fn verify(&self) -> CheckResult {
        if self.deque.len() != self.live.len() {
            return Err(format!(
                "deque has {} elements, model has {}",
                self.deque.len(),
                self.live.len()
            ));
        }
        for (value, node) in &self.live {
            if !self.deque.is_linked(*node) {
                return Err(format!("node {node} holding {value} is not linked"));
            }
        }

        let live = self.deque.create_snapshot().map_err(|e| e.to_string())?;
        let expected: Vec<u64> = self.live.iter().map(|(value, _)| *value).collect();
        check_snapshot(&live, &expected)?;

        for open in &self.snapshots {
            check_snapshot(&open.snapshot, &open.expected)?;
        }
        Ok(())
    }

    /// Closes every snapshot, drains the obsolete set and returns the final
    /// statistics.
    pub fn finish(mut self) -> Result<DequeStats, String> {
        for mut open in self.snapshots.drain(..) {
            open.snapshot.close();
        }
        while self
            .deque
            .reclaim()
            .map_err(|e| e.to_string())?
            .did_work()
        {}

        let stats = self.deque.stats();
        if stats.obsolete_links != 0 {
            return Err(format!("{} obsolete links left", stats.obsolete_links));
        }
        if stats.arena_nodes != self.live.len() {
            return Err(format!(
                "{} nodes in the arena, {} linked",
                stats.arena_nodes,
                self.live.len()
            ));
        }
        tracing::debug!(
            len = stats.len,
            gc_runs = stats.gc_runs,
            links_reclaimed = stats.links_reclaimed,
            nodes_disposed = stats.nodes_disposed,
            "model run finished"
        );
        Ok(stats)
    }
}

impl Default for ModelHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks a snapshot forward, backward and by length.
pub fn check_snapshot(snapshot: &Snapshot<u64>, expected: &[u64]) -> CheckResult {
    let len = snapshot.len().map_err(|e| e.to_string())?;
    if len != expected.len() {
        return Err(format!(
            "snapshot {} reports {} elements, expected {}",
            snapshot.id(),
            len,
            expected.len()
        ));
    }

    let forward: Vec<u64> = snapshot
        .iter()
        .map_err(|e| e.to_string())?
        .map(|element| *element)
        .collect();
    if forward != expected {
        return Err(format!(
            "snapshot {} at {} shows {:?}, expected {:?}",
            snapshot.id(),
            snapshot.version(),
            forward,
            expected
        ));
    }

    let mut backward: Vec<u64> = snapshot
        .iter()
        .map_err(|e| e.to_string())?
        .rev()
        .map(|element| *element)
        .collect();
    backward.reverse();
    if backward != expected {
        return Err(format!(
            "snapshot {} backward shows {:?}, expected {:?}",
            snapshot.id(),
            backward,
            expected
        ));
    }
    Ok(())
}
