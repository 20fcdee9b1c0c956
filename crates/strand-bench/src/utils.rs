//! Benchmark utilities and helpers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strand_deque::{DequeResult, Snapshot, VersionedDeque};

/// Builds a deque holding `0..count`.
pub fn filled_deque(count: u64) -> DequeResult<VersionedDeque<u64>> {
    let deque = VersionedDeque::new();
    deque.link_all(0..count)?;
    Ok(deque)
}

/// Generates random values for insertion benchmarks.
pub fn random_values(count: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count).map(|_| rng.gen()).collect()
}

/// Mutates `deque` `rounds` times and opens a snapshot after every round,
/// so each round forks the links it touches. Returns the open snapshots.
pub fn pinned_history(deque: &VersionedDeque<u64>, rounds: u64) -> DequeResult<Vec<Snapshot<u64>>> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..rounds)
        .map(|round| {
            if rng.gen_bool(0.5) {
                deque.append(round)?;
            } else {
                deque.prepend(round)?;
            }
            deque.poll_first()?;
            deque.create_snapshot()
        })
        .collect()
}
