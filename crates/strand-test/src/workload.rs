//! Workload generators.
//!
//! Produces seeded, reproducible operation sequences for the model checker
//! and the stress tests.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// One operation against a deque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Append a value at the back.
    Append(u64),
    /// Prepend a value at the front.
    Prepend(u64),
    /// Poll the first element.
    PollFirst,
    /// Poll the last element.
    PollLast,
    /// Unlink the live element at this index, modulo the length.
    UnlinkAt(usize),
    /// Open a plain snapshot.
    OpenSnapshot,
    /// Open a poll-mode snapshot draining at most this many elements.
    /// `None` drains everything.
    OpenPollSnapshot(Option<usize>),
    /// Close the open snapshot at this index, modulo the count.
    CloseSnapshot(usize),
}

/// Relative weights of the generated operations.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Number of operations.
    pub ops: usize,
    /// Random seed.
    pub seed: u64,
    /// Weight of appends and prepends combined.
    pub insert_weight: u32,
    /// Weight of polls and unlinks combined.
    pub remove_weight: u32,
    /// Weight of snapshot opens and closes combined.
    pub snapshot_weight: u32,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            ops: 1_000,
            seed: 42,
            insert_weight: 5,
            remove_weight: 4,
            snapshot_weight: 2,
        }
    }
}

/// Generates a reproducible operation sequence.
pub fn generate(config: &WorkloadConfig) -> Vec<Op> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let total = config.insert_weight + config.remove_weight + config.snapshot_weight;
    let mut next_value = 0u64;

    (0..config.ops)
        .map(|_| {
            let pick = rng.gen_range(0..total.max(1));
            if pick < config.insert_weight {
                next_value += 1;
                if rng.gen_bool(0.5) {
                    Op::Append(next_value)
                } else {
                    Op::Prepend(next_value)
                }
            } else if pick < config.insert_weight + config.remove_weight {
                match rng.gen_range(0..3) {
                    0 => Op::PollFirst,
                    1 => Op::PollLast,
                    _ => Op::UnlinkAt(rng.gen()),
                }
            } else {
                match rng.gen_range(0..5) {
                    0 | 1 => Op::OpenSnapshot,
                    2 => Op::OpenPollSnapshot(rng.gen_bool(0.5).then(|| rng.gen_range(0..4))),
                    _ => Op::CloseSnapshot(rng.gen()),
                }
            }
        })
        .collect()
}

/// Generates `count` distinct values in random order.
pub fn shuffled_values(count: u64, seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values: Vec<u64> = (0..count).collect();
    values.shuffle(&mut rng);
    values
}
