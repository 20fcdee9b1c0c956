//! strand performance benchmarks
//!
//! Benchmarks for the versioned deque:
//! - Linking and polling with and without open snapshots
//! - Snapshot creation and iteration
//! - Poll snapshots
//! - Reclamation after long-lived snapshots close
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p strand-bench
//! ```

pub mod utils;
