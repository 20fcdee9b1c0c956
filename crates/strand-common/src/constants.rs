//! System-wide constants for strand.
//!
//! This module defines default values and hard limits for a versioned deque.

// =============================================================================
// Deque Constants
// =============================================================================

/// Default deque name, used in log events and disposal callbacks.
pub const DEFAULT_DEQUE_NAME: &str = "deque";

/// Largest capacity a deque can be configured with.
///
/// Node handles address the arena with a `u32` index and two slots are
/// reserved for the sentinels.
pub const MAX_DEQUE_CAPACITY: usize = (u32::MAX - 2) as usize;

// =============================================================================
// Reclamation Constants
// =============================================================================

/// Default upper bound on obsolete links drained in one reclamation pass.
///
/// Entries left over by a bounded pass are drained by the next pass, which
/// runs on the next snapshot close or mutation.
pub const DEFAULT_RECLAIM_BATCH: usize = 1024;

/// Smallest accepted reclamation batch.
pub const MIN_RECLAIM_BATCH: usize = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        assert!(MAX_DEQUE_CAPACITY < u32::MAX as usize);
        assert!(DEFAULT_RECLAIM_BATCH >= MIN_RECLAIM_BATCH);
        assert!(!DEFAULT_DEQUE_NAME.is_empty());
    }
}
