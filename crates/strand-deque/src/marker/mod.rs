//! Version markers and the modification timeline.
//!
//! The timeline owns the deque's modification version, the snapshot
//! baseline and the set of pinned [`VersionMarker`]s. Markers are kept in a
//! `BTreeMap` keyed by version so the oldest pinned version, which bounds
//! reclamation, is always the first entry.
//!
//! # Version advancement
//!
//! ```text
//!   modification: v4      baseline: -        (no snapshot open)
//!   open S1               baseline: v4       S1 pinned at v4
//!   open S2               baseline: v4       S1, S2 share marker v4
//!   append                modification: v5   baseline cleared
//!   open S3               baseline: v5       S3 pinned at v5
//! ```
//!
//! A mutation that starts while a baseline is pinned at or past the current
//! modification version mints a fresh version, so every link it creates is
//! strictly newer than every open snapshot.

use std::collections::{BTreeMap, BTreeSet};

use strand_common::types::{SnapshotId, Version};

/// One point of the timeline and the snapshots pinned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMarker {
    version: Version,
    snapshots: BTreeSet<SnapshotId>,
}

impl VersionMarker {
    fn new(version: Version) -> Self {
        Self {
            version,
            snapshots: BTreeSet::new(),
        }
    }

    /// Returns the pinned version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the number of snapshots pinned to this marker.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Checks if `snapshot` is pinned to this marker.
    pub fn contains(&self, snapshot: SnapshotId) -> bool {
        self.snapshots.contains(&snapshot)
    }
}

/// Modification timeline of one deque.
#[derive(Debug)]
pub(crate) struct Timeline {
    modification: Version,
    baseline: Option<Version>,
    markers: BTreeMap<Version, VersionMarker>,
}

impl Timeline {
    pub(crate) fn new() -> Self {
        Self {
            modification: Version::INITIAL,
            baseline: None,
            markers: BTreeMap::new(),
        }
    }

    /// Current modification version, without advancing it.
    pub(crate) fn current(&self) -> Version {
        self.modification
    }

    pub(crate) fn baseline(&self) -> Option<Version> {
        self.baseline
    }

    /// Returns the version a mutation starting now must stamp its links with.
    pub(crate) fn modification_version(&mut self) -> Version {
        if let Some(baseline) = self.baseline {
            if baseline >= self.modification {
                self.modification = baseline.next();
                self.baseline = None;
            }
        }
        self.modification
    }

    /// Pins the current modification version for `snapshot`, making it the
    /// baseline if none is pinned yet.
    pub(crate) fn pin(&mut self, snapshot: SnapshotId) -> Version {
        let version = *self.baseline.get_or_insert(self.modification);
        self.markers
            .entry(version)
            .or_insert_with(|| VersionMarker::new(version))
            .snapshots
            .insert(snapshot);
        version
    }

    /// Releases `snapshot`'s pin on `version`.
    ///
    /// Returns `true` when the snapshot was the marker's last referent and
    /// the marker was dropped.
    pub(crate) fn unpin(&mut self, version: Version, snapshot: SnapshotId) -> bool {
        let Some(marker) = self.markers.get_mut(&version) else {
            return false;
        };
        marker.snapshots.remove(&snapshot);
        if !marker.snapshots.is_empty() {
            return false;
        }
        self.markers.remove(&version);
        if self.baseline == Some(version) {
            self.baseline = None;
        }
        true
    }

    /// Smallest pinned version, or [`Version::MAX`] if nothing is pinned.
    pub(crate) fn min_pinned(&self) -> Version {
        self.markers
            .first_key_value()
            .map_or(Version::MAX, |(version, _)| *version)
    }

    /// Checks if some open snapshot can resolve to a link created on
    /// `created_on`.
    pub(crate) fn is_observed(&self, created_on: Version) -> bool {
        self.markers
            .last_key_value()
            .is_some_and(|(version, _)| *version >= created_on)
    }

    pub(crate) fn pinned_versions(&self) -> Vec<Version> {
        self.markers.keys().copied().collect()
    }

    pub(crate) fn markers(&self) -> impl Iterator<Item = &VersionMarker> + '_ {
        self.markers.values()
    }

    pub(crate) fn snapshot_count(&self) -> usize {
        self.markers.values().map(VersionMarker::snapshot_count).sum()
    }

    pub(crate) fn clear(&mut self) {
        self.markers.clear();
        self.baseline = None;
    }
}
