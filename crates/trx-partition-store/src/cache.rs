//! Partition existence cache.
//!
//! A memo of child tables this process has successfully created (or confirmed
//! via an idempotent create). It lets the cached insert path skip the schema
//! round trip for every write after the first one of a day.
//!
//! # Staleness
//!
//! The cache records "creation succeeded here", not the live state of the
//! catalog. If a child table is dropped out of band, entries for it stay
//! `true` and writes routed through the cache will fail with a missing
//! partition until the process restarts. Partition retention is not managed
//! by this crate, so no invalidation path exists.

use std::sync::Arc;

use dashmap::DashSet;
use trx_partition_core::PartitionName;

/// Concurrent, write-once set of child tables known to exist.
///
/// Cloning is cheap and clones share the same entries, so one cache can be
/// created at startup and handed to every component that needs it.
#[derive(Debug, Clone, Default)]
pub struct PartitionCache {
    known: Arc<DashSet<PartitionName>>,
}

impl PartitionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` was previously marked as existing.
    ///
    /// Absence means unknown, not missing.
    #[must_use]
    pub fn is_known_existing(&self, name: &PartitionName) -> bool {
        self.known.contains(name)
    }

    /// Record that `name` exists. Idempotent.
    pub fn mark_existing(&self, name: PartitionName) {
        self.known.insert(name);
    }

    /// Number of child tables known to exist.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Whether nothing has been marked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
