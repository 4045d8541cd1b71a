//! Insertion strategies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a write reaches storage.
///
/// The strategies trade schema round trips against guarantees:
///
/// | Strategy | Child table creation | Fails when child is missing |
/// |---|---|---|
/// | `Unpartitioned` | none (flat table) | n/a |
/// | `Partitioned` | none | yes |
/// | `PartitionedDynamic` | every write | no |
/// | `PartitionedDynamicCached` | first write per day per process | no |
///
/// `PartitionedDynamicCached` is the production path; the others exist so the
/// cost of partitioning, and of skipping the cache, can be measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertStrategy {
    /// Insert into the flat table.
    Unpartitioned,

    /// Insert into the parent, trusting that the day's child table exists.
    Partitioned,

    /// Create the day's child table (if missing) before every insert.
    PartitionedDynamic,

    /// Create the day's child table only when the cache does not know it.
    #[default]
    PartitionedDynamicCached,
}

impl InsertStrategy {
    /// All strategies.
    pub const ALL: [Self; 4] = [
        Self::Unpartitioned,
        Self::Partitioned,
        Self::PartitionedDynamic,
        Self::PartitionedDynamicCached,
    ];

    /// Stable name used in configuration and requests.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unpartitioned => "unpartitioned",
            Self::Partitioned => "partitioned",
            Self::PartitionedDynamic => "partitioned_dynamic",
            Self::PartitionedDynamicCached => "partitioned_dynamic_cached",
        }
    }

    /// Whether the strategy writes to the partitioned parent.
    #[must_use]
    pub const fn is_partitioned(&self) -> bool {
        !matches!(self, Self::Unpartitioned)
    }
}

impl fmt::Display for InsertStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown insert strategy: {0}")]
pub struct UnknownStrategy(pub String);

impl FromStr for InsertStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}
