//! Partition lifecycle and storage layer for day-partitioned transactions.
//!
//! Transactions land either in a flat table or in a parent table partitioned
//! by list on `trx_date`. The backend only routes a row into a partition whose
//! child table already exists, so something has to create one child table per
//! day before that day's first write. This crate owns that lifecycle.
//!
//! # Architecture
//!
//! - [`PartitionManager`]: idempotent DDL (parent, children, flat table) and a
//!   catalog existence probe.
//! - [`RecordStore`]: row insert and point fetch against either table family.
//! - [`PartitionCache`]: memo of child tables known to exist.
//! - [`Ledger`]: the caller-facing operations, including the four
//!   [`InsertStrategy`] write paths.
//!
//! Two backends implement both traits: [`PgStore`] (PostgreSQL via `sqlx`) and
//! [`MemoryStore`] (in-process, for tests and local runs).
//!
//! # Concurrency
//!
//! Child creation is not guarded by an application lock. Concurrent callers
//! may race to create the same day's table; the backend's
//! `CREATE TABLE IF NOT EXISTS` makes every attempt after the first a no-op,
//! and a racing loser is reported as success.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::{TimeZone, Utc};
//! use trx_partition_core::Transaction;
//! use trx_partition_store::{Ledger, MemoryStore, PartitionCache};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let ledger = Ledger::new(Arc::new(MemoryStore::new()), PartitionCache::new());
//! ledger.create_parent_table().await.unwrap();
//!
//! let at = Utc.with_ymd_and_hms(2021, 6, 30, 12, 0, 0).unwrap();
//! let trx = Transaction::new("1", "{}", at);
//! ledger.insert_partitioned_dynamic_cached(&trx).await.unwrap();
//!
//! let fetched = ledger
//!     .fetch_partitioned(&trx.id, "1", trx.trx_date)
//!     .await
//!     .unwrap();
//! assert_eq!(fetched, trx);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod schema;
pub mod strategy;

pub use cache::PartitionCache;
pub use error::{Result, StoreError, WriteErrorKind};
pub use ledger::Ledger;
pub use memory::MemoryStore;
pub use postgres::{PgConfig, PgStore};
pub use schema::TableTarget;
pub use strategy::InsertStrategy;

use async_trait::async_trait;
use chrono::NaiveDate;
use trx_partition_core::{PartitionName, Transaction, TransactionId};

/// Schema operations on the table family.
///
/// Every `ensure_*` operation is idempotent and safe to call concurrently,
/// including for the same day from many callers at once.
#[async_trait]
pub trait PartitionManager: Send + Sync {
    /// Create the flat table and its index if missing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Schema` if the backend rejects the DDL.
    async fn ensure_base_table(&self) -> Result<()>;

    /// Create the partitioned parent and its index if missing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Schema` if the backend rejects the DDL.
    async fn ensure_parent_table(&self) -> Result<()>;

    /// Create the child table bound to `day` if missing.
    ///
    /// Returns the child table's name. An existing table, or losing a race to
    /// another creator, is success.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidPartition` if `day` has no canonical name.
    /// - `StoreError::Schema` if the backend rejects the DDL (for example when
    ///   the parent does not exist).
    async fn ensure_child_table(&self, day: NaiveDate) -> Result<PartitionName>;

    /// Ask the catalog whether `name` exists, bypassing any cache.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Schema` if the catalog query fails.
    async fn child_table_exists(&self, name: &PartitionName) -> Result<bool>;
}

/// Row operations on either table family.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert `trx` and return the row as written.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Write`; see [`WriteErrorKind`] for the
    /// classification of duplicate keys and missing partitions.
    async fn insert(&self, target: TableTarget, trx: &Transaction) -> Result<Transaction>;

    /// Fetch the latest row (by `trx_timestamp`) matching the logical key.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if no row matches.
    /// - `StoreError::Query` if the backend read fails.
    async fn fetch_one(
        &self,
        target: TableTarget,
        id: &TransactionId,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Transaction>;
}
