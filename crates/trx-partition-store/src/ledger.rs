//! Caller-facing transaction operations.
//!
//! [`Ledger`] ties the partition manager, the record store, and the existence
//! cache together and exposes the write paths described by
//! [`InsertStrategy`].

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use trx_partition_core::{PartitionName, Transaction, TransactionId};

use crate::cache::PartitionCache;
use crate::error::Result;
use crate::schema::TableTarget;
use crate::strategy::InsertStrategy;
use crate::{PartitionManager, RecordStore};

/// Transaction writes and reads over a partition-aware backend.
///
/// Cheap to clone; clones share the backend and the cache.
#[derive(Clone)]
pub struct Ledger {
    partitions: Arc<dyn PartitionManager>,
    records: Arc<dyn RecordStore>,
    cache: PartitionCache,
}

impl Ledger {
    /// Create a ledger over a backend that handles both schema and rows.
    #[must_use]
    pub fn new<B>(backend: Arc<B>, cache: PartitionCache) -> Self
    where
        B: PartitionManager + RecordStore + 'static,
    {
        Self {
            partitions: backend.clone(),
            records: backend,
            cache,
        }
    }

    /// Create a ledger from separate schema and row backends.
    #[must_use]
    pub fn from_parts(
        partitions: Arc<dyn PartitionManager>,
        records: Arc<dyn RecordStore>,
        cache: PartitionCache,
    ) -> Self {
        Self {
            partitions,
            records,
            cache,
        }
    }

    /// The existence cache used by the cached write path.
    #[must_use]
    pub fn cache(&self) -> &PartitionCache {
        &self.cache
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Create the flat table if missing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Schema` if the backend rejects the DDL.
    pub async fn create_base_table(&self) -> Result<()> {
        self.partitions.ensure_base_table().await
    }

    /// Create the partitioned parent if missing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Schema` if the backend rejects the DDL.
    pub async fn create_parent_table(&self) -> Result<()> {
        self.partitions.ensure_parent_table().await
    }

    /// Create `day`'s child table if missing and remember it in the cache.
    ///
    /// # Errors
    ///
    /// Returns the partition manager's error; the cache is left untouched.
    pub async fn create_child_table(&self, day: NaiveDate) -> Result<PartitionName> {
        let name = self.partitions.ensure_child_table(day).await?;
        self.cache.mark_existing(name.clone());
        Ok(name)
    }

    /// Ask the catalog whether `day`'s child table exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Schema` if the catalog query fails.
    pub async fn child_table_exists(&self, day: NaiveDate) -> Result<bool> {
        self.partitions
            .child_table_exists(&PartitionName::for_date(day))
            .await
    }

    /// Create child tables for `from` and the `days` days after it.
    ///
    /// Used at startup so the first writes of upcoming days skip the schema
    /// round trip. Stops at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first partition manager error encountered.
    pub async fn ensure_upcoming_partitions(
        &self,
        from: NaiveDate,
        days: u32,
    ) -> Result<Vec<PartitionName>> {
        let mut created = Vec::new();
        for offset in 0..=i64::from(days) {
            let Some(day) = from.checked_add_signed(Duration::days(offset)) else {
                break;
            };
            created.push(self.create_child_table(day).await?);
        }
        tracing::info!(
            from = %from,
            count = created.len(),
            "Child partitions ensured"
        );
        Ok(created)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write `trx` using `strategy`.
    ///
    /// # Errors
    ///
    /// See the strategy-specific methods.
    pub async fn insert(&self, strategy: InsertStrategy, trx: &Transaction) -> Result<Transaction> {
        match strategy {
            InsertStrategy::Unpartitioned => self.insert_unpartitioned(trx).await,
            InsertStrategy::Partitioned => self.insert_partitioned(trx).await,
            InsertStrategy::PartitionedDynamic => self.insert_partitioned_dynamic(trx).await,
            InsertStrategy::PartitionedDynamicCached => {
                self.insert_partitioned_dynamic_cached(trx).await
            }
        }
    }

    /// Insert into the flat table.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Write` if the insert is rejected.
    pub async fn insert_unpartitioned(&self, trx: &Transaction) -> Result<Transaction> {
        self.records.insert(TableTarget::Unpartitioned, trx).await
    }

    /// Insert into the partitioned parent without creating anything.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Write` with `WriteErrorKind::MissingPartition` if
    /// the day's child table does not exist.
    pub async fn insert_partitioned(&self, trx: &Transaction) -> Result<Transaction> {
        self.records.insert(TableTarget::Partitioned, trx).await
    }

    /// Create the day's child table (if missing), then insert.
    ///
    /// # Errors
    ///
    /// Returns the creation error without inserting, or the insert error.
    pub async fn insert_partitioned_dynamic(&self, trx: &Transaction) -> Result<Transaction> {
        self.partitions.ensure_child_table(trx.trx_date).await?;
        self.insert_partitioned(trx).await
    }

    /// Insert, creating the day's child table only if the cache does not
    /// already know it exists.
    ///
    /// On a miss the child table is ensured, and only once that succeeds is
    /// the name marked in the cache. Two callers missing at the same time both
    /// ensure the table; the backend makes the second a no-op.
    ///
    /// # Errors
    ///
    /// Returns the creation error without inserting and without touching the
    /// cache, or the insert error.
    pub async fn insert_partitioned_dynamic_cached(
        &self,
        trx: &Transaction,
    ) -> Result<Transaction> {
        let name = PartitionName::for_date(trx.trx_date);

        if !self.cache.is_known_existing(&name) {
            tracing::debug!(table = %name, "Partition cache miss");
            let created = self.partitions.ensure_child_table(trx.trx_date).await?;
            self.cache.mark_existing(created);
        }

        self.insert_partitioned(trx).await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetch the latest matching row from the flat table.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if nothing matches.
    /// - `StoreError::Query` if the read fails.
    pub async fn fetch_unpartitioned(
        &self,
        id: &TransactionId,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Transaction> {
        self.records
            .fetch_one(TableTarget::Unpartitioned, id, user_id, date)
            .await
    }

    /// Fetch the latest matching row from the partitioned table.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if nothing matches.
    /// - `StoreError::Query` if the read fails.
    pub async fn fetch_partitioned(
        &self,
        id: &TransactionId,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Transaction> {
        self.records
            .fetch_one(TableTarget::Partitioned, id, user_id, date)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::WriteErrorKind;
    use chrono::{TimeZone, Utc};
    use trx_partition_core::TransactionStatus;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn trx_on(date: NaiveDate, id: &str) -> Transaction {
        let at = Utc.from_utc_datetime(&date.and_hms_opt(10, 30, 0).unwrap());
        Transaction::new("1", r#"{"iteration": 0}"#, at).with_id(id.parse().unwrap())
    }

    async fn ledger() -> (Ledger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(store.clone(), PartitionCache::new());
        ledger.create_base_table().await.unwrap();
        ledger.create_parent_table().await.unwrap();
        (ledger, store)
    }

    #[tokio::test]
    async fn unpartitioned_round_trip() {
        let (ledger, _) = ledger().await;
        let trx = trx_on(day(2021, 6, 30), "A");

        let written = ledger.insert_unpartitioned(&trx).await.unwrap();
        assert_eq!(written, trx);

        let fetched = ledger
            .fetch_unpartitioned(&trx.id, "1", trx.trx_date)
            .await
            .unwrap();
        assert_eq!(fetched, trx);
    }

    #[tokio::test]
    async fn assume_exists_fails_without_child_and_creates_nothing() {
        let (ledger, store) = ledger().await;
        let trx = trx_on(day(2021, 6, 30), "A");

        let err = ledger.insert_partitioned(&trx).await.unwrap_err();
        assert!(err.is_missing_partition(), "{err}");
        assert_eq!(store.child_create_calls(), 0);
        assert!(!ledger.child_table_exists(trx.trx_date).await.unwrap());
    }

    #[tokio::test]
    async fn assume_exists_succeeds_after_eager_creation() {
        let (ledger, _) = ledger().await;
        let trx = trx_on(day(2020, 12, 31), "A");

        ledger.create_child_table(trx.trx_date).await.unwrap();
        ledger.insert_partitioned(&trx).await.unwrap();
        let fetched = ledger
            .fetch_partitioned(&trx.id, "1", trx.trx_date)
            .await
            .unwrap();
        assert_eq!(fetched, trx);
    }

    #[tokio::test]
    async fn dynamic_creates_on_every_write() {
        let (ledger, store) = ledger().await;
        let date = day(2021, 6, 30);

        for i in 0..3 {
            let trx = trx_on(date, &format!("trx-{i}"));
            ledger.insert_partitioned_dynamic(&trx).await.unwrap();
        }

        assert_eq!(store.child_create_calls(), 3);
        assert_eq!(store.child_tables().await.len(), 1);
        assert!(ledger.cache().is_empty());
    }

    #[tokio::test]
    async fn cached_creates_once_per_day() {
        let (ledger, store) = ledger().await;
        let date = day(2021, 6, 30);

        ledger
            .insert_partitioned_dynamic_cached(&trx_on(date, "first"))
            .await
            .unwrap();
        assert_eq!(store.child_create_calls(), 1);

        for i in 0..10 {
            let trx = trx_on(date, &format!("trx-{i}"));
            ledger.insert_partitioned_dynamic_cached(&trx).await.unwrap();
        }
        assert_eq!(store.child_create_calls(), 1);
        assert!(ledger
            .cache()
            .is_known_existing(&PartitionName::for_date(date)));

        ledger
            .insert_partitioned_dynamic_cached(&trx_on(day(2021, 7, 1), "next-day"))
            .await
            .unwrap();
        assert_eq!(store.child_create_calls(), 2);
        assert_eq!(store.child_tables().await.len(), 2);
    }

    #[tokio::test]
    async fn cached_failure_leaves_cache_untouched_and_skips_insert() {
        let (ledger, store) = ledger().await;
        let trx = trx_on(day(2021, 6, 30), "A");

        store.fail_child_creation(true);
        let err = ledger
            .insert_partitioned_dynamic_cached(&trx)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::StoreError::Schema { .. }), "{err}");
        assert!(ledger.cache().is_empty());
        assert_eq!(store.insert_calls(), 0);

        // The next call retries creation because nothing was cached.
        store.fail_child_creation(false);
        ledger.insert_partitioned_dynamic_cached(&trx).await.unwrap();
        assert_eq!(store.child_create_calls(), 2);
        assert_eq!(ledger.cache().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_key_is_a_write_error() {
        let (ledger, _) = ledger().await;
        let trx = trx_on(day(2021, 6, 30), "A");

        for strategy in [
            InsertStrategy::Unpartitioned,
            InsertStrategy::PartitionedDynamicCached,
        ] {
            ledger.insert(strategy, &trx).await.unwrap();
            let err = ledger.insert(strategy, &trx).await.unwrap_err();
            assert!(err.is_duplicate(), "{strategy}: {err}");
        }
    }

    #[tokio::test]
    async fn duplicate_id_on_another_day_is_allowed() {
        let (ledger, _) = ledger().await;
        let a = trx_on(day(2021, 6, 30), "A");
        let b = trx_on(day(2021, 7, 1), "A");

        ledger.insert_partitioned_dynamic_cached(&a).await.unwrap();
        ledger.insert_partitioned_dynamic_cached(&b).await.unwrap();
        assert_eq!(
            ledger
                .fetch_partitioned(&b.id, "1", b.trx_date)
                .await
                .unwrap(),
            b
        );
    }

    #[tokio::test]
    async fn fetch_miss_is_not_found() {
        let (ledger, _) = ledger().await;
        ledger.create_child_table(day(2021, 6, 30)).await.unwrap();

        let id: TransactionId = "nope".parse().unwrap();
        let err = ledger
            .fetch_partitioned(&id, "1", day(2021, 6, 30))
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{err}");

        let err = ledger
            .fetch_unpartitioned(&id, "1", day(2021, 6, 30))
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[tokio::test]
    async fn fetch_filters_on_user() {
        let (ledger, _) = ledger().await;
        let trx = trx_on(day(2021, 6, 30), "A");
        ledger.insert_unpartitioned(&trx).await.unwrap();

        let err = ledger
            .fetch_unpartitioned(&trx.id, "2", trx.trx_date)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn fetch_returns_latest_timestamp() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(store.clone(), PartitionCache::new());
        ledger.create_base_table().await.unwrap();

        // The flat table's key allows this only through a backend that does
        // not enforce it; emulate rows left behind by retries.
        let date = day(2021, 6, 30);
        let early = trx_on(date, "A");
        let mut late = early.clone().with_status(TransactionStatus::Failed);
        late.trx_timestamp += Duration::minutes(5);
        store
            .seed(TableTarget::Unpartitioned, vec![late.clone(), early])
            .await;

        let fetched = ledger
            .fetch_unpartitioned(&late.id, "1", date)
            .await
            .unwrap();
        assert_eq!(fetched, late);
    }

    #[tokio::test]
    async fn strategy_dispatch_targets_expected_table() {
        let (ledger, store) = ledger().await;
        let date = day(2021, 6, 30);

        ledger
            .insert(InsertStrategy::Unpartitioned, &trx_on(date, "flat"))
            .await
            .unwrap();
        assert_eq!(store.row_count(TableTarget::Unpartitioned).await, 1);
        assert_eq!(store.row_count(TableTarget::Partitioned).await, 0);

        let err = ledger
            .insert(InsertStrategy::Partitioned, &trx_on(date, "p"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::StoreError::Write {
                kind: WriteErrorKind::MissingPartition,
                ..
            }
        ));

        ledger
            .insert(InsertStrategy::PartitionedDynamic, &trx_on(date, "pd"))
            .await
            .unwrap();
        ledger
            .insert(InsertStrategy::Partitioned, &trx_on(date, "p"))
            .await
            .unwrap();
        assert_eq!(store.row_count(TableTarget::Partitioned).await, 2);
    }

    #[tokio::test]
    async fn upcoming_partitions_are_created_and_cached() {
        let (ledger, store) = ledger().await;
        let from = day(2021, 6, 29);

        let names = ledger.ensure_upcoming_partitions(from, 2).await.unwrap();
        assert_eq!(
            names.iter().map(PartitionName::as_str).collect::<Vec<_>>(),
            [
                "transaction_partition_y2021_m06_d29",
                "transaction_partition_y2021_m06_d30",
                "transaction_partition_y2021_m07_d01",
            ]
        );
        assert_eq!(ledger.cache().len(), 3);

        ledger
            .insert_partitioned_dynamic_cached(&trx_on(day(2021, 7, 1), "A"))
            .await
            .unwrap();
        assert_eq!(store.child_create_calls(), 3);
    }

    #[tokio::test]
    async fn concurrent_cached_inserts_same_day() {
        let (ledger, store) = ledger().await;
        let date = day(2021, 6, 30);

        let writes = (0..32).map(|i| {
            let ledger = ledger.clone();
            async move {
                ledger
                    .insert_partitioned_dynamic_cached(&trx_on(date, &format!("trx-{i}")))
                    .await
            }
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }

        assert_eq!(store.child_tables().await.len(), 1);
        assert_eq!(store.row_count(TableTarget::Partitioned).await, 32);
        assert_eq!(ledger.cache().len(), 1);
    }

    /// Schema backend that counts calls and forwards to a `MemoryStore`.
    struct CountingManager {
        inner: Arc<MemoryStore>,
        ensure_calls: std::sync::atomic::AtomicUsize,
        exists_calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PartitionManager for CountingManager {
        async fn ensure_base_table(&self) -> Result<()> {
            self.inner.ensure_base_table().await
        }

        async fn ensure_parent_table(&self) -> Result<()> {
            self.inner.ensure_parent_table().await
        }

        async fn ensure_child_table(&self, day: NaiveDate) -> Result<PartitionName> {
            self.ensure_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.ensure_child_table(day).await
        }

        async fn child_table_exists(&self, name: &PartitionName) -> Result<bool> {
            self.exists_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.child_table_exists(name).await
        }
    }

    #[tokio::test]
    async fn split_backends_route_schema_and_rows() {
        use std::sync::atomic::Ordering;

        let store = Arc::new(MemoryStore::new());
        let manager = Arc::new(CountingManager {
            inner: store.clone(),
            ensure_calls: 0.into(),
            exists_calls: 0.into(),
        });
        let ledger = Ledger::from_parts(manager.clone(), store.clone(), PartitionCache::new());
        ledger.create_base_table().await.unwrap();
        ledger.create_parent_table().await.unwrap();

        let date = day(2021, 6, 30);
        for i in 0..5 {
            let trx = trx_on(date, &format!("split-{i}"));
            ledger.insert_partitioned_dynamic_cached(&trx).await.unwrap();
        }
        assert_eq!(manager.ensure_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.row_count(TableTarget::Partitioned).await, 5);

        for i in 0..3 {
            let trx = trx_on(date, &format!("dynamic-{i}"));
            ledger.insert_partitioned_dynamic(&trx).await.unwrap();
        }
        assert_eq!(manager.ensure_calls.load(Ordering::SeqCst), 4);

        assert!(ledger.child_table_exists(date).await.unwrap());
        assert!(!ledger.child_table_exists(day(2021, 7, 1)).await.unwrap());
        assert_eq!(manager.exists_calls.load(Ordering::SeqCst), 2);
    }
}
