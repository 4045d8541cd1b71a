//! In-memory backend.
//!
//! `MemoryStore` emulates the catalog and row semantics of the PostgreSQL
//! backend closely enough to exercise every write path without a database:
//! tables must be created before use, the partitioned parent only accepts
//! rows for days with a child table, and `(id, trx_date)` is enforced as a
//! primary key. It also counts schema and row calls and can be told to fail
//! child creation, which the tests use to observe cache behaviour.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use trx_partition_core::{PartitionName, Transaction, TransactionId};

use crate::error::{Result, StoreError, WriteErrorKind};
use crate::schema::{self, table, TableTarget};
use crate::{PartitionManager, RecordStore};

#[derive(Debug, Default)]
struct Tables {
    base: bool,
    parent: bool,
    children: BTreeSet<PartitionName>,
    flat_rows: Vec<Transaction>,
    partitioned_rows: Vec<Transaction>,
}

impl Tables {
    fn exists(&self, target: TableTarget) -> bool {
        match target {
            TableTarget::Unpartitioned => self.base,
            TableTarget::Partitioned => self.parent,
        }
    }

    fn rows(&self, target: TableTarget) -> &Vec<Transaction> {
        match target {
            TableTarget::Unpartitioned => &self.flat_rows,
            TableTarget::Partitioned => &self.partitioned_rows,
        }
    }

    fn rows_mut(&mut self, target: TableTarget) -> &mut Vec<Transaction> {
        match target {
            TableTarget::Unpartitioned => &mut self.flat_rows,
            TableTarget::Partitioned => &mut self.partitioned_rows,
        }
    }
}

/// In-process backend implementing [`PartitionManager`] and [`RecordStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    child_create_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    fail_child_creation: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `ensure_child_table` calls so far, including failed ones.
    #[must_use]
    pub fn child_create_calls(&self) -> usize {
        self.child_create_calls.load(Ordering::SeqCst)
    }

    /// Number of `insert` calls so far, including rejected ones.
    #[must_use]
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent `ensure_child_table` call fail (or stop failing).
    pub fn fail_child_creation(&self, fail: bool) {
        self.fail_child_creation.store(fail, Ordering::SeqCst);
    }

    /// Child tables that currently exist, in date order.
    pub async fn child_tables(&self) -> Vec<PartitionName> {
        self.tables.read().await.children.iter().cloned().collect()
    }

    /// Number of rows stored in `target`.
    pub async fn row_count(&self, target: TableTarget) -> usize {
        self.tables.read().await.rows(target).len()
    }

    /// Append rows to `target` without key or partition checks.
    ///
    /// Emulates rows left behind by external writers, such as duplicates
    /// from retries against a backend that did not enforce the key.
    pub async fn seed(&self, target: TableTarget, rows: Vec<Transaction>) {
        self.tables.write().await.rows_mut(target).extend(rows);
    }
}

#[async_trait]
impl PartitionManager for MemoryStore {
    async fn ensure_base_table(&self) -> Result<()> {
        self.tables.write().await.base = true;
        Ok(())
    }

    async fn ensure_parent_table(&self) -> Result<()> {
        self.tables.write().await.parent = true;
        Ok(())
    }

    async fn ensure_child_table(&self, day: NaiveDate) -> Result<PartitionName> {
        self.child_create_calls.fetch_add(1, Ordering::SeqCst);
        let name = PartitionName::for_date(day);
        schema::child_table_ddl(&name)?;

        if self.fail_child_creation.load(Ordering::SeqCst) {
            return Err(StoreError::Schema {
                operation: "create child table",
                table: name.to_string(),
                message: "injected failure".into(),
            });
        }

        // Let concurrent creators interleave the way they would on a real
        // connection pool.
        tokio::task::yield_now().await;

        let mut tables = self.tables.write().await;
        if !tables.parent {
            return Err(StoreError::Schema {
                operation: "create child table",
                table: name.to_string(),
                message: format!(
                    "relation \"{}\" does not exist",
                    table::TRANSACTIONS_PARTITIONED
                ),
            });
        }
        tables.children.insert(name.clone());
        Ok(name)
    }

    async fn child_table_exists(&self, name: &PartitionName) -> Result<bool> {
        Ok(self.tables.read().await.children.contains(name))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, target: TableTarget, trx: &Transaction) -> Result<Transaction> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let reject = |kind, message: String| StoreError::Write {
            table: target.table_name(),
            id: trx.id.clone(),
            date: trx.trx_date,
            kind,
            message,
        };

        let mut tables = self.tables.write().await;
        if !tables.exists(target) {
            return Err(reject(
                WriteErrorKind::Backend,
                format!("relation \"{}\" does not exist", target.table_name()),
            ));
        }
        if target == TableTarget::Partitioned
            && !tables.children.contains(&PartitionName::for_date(trx.trx_date))
        {
            return Err(reject(
                WriteErrorKind::MissingPartition,
                format!(
                    "no partition of relation \"{}\" found for row",
                    target.table_name()
                ),
            ));
        }
        if tables
            .rows(target)
            .iter()
            .any(|row| row.id == trx.id && row.trx_date == trx.trx_date)
        {
            return Err(reject(
                WriteErrorKind::DuplicateKey,
                "duplicate key value violates unique constraint".into(),
            ));
        }

        tables.rows_mut(target).push(trx.clone());
        Ok(trx.clone())
    }

    async fn fetch_one(
        &self,
        target: TableTarget,
        id: &TransactionId,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Transaction> {
        let tables = self.tables.read().await;
        if !tables.exists(target) {
            return Err(StoreError::Query {
                operation: "fetch transaction",
                table: target.table_name(),
                message: format!("relation \"{}\" does not exist", target.table_name()),
            });
        }

        tables
            .rows(target)
            .iter()
            .filter(|row| &row.id == id && row.user_id == user_id && row.trx_date == date)
            .max_by_key(|row| row.trx_timestamp)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                id: id.clone(),
                user_id: user_id.to_string(),
                date,
            })
    }
}
