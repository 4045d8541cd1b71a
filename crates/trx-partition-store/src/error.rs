//! Error types for partition and record storage.

use chrono::NaiveDate;
use trx_partition_core::{PartitionNameError, TransactionId};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Why an insert was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteErrorKind {
    /// A row with the same `(id, trx_date)` already exists.
    DuplicateKey,

    /// The partitioned parent has no child table for the row's date.
    MissingPartition,

    /// Any other backend failure.
    Backend,
}

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Could not connect to the backend.
    #[error("database connection failed: {0}")]
    Connection(String),

    /// DDL failed for a reason other than the object already existing.
    #[error("{operation} failed for {table}: {message}")]
    Schema {
        /// The schema operation that failed.
        operation: &'static str,
        /// The table being created or probed.
        table: String,
        /// Backend error message.
        message: String,
    },

    /// An insert was rejected.
    #[error("insert into {table} failed for transaction {id} on {date} ({kind:?}): {message}")]
    Write {
        /// The table the insert targeted.
        table: &'static str,
        /// The transaction ID.
        id: TransactionId,
        /// The transaction's partition key.
        date: NaiveDate,
        /// Classification of the failure.
        kind: WriteErrorKind,
        /// Backend error message.
        message: String,
    },

    /// A read failed in the backend.
    #[error("{operation} on {table} failed: {message}")]
    Query {
        /// The read operation that failed.
        operation: &'static str,
        /// The table being read.
        table: &'static str,
        /// Backend error message.
        message: String,
    },

    /// A fetch matched no rows.
    #[error("transaction not found: id={id}, user_id={user_id}, date={date}")]
    NotFound {
        /// The requested transaction ID.
        id: TransactionId,
        /// The requested user ID.
        user_id: String,
        /// The requested partition key.
        date: NaiveDate,
    },

    /// A partition identity failed validation before reaching the backend.
    #[error("invalid partition: {0}")]
    InvalidPartition(#[from] PartitionNameError),

    /// A stored row could not be mapped back into a transaction.
    #[error("corrupt row in {table}: {message}")]
    Decode {
        /// The table the row came from.
        table: &'static str,
        /// What was wrong with the row.
        message: String,
    },
}

impl StoreError {
    /// Whether this is a primary-key collision on `(id, trx_date)`.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            Self::Write {
                kind: WriteErrorKind::DuplicateKey,
                ..
            }
        )
    }

    /// Whether this is a write routed to a child table that does not exist.
    #[must_use]
    pub fn is_missing_partition(&self) -> bool {
        matches!(
            self,
            Self::Write {
                kind: WriteErrorKind::MissingPartition,
                ..
            }
        )
    }

    /// Whether this is a fetch miss.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
