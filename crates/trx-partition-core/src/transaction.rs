//! Transaction record types.
//!
//! A transaction belongs to exactly one partition day (`trx_date`). The
//! logical primary key is `(id, trx_date)`: an ID may recur on different days
//! but never within one.

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StatusError;
use crate::{PartitionName, TransactionId};

/// Sub-second digits kept on `trx_timestamp` (the precision of `TIMESTAMPTZ`).
const TIMESTAMP_PRECISION: u16 = 6;

/// A single transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID, unique within `trx_date`.
    pub id: TransactionId,

    /// The user the transaction belongs to.
    pub user_id: String,

    /// Free-form payload.
    pub info: String,

    /// Processing status.
    pub status: TransactionStatus,

    /// Partition key: the UTC day of the transaction.
    pub trx_date: NaiveDate,

    /// Event time, used to pick the latest row on fetch.
    pub trx_timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Create a successful transaction at `at` with a generated ID.
    ///
    /// `trx_date` is the UTC day of `at`.
    #[must_use]
    pub fn new(user_id: impl Into<String>, info: impl Into<String>, at: DateTime<Utc>) -> Self {
        let trx_timestamp = at.trunc_subsecs(TIMESTAMP_PRECISION);
        Self {
            id: TransactionId::generate(),
            user_id: user_id.into(),
            info: info.into(),
            status: TransactionStatus::Success,
            trx_date: trx_timestamp.date_naive(),
            trx_timestamp,
        }
    }

    /// Create a synthetic transaction for load generation.
    ///
    /// The payload records the iteration number so generated batches are
    /// distinguishable when fetched back.
    #[must_use]
    pub fn sample(iteration: usize, user_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(user_id, format!(r#"{{"iteration": {iteration}}}"#), at)
    }

    /// Replace the generated ID with a caller-supplied one.
    #[must_use]
    pub fn with_id(mut self, id: TransactionId) -> Self {
        self.id = id;
        self
    }

    /// Set the status.
    #[must_use]
    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    /// The child table this transaction is routed to.
    #[must_use]
    pub fn partition(&self) -> PartitionName {
        PartitionName::for_date(self.trx_date)
    }
}

/// Status of a transaction, stored as an upper-case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Completed successfully.
    Success,

    /// Accepted but not settled.
    Pending,

    /// Rejected or failed.
    Failed,
}

impl TransactionStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Pending => "PENDING",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(Self::Success),
            "PENDING" => Ok(Self::Pending),
            "FAILED" => Ok(Self::Failed),
            other => Err(StatusError(other.to_string())),
        }
    }
}
