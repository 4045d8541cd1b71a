//! Core types for day-partitioned transaction storage.
//!
//! This crate provides the foundational types shared by the store and the HTTP service:
//!
//! - **Identifiers**: `TransactionId`
//! - **Records**: `Transaction`, `TransactionStatus`
//! - **Partitions**: `PartitionName`, the canonical child-table identity for one UTC day
//!
//! # Partition naming
//!
//! Every calendar day (UTC) maps to exactly one child table of the partitioned
//! parent, named `transaction_partition_y<YYYY>_m<MM>_d<DD>`:
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use trx_partition_core::PartitionName;
//!
//! let at = Utc.with_ymd_and_hms(2021, 6, 30, 23, 59, 59).unwrap();
//! assert_eq!(
//!     PartitionName::for_timestamp(at).as_str(),
//!     "transaction_partition_y2021_m06_d30"
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod partition;
pub mod transaction;

pub use error::{IdError, PartitionNameError, StatusError};
pub use ids::TransactionId;
pub use partition::{PartitionName, PARTITION_PREFIX};
pub use transaction::{Transaction, TransactionStatus};
