//! Error types for core domain values.

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The identifier is empty.
    #[error("identifier must not be empty")]
    Empty,

    /// The identifier exceeds the column width.
    #[error("identifier too long: {len} bytes (max {max})")]
    TooLong {
        /// Length of the rejected input in bytes.
        len: usize,
        /// Maximum accepted length in bytes.
        max: usize,
    },

    /// The identifier contains control characters.
    #[error("identifier contains control characters")]
    ControlCharacter,
}

/// Errors that can occur when validating a partition identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartitionNameError {
    /// The name does not follow `transaction_partition_y<YYYY>_m<MM>_d<DD>`.
    #[error("not a canonical partition name: {0:?}")]
    NotCanonical(String),

    /// The name is well formed but names a day that does not exist.
    #[error("partition name {0:?} does not name a calendar day")]
    InvalidDate(String),
}

/// Errors that can occur when parsing a transaction status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transaction status: {0}")]
pub struct StatusError(pub String);
