//! Table names and DDL.
//!
//! The unpartitioned table and the partitioned parent share one row shape and
//! the same `(id, trx_date)` primary key. Child tables of the parent are
//! created per day by [`child_table_ddl`].

use trx_partition_core::{PartitionName, PartitionNameError};

/// Table names.
pub mod table {
    /// Flat, unpartitioned transactions table.
    pub const TRANSACTIONS: &str = "transactions";

    /// Parent of the per-day child tables, partitioned by list on `trx_date`.
    pub const TRANSACTIONS_PARTITIONED: &str = "transactions_partitioned";
}

/// Which table family a record operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableTarget {
    /// The flat table.
    Unpartitioned,

    /// The partitioned parent; the backend routes rows to the day's child.
    Partitioned,
}

impl TableTarget {
    /// Name of the table this target writes to and reads from.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Unpartitioned => table::TRANSACTIONS,
            Self::Partitioned => table::TRANSACTIONS_PARTITIONED,
        }
    }
}

/// Create the flat table.
pub const CREATE_TRANSACTIONS: &str = r#"CREATE TABLE IF NOT EXISTS "transactions" (
    "id" VARCHAR NOT NULL,
    "user_id" VARCHAR NOT NULL,
    "info" VARCHAR NOT NULL,
    "status" VARCHAR NOT NULL,
    "trx_date" DATE NOT NULL,
    "trx_timestamp" TIMESTAMP WITH TIME ZONE NOT NULL,
    PRIMARY KEY ("id", "trx_date")
)"#;

/// Lookup index for the flat table.
pub const CREATE_TRANSACTIONS_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_transactions_id_trx_date_timestamp \
     ON transactions (id, user_id, trx_date, trx_timestamp DESC)";

/// Create the partitioned parent.
pub const CREATE_TRANSACTIONS_PARTITIONED: &str = r#"CREATE TABLE IF NOT EXISTS "transactions_partitioned" (
    "id" VARCHAR NOT NULL,
    "user_id" VARCHAR NOT NULL,
    "info" VARCHAR NOT NULL,
    "status" VARCHAR NOT NULL,
    "trx_date" DATE NOT NULL,
    "trx_timestamp" TIMESTAMP WITH TIME ZONE NOT NULL,
    PRIMARY KEY ("id", "trx_date")
) PARTITION BY LIST ("trx_date")"#;

/// Lookup index for the parent. Declared on the parent, it is created on
/// every child as well, including children attached later.
pub const CREATE_TRANSACTIONS_PARTITIONED_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_transactions_partitioned_id_trx_date_timestamp \
     ON transactions_partitioned (id, user_id, trx_date, trx_timestamp DESC)";

/// Statements that bootstrap the flat table.
pub const BASE_TABLE_STATEMENTS: [&str; 2] = [CREATE_TRANSACTIONS, CREATE_TRANSACTIONS_INDEX];

/// Statements that bootstrap the partitioned parent.
pub const PARENT_TABLE_STATEMENTS: [&str; 2] = [
    CREATE_TRANSACTIONS_PARTITIONED,
    CREATE_TRANSACTIONS_PARTITIONED_INDEX,
];

/// Build the DDL that creates `name`'s child table if it is missing.
///
/// Neither the table identifier nor the partition bound can be a bound
/// parameter, so the name is re-validated against the canonical pattern and
/// the bound literal is rendered from the parsed date.
///
/// # Errors
///
/// Returns an error if `name` is not a canonical partition name.
pub fn child_table_ddl(name: &PartitionName) -> Result<String, PartitionNameError> {
    let checked = PartitionName::parse(name.as_str())?;
    Ok(format!(
        r#"CREATE TABLE IF NOT EXISTS "{table}" PARTITION OF "{parent}" FOR VALUES IN ('{bound}')"#,
        table = checked.as_str(),
        parent = table::TRANSACTIONS_PARTITIONED,
        bound = checked.date().format("%Y-%m-%d"),
    ))
}
