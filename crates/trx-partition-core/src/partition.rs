//! Partition naming.
//!
//! A [`PartitionName`] is the identity of the child table that holds one UTC
//! calendar day of transactions. Names are derived, never chosen: the same day
//! always yields the same name, and a name can be parsed back into its day.
//!
//! Names end up interpolated into DDL (table identifiers cannot be bound
//! parameters), so [`PartitionName::parse`] only accepts the exact canonical
//! form produced by [`PartitionName::for_date`].

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PartitionNameError;

/// Prefix shared by every child table of the partitioned parent.
pub const PARTITION_PREFIX: &str = "transaction_partition_";

/// Canonical identity of a day's child table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartitionName {
    name: String,
    date: NaiveDate,
}

impl PartitionName {
    /// Name of the partition a point in time belongs to.
    ///
    /// The timestamp is normalized to UTC before truncating to the day, so two
    /// instants on the same UTC day map to the same name regardless of the
    /// offset they were expressed in.
    #[must_use]
    pub fn for_timestamp<Tz: TimeZone>(at: DateTime<Tz>) -> Self {
        Self::for_date(at.with_timezone(&Utc).date_naive())
    }

    /// Name of the partition holding `date`.
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        let name = format!(
            "{PARTITION_PREFIX}y{:04}_m{:02}_d{:02}",
            date.year(),
            date.month(),
            date.day()
        );
        Self { name, date }
    }

    /// Parse a canonical partition name.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionNameError::NotCanonical`] unless the input is exactly
    /// `transaction_partition_y<YYYY>_m<MM>_d<DD>` with ASCII digits, and
    /// [`PartitionNameError::InvalidDate`] if the digits do not form a real day.
    pub fn parse(s: &str) -> Result<Self, PartitionNameError> {
        let not_canonical = || PartitionNameError::NotCanonical(s.to_string());

        let rest = s.strip_prefix(PARTITION_PREFIX).ok_or_else(not_canonical)?;
        let rest = rest.strip_prefix('y').ok_or_else(not_canonical)?;
        let (year, rest) = split_digits(rest, 4).ok_or_else(not_canonical)?;
        let rest = rest.strip_prefix("_m").ok_or_else(not_canonical)?;
        let (month, rest) = split_digits(rest, 2).ok_or_else(not_canonical)?;
        let rest = rest.strip_prefix("_d").ok_or_else(not_canonical)?;
        let (day, rest) = split_digits(rest, 2).ok_or_else(not_canonical)?;
        if !rest.is_empty() {
            return Err(not_canonical());
        }

        let date = i32::try_from(year)
            .ok()
            .and_then(|y| NaiveDate::from_ymd_opt(y, month, day))
            .ok_or_else(|| PartitionNameError::InvalidDate(s.to_string()))?;

        Ok(Self {
            name: s.to_string(),
            date,
        })
    }

    /// The child table identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The single partition-key value this child table accepts.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Split exactly `width` leading ASCII digits off `s`.
fn split_digits(s: &str, width: usize) -> Option<(u32, &str)> {
    let digits = s.get(..width)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, &s[width..]))
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for PartitionName {
    type Err = PartitionNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PartitionName {
    type Error = PartitionNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PartitionName> for String {
    fn from(name: PartitionName) -> Self {
        name.name
    }
}

impl AsRef<str> for PartitionName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}
