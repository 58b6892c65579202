//! Core types for calendar-bucketed aggregation.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign};
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime, UtcOffset};

use crate::error::{ContractError, InvalidGroupTypeError, ParseError};

/// A numeric record value or bucket total.
///
/// Integer sums stay integral and fall back to floating point only on
/// overflow; mixing in any float makes the sum a float. Serializes as a bare
/// number, so an integral total renders as `5906586` rather than `5906586.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum Amount {
    /// Whole number.
    Int(i64),
    /// Floating point number.
    Float(f64),
}

impl Amount {
    /// The additive identity.
    pub const ZERO: Amount = Amount::Int(0);

    /// Value as `f64` (lossy for very large integers).
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Amount::Int(v) => v as f64,
            Amount::Float(v) => v,
        }
    }

    /// Returns true if this is an integer amount.
    #[must_use]
    pub fn is_int(self) -> bool {
        matches!(self, Amount::Int(_))
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::ZERO
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        match (self, rhs) {
            (Amount::Int(a), Amount::Int(b)) => a
                .checked_add(b)
                .map_or_else(|| Amount::Float(a as f64 + b as f64), Amount::Int),
            (a, b) => Amount::Float(a.as_f64() + b.as_f64()),
        }
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        *self = *self + rhs;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl From<i64> for Amount {
    fn from(v: i64) -> Self {
        Amount::Int(v)
    }
}

impl From<i32> for Amount {
    fn from(v: i32) -> Self {
        Amount::Int(v.into())
    }
}

impl From<u32> for Amount {
    fn from(v: u32) -> Self {
        Amount::Int(v.into())
    }
}

impl From<f64> for Amount {
    fn from(v: f64) -> Self {
        Amount::Float(v)
    }
}

impl FromStr for Amount {
    type Err = ParseError;

    /// Parse an integer first, then a finite float.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(v) = s.parse::<i64>() {
            return Ok(Amount::Int(v));
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Amount::Float(v)),
            _ => Err(ParseError::InvalidAmount(s.to_string())),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Int(v) => fmt::Display::fmt(v, f),
            Amount::Float(v) => fmt::Display::fmt(v, f),
        }
    }
}

/// A timestamped numeric record, as owned by a record store.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record {
    /// When the record happened.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    /// The record's value.
    pub value: Amount,
}

impl Record {
    /// Create a record.
    pub fn new(timestamp: OffsetDateTime, value: impl Into<Amount>) -> Self {
        Self {
            timestamp,
            value: value.into(),
        }
    }
}

/// A calendar component that can take part in a bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CalendarField {
    Year,
    Month,
    Day,
    Hour,
}

impl CalendarField {
    /// Lowercase name of the field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarField::Year => "year",
            CalendarField::Month => "month",
            CalendarField::Day => "day",
            CalendarField::Hour => "hour",
        }
    }
}

impl fmt::Display for CalendarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket granularity.
///
/// Variants are ordered coarsest first, so `GroupType::Year < GroupType::Hour`.
/// Each variant groups on a cumulative prefix of
/// `[Year, Month, Day, Hour]`.
///
/// # Examples
///
/// ```
/// use tally_types::{CalendarField, GroupType};
///
/// let group: GroupType = "month".parse().unwrap();
/// assert_eq!(group, GroupType::Month);
/// assert_eq!(group.key_fields(), &[CalendarField::Year, CalendarField::Month]);
/// assert!("week".parse::<GroupType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GroupType {
    Year,
    Month,
    Day,
    Hour,
}

const ALL_FIELDS: [CalendarField; 4] = [
    CalendarField::Year,
    CalendarField::Month,
    CalendarField::Day,
    CalendarField::Hour,
];

impl GroupType {
    /// Every group type, coarsest first.
    pub const ALL: [GroupType; 4] = [
        GroupType::Year,
        GroupType::Month,
        GroupType::Day,
        GroupType::Hour,
    ];

    /// Every accepted literal, coarsest first.
    pub const VALUES: &'static [&'static str] = &["year", "month", "day", "hour"];

    /// The literal for this group type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Year => "year",
            GroupType::Month => "month",
            GroupType::Day => "day",
            GroupType::Hour => "hour",
        }
    }

    /// Calendar components that form a bucket key, in key order.
    #[must_use]
    pub fn key_fields(&self) -> &'static [CalendarField] {
        let len = match self {
            GroupType::Year => 1,
            GroupType::Month => 2,
            GroupType::Day => 3,
            GroupType::Hour => 4,
        };
        &ALL_FIELDS[..len]
    }

    /// Parse a possibly-missing raw value.
    ///
    /// A missing value is reported as [`InvalidGroupTypeError`] with no raw
    /// input attached.
    pub fn parse_raw(raw: Option<&str>) -> Result<Self, InvalidGroupTypeError> {
        match raw {
            Some(s) => s.parse(),
            None => Err(InvalidGroupTypeError::new(None)),
        }
    }
}

impl FromStr for GroupType {
    type Err = InvalidGroupTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "year" => Ok(GroupType::Year),
            "month" => Ok(GroupType::Month),
            "day" => Ok(GroupType::Day),
            "hour" => Ok(GroupType::Hour),
            other => Err(InvalidGroupTypeError::new(Some(other))),
        }
    }
}

impl TryFrom<&str> for GroupType {
    type Error = InvalidGroupTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The partial calendar tuple identifying a bucket.
///
/// Components finer than the key's granularity are absent rather than zero.
/// The derived ordering compares year, then month, then day, then hour,
/// which is chronological for keys of the same granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    year: i32,
    month: Option<u8>,
    day: Option<u8>,
    hour: Option<u8>,
}

impl BucketKey {
    /// Create a validated key.
    ///
    /// Rejects a day without a month, an hour without a day, and any
    /// component outside its calendar range.
    pub fn new(
        year: i32,
        month: Option<u8>,
        day: Option<u8>,
        hour: Option<u8>,
    ) -> Result<Self, ContractError> {
        if day.is_some() && month.is_none() {
            return Err(ContractError::InvalidBucketKey(format!(
                "day without month in year {}",
                year
            )));
        }
        if hour.is_some() && day.is_none() {
            return Err(ContractError::InvalidBucketKey(format!(
                "hour without day in year {}",
                year
            )));
        }

        let month_value = month.unwrap_or(1);
        let calendar_month = Month::try_from(month_value).map_err(|_| {
            ContractError::InvalidBucketKey(format!("month {} out of range", month_value))
        })?;
        Date::from_calendar_date(year, calendar_month, day.unwrap_or(1)).map_err(|e| {
            ContractError::InvalidBucketKey(format!(
                "{}-{:02}-{:02}: {}",
                year,
                month_value,
                day.unwrap_or(1),
                e
            ))
        })?;

        if let Some(h) = hour
            && h > 23
        {
            return Err(ContractError::InvalidBucketKey(format!(
                "hour {} out of range",
                h
            )));
        }

        Ok(Self {
            year,
            month,
            day,
            hour,
        })
    }

    /// Key of the bucket containing `timestamp` at the given granularity.
    ///
    /// Components are read from the timestamp as-is; callers normalize the
    /// offset first.
    #[must_use]
    pub fn truncate(timestamp: OffsetDateTime, group_type: GroupType) -> Self {
        let year = timestamp.year();
        let month = u8::from(timestamp.month());
        let day = timestamp.day();
        let hour = timestamp.hour();
        match group_type {
            GroupType::Year => Self {
                year,
                month: None,
                day: None,
                hour: None,
            },
            GroupType::Month => Self {
                year,
                month: Some(month),
                day: None,
                hour: None,
            },
            GroupType::Day => Self {
                year,
                month: Some(month),
                day: Some(day),
                hour: None,
            },
            GroupType::Hour => Self {
                year,
                month: Some(month),
                day: Some(day),
                hour: Some(hour),
            },
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<u8> {
        self.month
    }

    pub fn day(&self) -> Option<u8> {
        self.day
    }

    pub fn hour(&self) -> Option<u8> {
        self.hour
    }

    /// Granularity implied by which components are present.
    #[must_use]
    pub fn group_type(&self) -> GroupType {
        match (self.month, self.day, self.hour) {
            (None, _, _) => GroupType::Year,
            (Some(_), None, _) => GroupType::Month,
            (Some(_), Some(_), None) => GroupType::Day,
            (Some(_), Some(_), Some(_)) => GroupType::Hour,
        }
    }

    /// Number of components present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.group_type().key_fields().len()
    }

    /// Always false: a key has at least a year.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(m) = self.month {
            write!(f, "-{:02}", m)?;
        }
        if let Some(d) = self.day {
            write!(f, "-{:02}", d)?;
        }
        if let Some(h) = self.hour {
            write!(f, "T{:02}", h)?;
        }
        Ok(())
    }
}

/// Sum and count of the records sharing one bucket key.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedBucket {
    /// The bucket key.
    pub key: BucketKey,
    /// Sum of record values.
    pub total: Amount,
    /// Number of records; at least 1 for buckets produced by grouping.
    pub count: u64,
}

impl AggregatedBucket {
    /// Create a bucket.
    pub fn new(key: BucketKey, total: impl Into<Amount>, count: u64) -> Self {
        Self {
            key,
            total: total.into(),
            count,
        }
    }
}

/// Index-aligned bucket totals and labels, ascending in time.
///
/// Built once per aggregation and read-only afterward.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregationResult {
    dataset: Vec<Amount>,
    labels: Vec<OffsetDateTime>,
}

impl AggregationResult {
    /// Build a result, checking that both sequences line up and that labels
    /// strictly ascend.
    pub fn try_new(
        dataset: Vec<Amount>,
        labels: Vec<OffsetDateTime>,
    ) -> Result<Self, ContractError> {
        if dataset.len() != labels.len() {
            return Err(ContractError::MisalignedResult {
                dataset: dataset.len(),
                labels: labels.len(),
            });
        }
        if let Some(i) = labels.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ContractError::UnorderedLabels(i + 1));
        }
        Ok(Self { dataset, labels })
    }

    /// A result with no buckets.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Per-bucket totals.
    pub fn dataset(&self) -> &[Amount] {
        &self.dataset
    }

    /// Per-bucket labels (UTC).
    pub fn labels(&self) -> &[OffsetDateTime] {
        &self.labels
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    /// Returns true if no bucket was populated.
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Iterate `(label, total)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (OffsetDateTime, Amount)> + '_ {
        self.labels.iter().copied().zip(self.dataset.iter().copied())
    }

    /// Take ownership of the two sequences.
    pub fn into_parts(self) -> (Vec<Amount>, Vec<OffsetDateTime>) {
        (self.dataset, self.labels)
    }
}

/// The offset every label and canonical timestamp carries.
pub const CANONICAL_OFFSET: UtcOffset = UtcOffset::UTC;
