//! Shared data model for calendar-bucketed aggregation.
//!
//! This crate provides the types exchanged between the aggregation core
//! (tally-core), the SQLite record store (tally-store) and the front-ends.
//!
//! # Features
//!
//! - [`Record`] and [`Amount`] for timestamped numeric values
//! - [`GroupType`] granularities and their [`CalendarField`] key components
//! - [`BucketKey`], [`AggregatedBucket`] and [`AggregationResult`]
//! - The error taxonomy: [`ParseError`], [`InvalidGroupTypeError`],
//!   [`ContractError`] and [`StoreError`]
//!
//! # Example
//!
//! ```
//! use tally_types::{BucketKey, GroupType};
//! use time::macros::datetime;
//!
//! let key = BucketKey::truncate(datetime!(2022-10-04 13:45 UTC), GroupType::Month);
//! assert_eq!(key.to_string(), "2022-10");
//! ```

pub mod error;
pub mod types;

pub use error::{ContractError, InvalidGroupTypeError, ParseError, ParseResult, StoreError};
pub use types::{
    AggregatedBucket, AggregationResult, Amount, BucketKey, CANONICAL_OFFSET, CalendarField,
    GroupType, Record,
};

/// Property-based tests for bucket keys.
///
/// # Running Tests
///
/// ```bash
/// cargo test -p tally-types proptests
/// ```
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use time::OffsetDateTime;

    fn any_timestamp() -> impl Strategy<Value = OffsetDateTime> {
        // 1970..2100
        (0i64..4_102_444_800).prop_map(|secs| {
            OffsetDateTime::from_unix_timestamp(secs).unwrap_or(OffsetDateTime::UNIX_EPOCH)
        })
    }

    fn any_group_type() -> impl Strategy<Value = GroupType> {
        prop::sample::select(GroupType::ALL.to_vec())
    }

    proptest! {
        /// A truncated key always has the cardinality of its group type.
        #[test]
        fn truncated_key_matches_group_type(ts in any_timestamp(), group in any_group_type()) {
            let key = BucketKey::truncate(ts, group);
            prop_assert_eq!(key.group_type(), group);
            prop_assert_eq!(key.len(), group.key_fields().len());
        }

        /// A truncated key is always a valid key.
        #[test]
        fn truncated_key_is_valid(ts in any_timestamp(), group in any_group_type()) {
            let key = BucketKey::truncate(ts, group);
            let rebuilt = BucketKey::new(key.year(), key.month(), key.day(), key.hour());
            prop_assert_eq!(rebuilt, Ok(key));
        }

        /// Key order agrees with time order for keys of one granularity.
        #[test]
        fn key_order_is_chronological(
            a in any_timestamp(),
            b in any_timestamp(),
            group in any_group_type(),
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(BucketKey::truncate(lo, group) <= BucketKey::truncate(hi, group));
        }
    }
}
