//! Range aggregation.
//!
//! [`RangeAggregator`] turns `(start, end, group_type)` into an
//! [`AggregationResult`]:
//!
//! 1. Both bounds are normalized with [`timestamp::parse`].
//! 2. The store is asked for the records in `[start, end]` (both bounds
//!    inclusive), grouped by the granularity's bucket key and reduced to a
//!    sum and a count per bucket.
//! 3. The buckets are sorted and labelled by [`assemble`].
//!
//! Only populated buckets appear in the result. Calendar units without any
//! record are not filled in; use [`timestamp::range`] to build a complete
//! label axis if one is needed.

use std::collections::BTreeMap;

use tracing::debug;

use tally_types::{AggregatedBucket, AggregationResult, Amount, BucketKey, GroupType, Record};

use crate::assemble::assemble;
use crate::error::Result;
use crate::granularity::bucket_key;
use crate::timestamp::{self, TimeInput};
use crate::traits::{BucketQuery, RecordStore, TimeWindow};

/// Group records by bucket key and compute each bucket's sum and count.
///
/// Buckets come back in key order. Every bucket has a count of at least 1.
pub fn bucketize<'a, I>(records: I, group_type: GroupType) -> Vec<AggregatedBucket>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut buckets: BTreeMap<BucketKey, (Amount, u64)> = BTreeMap::new();
    for record in records {
        let entry = buckets
            .entry(bucket_key(record.timestamp, group_type))
            .or_insert((Amount::ZERO, 0));
        entry.0 += record.value;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(key, (total, count))| AggregatedBucket { key, total, count })
        .collect()
}

/// Aggregates records from a [`RecordStore`] into calendar buckets.
///
/// Holds no state besides the store handle; concurrent calls are
/// independent.
///
/// # Example
///
/// ```
/// use tally_core::{MemoryStore, RangeAggregator};
/// use tally_types::{GroupType, Record};
/// use time::macros::datetime;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> tally_core::Result<()> {
/// let store = MemoryStore::with_records([
///     Record::new(datetime!(2022-09-03 10:00 UTC), 100),
///     Record::new(datetime!(2022-09-20 11:00 UTC), 50),
///     Record::new(datetime!(2022-10-01 00:00 UTC), 7),
/// ]);
/// let aggregator = RangeAggregator::new(store);
///
/// let result = aggregator
///     .aggregate("2022-09-01T00:00:00", "2022-12-31T23:59:00", GroupType::Month)
///     .await?;
/// assert_eq!(result.dataset().len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RangeAggregator<S> {
    store: S,
}

impl<S: RecordStore> RangeAggregator<S> {
    /// Create an aggregator over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Sum and count records in `[start, end]` per `group_type` bucket, and
    /// return totals with their labels in chronological order.
    pub async fn aggregate(
        &self,
        start: impl Into<TimeInput>,
        end: impl Into<TimeInput>,
        group_type: GroupType,
    ) -> Result<AggregationResult> {
        let buckets = self.buckets(start, end, group_type).await?;
        Ok(assemble(buckets, group_type)?)
    }

    /// The unsorted, unlabelled buckets for a window.
    pub async fn buckets(
        &self,
        start: impl Into<TimeInput>,
        end: impl Into<TimeInput>,
        group_type: GroupType,
    ) -> Result<Vec<AggregatedBucket>> {
        let window = TimeWindow::new(timestamp::parse(start)?, timestamp::parse(end)?);

        if window.is_empty() {
            debug!(
                "Window start {} is after end {}; nothing to aggregate",
                window.start, window.end
            );
            return Ok(Vec::new());
        }

        let query = BucketQuery { window, group_type };
        debug!(
            "Aggregating {} to {} by {}",
            window.start, window.end, group_type
        );

        let buckets = self.store.aggregate(&query).await?;
        debug!("Store returned {} populated buckets", buckets.len());
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mock::MemoryStore;
    use time::macros::datetime;

    fn salary_store() -> MemoryStore {
        MemoryStore::with_records([
            Record::new(datetime!(2022-09-01 00:00 UTC), 100),
            Record::new(datetime!(2022-09-15 12:30 UTC), 200),
            Record::new(datetime!(2022-10-01 00:00 UTC), 50),
            Record::new(datetime!(2022-10-31 23:59 UTC), 25),
            Record::new(datetime!(2022-12-31 23:59 UTC), 1),
            Record::new(datetime!(2023-01-01 00:00 UTC), 999),
        ])
    }

    #[test]
    fn test_bucketize_sums_and_counts() {
        let records = vec![
            Record::new(datetime!(2022-09-01 01:00 UTC), 1),
            Record::new(datetime!(2022-09-01 01:59 UTC), 2),
            Record::new(datetime!(2022-09-01 02:00 UTC), 4),
        ];
        let buckets = bucketize(&records, GroupType::Hour);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].total, Amount::Int(3));
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].total, Amount::Int(4));
        assert_eq!(buckets[1].count, 1);
    }

    #[test]
    fn test_bucketize_empty() {
        assert!(bucketize(&[], GroupType::Day).is_empty());
    }

    #[tokio::test]
    async fn test_month_buckets_merge_days() {
        let aggregator = RangeAggregator::new(salary_store());
        let result = aggregator
            .aggregate("2022-09-01T00:00:00", "2022-12-31T23:59:00", GroupType::Month)
            .await
            .unwrap();

        assert_eq!(
            result.dataset(),
            &[Amount::Int(300), Amount::Int(75), Amount::Int(1)]
        );
        assert_eq!(
            result.labels(),
            &[
                datetime!(2022-09-01 00:00 UTC),
                datetime!(2022-10-01 00:00 UTC),
                datetime!(2022-12-01 00:00 UTC),
            ]
        );
    }

    #[tokio::test]
    async fn test_window_bounds_are_inclusive() {
        let aggregator = RangeAggregator::new(salary_store());
        let result = aggregator
            .aggregate("2022-09-01T00:00:00", "2022-10-01T00:00:00", GroupType::Year)
            .await
            .unwrap();
        assert_eq!(result.dataset(), &[Amount::Int(350)]);
    }

    #[tokio::test]
    async fn test_empty_store_yields_empty_result() {
        let aggregator = RangeAggregator::new(MemoryStore::new());
        for group in GroupType::ALL {
            let result = aggregator
                .aggregate("2022-01-01", "2022-12-31", group)
                .await
                .unwrap();
            assert!(result.is_empty());
            assert!(result.labels().is_empty());
        }
    }

    #[tokio::test]
    async fn test_reversed_window_skips_store() {
        let store = salary_store();
        let aggregator = RangeAggregator::new(store);
        let result = aggregator
            .aggregate("2023-01-01", "2022-01-01", GroupType::Day)
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(aggregator.store().query_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_bound_fails_before_query() {
        let aggregator = RangeAggregator::new(salary_store());
        let err = aggregator
            .aggregate("not a date", "2022-12-31", GroupType::Day)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert_eq!(aggregator.store().query_count(), 0);
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let store = salary_store();
        store.set_failure(Some("replica unavailable")).await;
        let aggregator = RangeAggregator::new(store);

        let err = aggregator
            .aggregate("2022-01-01", "2022-12-31", GroupType::Day)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(err.to_string(), "replica unavailable");
    }
}
