//! Trait abstraction for the record store.
//!
//! This module provides the [`RecordStore`] trait that the aggregator
//! queries. It abstracts over the SQLite store and the in-memory
//! [`MemoryStore`](crate::MemoryStore) used for testing.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;

use tally_types::{AggregatedBucket, GroupType, Record, StoreError};

use crate::aggregate::bucketize;

/// An inclusive time window, `start <= t <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl TimeWindow {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Self {
        Self { start, end }
    }

    /// Returns true if `timestamp` lies inside the window, bounds included.
    pub fn contains(&self, timestamp: OffsetDateTime) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    /// Returns true if no instant can fall inside the window.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

/// What the aggregator asks of the store: filter by window, group by the
/// granularity's key, reduce with sum and count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketQuery {
    pub window: TimeWindow,
    pub group_type: GroupType,
}

/// Read-only query capability over timestamped records.
///
/// Implementors must provide [`fetch_range`](RecordStore::fetch_range).
/// Stores that can group natively (e.g. with SQL `GROUP BY`) should also
/// override [`aggregate`](RecordStore::aggregate); the default fetches the
/// window and buckets it in memory.
///
/// # Example
///
/// ```
/// use tally_core::{BucketQuery, MemoryStore, RecordStore, TimeWindow};
/// use tally_types::{GroupType, Record};
/// use time::macros::datetime;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), tally_types::StoreError> {
/// let store = MemoryStore::with_records([
///     Record::new(datetime!(2022-09-01 08:00 UTC), 10),
///     Record::new(datetime!(2022-09-02 09:00 UTC), 5),
/// ]);
/// let query = BucketQuery {
///     window: TimeWindow::new(datetime!(2022-09-01 00:00 UTC), datetime!(2022-09-30 23:59 UTC)),
///     group_type: GroupType::Month,
/// };
/// let buckets = store.aggregate(&query).await?;
/// assert_eq!(buckets.len(), 1);
/// assert_eq!(buckets[0].count, 2);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every record whose timestamp lies in `window`, in any order.
    async fn fetch_range(&self, window: &TimeWindow) -> Result<Vec<Record>, StoreError>;

    /// Sum and count of the records in the window, one entry per populated
    /// bucket, in any order.
    async fn aggregate(&self, query: &BucketQuery) -> Result<Vec<AggregatedBucket>, StoreError> {
        let records = self.fetch_range(&query.window).await?;
        Ok(bucketize(&records, query.group_type))
    }
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn fetch_range(&self, window: &TimeWindow) -> Result<Vec<Record>, StoreError> {
        (**self).fetch_range(window).await
    }

    async fn aggregate(&self, query: &BucketQuery) -> Result<Vec<AggregatedBucket>, StoreError> {
        (**self).aggregate(query).await
    }
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    async fn fetch_range(&self, window: &TimeWindow) -> Result<Vec<Record>, StoreError> {
        (**self).fetch_range(window).await
    }

    async fn aggregate(&self, query: &BucketQuery) -> Result<Vec<AggregatedBucket>, StoreError> {
        (**self).aggregate(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_window_contains_both_bounds() {
        let window = TimeWindow::new(
            datetime!(2022-02-01 00:00 UTC),
            datetime!(2022-02-02 00:00 UTC),
        );
        assert!(window.contains(datetime!(2022-02-01 00:00 UTC)));
        assert!(window.contains(datetime!(2022-02-02 00:00 UTC)));
        assert!(!window.contains(datetime!(2022-02-02 00:00:01 UTC)));
        assert!(!window.contains(datetime!(2022-01-31 23:59:59 UTC)));
        assert!(!window.is_empty());
    }

    #[test]
    fn test_window_empty_when_reversed() {
        let window = TimeWindow::new(
            datetime!(2022-02-02 00:00 UTC),
            datetime!(2022-02-01 00:00 UTC),
        );
        assert!(window.is_empty());
    }
}
