//! [`RecordStore`] over a shared [`Store`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tally_core::{BucketQuery, RecordStore, TimeWindow};
use tally_types::{AggregatedBucket, Record, StoreError};

use crate::queries::RecordQuery;
use crate::store::Store;

/// One collection of a shared [`Store`], usable by
/// [`RangeAggregator`](tally_core::RangeAggregator).
///
/// Grouping runs in SQLite, so only one row per populated bucket leaves the
/// database.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tokio::sync::Mutex;
/// use tally_core::RangeAggregator;
/// use tally_store::{CollectionHandle, Store};
/// use tally_types::{GroupType, Record};
/// use time::macros::datetime;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut store = Store::open_in_memory()?;
/// store.insert_records("salary", &[Record::new(datetime!(2022-09-05 10:00 UTC), 42)])?;
///
/// let handle = CollectionHandle::new(Arc::new(Mutex::new(store)), "salary");
/// let result = RangeAggregator::new(handle)
///     .aggregate("2022-09-01", "2022-09-30", GroupType::Month)
///     .await?;
/// assert_eq!(result.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CollectionHandle {
    store: Arc<Mutex<Store>>,
    collection: String,
}

impl CollectionHandle {
    pub fn new(store: Arc<Mutex<Store>>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// The collection this handle reads.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<Mutex<Store>> {
        &self.store
    }
}

#[async_trait]
impl RecordStore for CollectionHandle {
    async fn fetch_range(&self, window: &TimeWindow) -> Result<Vec<Record>, StoreError> {
        let query = RecordQuery::new()
            .collection(&self.collection)
            .since(window.start)
            .until(window.end)
            .oldest_first();
        let store = self.store.lock().await;
        let records = store.query_records(&query).map_err(StoreError::new)?;
        Ok(records.into_iter().map(Record::from).collect())
    }

    async fn aggregate(&self, query: &BucketQuery) -> Result<Vec<AggregatedBucket>, StoreError> {
        let store = self.store.lock().await;
        store
            .aggregate_buckets(&self.collection, query)
            .map_err(StoreError::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{Amount, GroupType, RangeAggregator};
    use time::Duration;
    use time::macros::datetime;

    fn shared_store(records: &[Record]) -> Arc<Mutex<Store>> {
        let mut store = Store::open_in_memory().unwrap();
        store.insert_records("salary", records).unwrap();
        Arc::new(Mutex::new(store))
    }

    #[tokio::test]
    async fn test_hourly_window_on_sqlite() {
        let start = datetime!(2022-02-01 00:00 UTC);
        let records: Vec<Record> = (0..=24)
            .map(|h| Record::new(start + Duration::hours(h), 1))
            .collect();
        let handle = CollectionHandle::new(shared_store(&records), "salary");

        let result = RangeAggregator::new(handle)
            .aggregate("2022-02-01T00:00:00", "2022-02-02T00:00:00", GroupType::Hour)
            .await
            .unwrap();

        assert_eq!(result.len(), 25);
        assert_eq!(result.labels()[24], datetime!(2022-02-02 00:00 UTC));
        assert!(result.dataset().iter().all(|v| *v == Amount::Int(1)));
    }

    #[tokio::test]
    async fn test_fetch_range_reads_one_collection() {
        let store = shared_store(&[Record::new(datetime!(2022-02-01 10:00 UTC), 5)]);
        store
            .lock()
            .await
            .insert_records("bonus", &[Record::new(datetime!(2022-02-01 11:00 UTC), 9)])
            .unwrap();

        let handle = CollectionHandle::new(store, "salary");
        let window = TimeWindow::new(
            datetime!(2022-02-01 00:00 UTC),
            datetime!(2022-02-02 00:00 UTC),
        );
        let records = handle.fetch_range(&window).await.unwrap();
        assert_eq!(records, vec![Record::new(datetime!(2022-02-01 10:00 UTC), 5)]);
    }

    #[tokio::test]
    async fn test_native_and_default_aggregation_agree() {
        let records = [
            Record::new(datetime!(2022-09-01 00:00 UTC), 10),
            Record::new(datetime!(2022-09-01 23:59:59 UTC), 2.5),
            Record::new(datetime!(2022-09-02 00:00 UTC), 4),
        ];
        let handle = CollectionHandle::new(shared_store(&records), "salary");
        let query = BucketQuery {
            window: TimeWindow::new(
                datetime!(2022-09-01 00:00 UTC),
                datetime!(2022-09-30 00:00 UTC),
            ),
            group_type: GroupType::Day,
        };

        let native = handle.aggregate(&query).await.unwrap();
        let fetched = handle.fetch_range(&query.window).await.unwrap();
        assert_eq!(native, tally_core::bucketize(&fetched, GroupType::Day));
        assert_eq!(native[0].total, Amount::Float(12.5));
    }

    #[tokio::test]
    async fn test_float_totals_match_memory_store() {
        let records = [
            Record::new(datetime!(2022-02-01 00:00 UTC), 2.0),
            Record::new(datetime!(2022-02-01 01:00 UTC), 3),
        ];
        let sqlite = RangeAggregator::new(CollectionHandle::new(shared_store(&records), "salary"));
        let memory = RangeAggregator::new(tally_core::MemoryStore::with_records(records.clone()));

        let native = sqlite
            .aggregate("2022-02-01", "2022-02-01T23:59:59", GroupType::Day)
            .await
            .unwrap();
        let expected = memory
            .aggregate("2022-02-01", "2022-02-01T23:59:59", GroupType::Day)
            .await
            .unwrap();

        assert_eq!(native, expected);
        assert_eq!(native.dataset(), &[Amount::Float(5.0)]);

        let stored = sqlite
            .store()
            .fetch_range(&TimeWindow::new(
                datetime!(2022-02-01 00:00 UTC),
                datetime!(2022-02-01 01:00 UTC),
            ))
            .await
            .unwrap();
        assert_eq!(stored[0].value, Amount::Float(2.0));
        assert_eq!(stored[1].value, Amount::Int(3));
    }
}
