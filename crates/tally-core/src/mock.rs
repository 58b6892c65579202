//! In-memory record store for testing.
//!
//! [`MemoryStore`] implements [`RecordStore`] over a plain vector, so the
//! aggregator can be exercised without a database.
//!
//! # Features
//!
//! - **Failure injection**: Make every query fail with a given message
//! - **Transient failures**: Fail the next `n` queries, then recover
//! - **Latency simulation**: Delay each query to surface ordering bugs
//! - **Query counting**: Assert that a code path did or did not reach the store

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tally_types::{Record, StoreError};

use crate::traits::{RecordStore, TimeWindow};

/// Error raised by an injected [`MemoryStore`] failure.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MockFailure(pub String);

/// A record store backed by a vector.
///
/// # Example
///
/// ```
/// use tally_core::{MemoryStore, RecordStore, TimeWindow};
/// use tally_types::Record;
/// use time::macros::datetime;
///
/// #[tokio::main]
/// async fn main() {
///     let store = MemoryStore::new();
///     store.insert(Record::new(datetime!(2022-02-01 12:00 UTC), 3)).await;
///
///     let window = TimeWindow::new(datetime!(2022-02-01 00:00 UTC), datetime!(2022-02-02 00:00 UTC));
///     let records = store.fetch_range(&window).await.unwrap();
///     assert_eq!(records.len(), 1);
///     assert_eq!(store.query_count(), 1);
/// }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Record>>,
    failure: RwLock<Option<String>>,
    remaining_failures: AtomicU32,
    latency_ms: AtomicU64,
    query_count: AtomicU32,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `records`.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Add one record.
    pub async fn insert(&self, record: Record) {
        self.records.write().await.push(record);
    }

    /// Add several records.
    pub async fn extend(&self, records: impl IntoIterator<Item = Record>) {
        self.records.write().await.extend(records);
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Make every subsequent query fail with `message`, or clear the failure
    /// with `None`.
    pub async fn set_failure(&self, message: Option<&str>) {
        *self.failure.write().await = message.map(str::to_string);
    }

    /// Fail the next `count` queries, then succeed.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Delay each query by `latency`. `Duration::ZERO` disables the delay.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of queries that reached the store, failed ones included.
    pub fn query_count(&self) -> u32 {
        self.query_count.load(Ordering::Relaxed)
    }

    async fn check_should_fail(&self) -> Result<(), StoreError> {
        self.query_count.fetch_add(1, Ordering::Relaxed);

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(StoreError::new(MockFailure(
                "transient mock failure".to_string(),
            )));
        }

        match self.failure.read().await.as_ref() {
            Some(message) => Err(StoreError::new(MockFailure(message.clone()))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_range(&self, window: &TimeWindow) -> Result<Vec<Record>, StoreError> {
        self.check_should_fail().await?;
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| window.contains(r.timestamp))
            .cloned()
            .collect())
    }
}
