//! Integration tests for tally-core
//!
//! These run the aggregator end to end against the in-memory store.

use proptest::prelude::*;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use tally_core::timestamp::{self, Step};
use tally_core::{
    AggregateRequest, Amount, Error, GroupType, MemoryStore, RangeAggregator, Record,
};

/// One record per hour from `start`, `hours + 1` records in total, each
/// worth its own hour index.
fn hourly_records(start: OffsetDateTime, hours: i64) -> Vec<Record> {
    (0..=hours)
        .map(|i| Record::new(start + Duration::hours(i), i))
        .collect()
}

#[tokio::test]
async fn test_hourly_window_includes_end_instant() {
    let start = datetime!(2022-02-01 00:00 UTC);
    let aggregator = RangeAggregator::new(MemoryStore::with_records(hourly_records(start, 24)));

    let result = aggregator
        .aggregate("2022-02-01T00:00:00", "2022-02-02T00:00:00", GroupType::Hour)
        .await
        .unwrap();

    assert_eq!(result.len(), 25);
    assert_eq!(result.labels().len(), 25);
    assert_eq!(result.labels()[0], start);
    assert_eq!(result.labels()[24], datetime!(2022-02-02 00:00 UTC));
    for pair in result.labels().windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::HOUR);
    }
    assert_eq!(result.dataset()[24], Amount::Int(24));
}

#[tokio::test]
async fn test_labels_match_range_axis() {
    let start = datetime!(2022-02-01 00:00 UTC);
    let aggregator = RangeAggregator::new(MemoryStore::with_records(hourly_records(start, 24)));

    let result = aggregator
        .aggregate(start, datetime!(2022-02-02 00:00 UTC), GroupType::Hour)
        .await
        .unwrap();
    let axis: Vec<_> = timestamp::range(
        start,
        datetime!(2022-02-02 00:00 UTC),
        Step::hours(1),
        None,
    )
    .unwrap()
    .iter()
    .collect();

    assert_eq!(result.labels(), axis.as_slice());
}

#[tokio::test]
async fn test_month_boundary_sums_days() {
    let aggregator = RangeAggregator::new(MemoryStore::with_records([
        Record::new(datetime!(2022-10-01 00:00 UTC), 40),
        Record::new(datetime!(2022-10-31 23:59:59 UTC), 2),
        Record::new(datetime!(2022-11-01 00:00 UTC), 7),
    ]));

    let result = aggregator
        .aggregate("2022-10-01", "2022-11-30T23:59:00", GroupType::Month)
        .await
        .unwrap();

    assert_eq!(result.dataset(), &[Amount::Int(42), Amount::Int(7)]);
    assert_eq!(
        timestamp::to_iso(result.labels()[0], false),
        "2022-10-01T00:00:00+00:00"
    );
}

#[tokio::test]
async fn test_offset_bounds_convert_to_utc() {
    let aggregator = RangeAggregator::new(MemoryStore::with_records([
        Record::new(datetime!(2022-02-01 22:30 UTC), 1),
        Record::new(datetime!(2022-02-01 23:30 UTC), 2),
    ]));

    // 2022-02-02T00:00+01:00 is 23:00 UTC, so only the first record counts.
    let result = aggregator
        .aggregate("2022-02-01T00:00:00Z", "2022-02-02T00:00:00+01:00", GroupType::Day)
        .await
        .unwrap();
    assert_eq!(result.dataset(), &[Amount::Int(1)]);
}

#[tokio::test]
async fn test_empty_store() {
    let aggregator = RangeAggregator::new(MemoryStore::new());
    let response = aggregator
        .handle(
            AggregateRequest::new("2022-09-01", "2022-12-31", GroupType::Month),
            false,
        )
        .await
        .unwrap();
    assert!(response.dataset.is_empty());
    assert!(response.labels.is_empty());
}

#[tokio::test]
async fn test_week_is_rejected() {
    let aggregator = RangeAggregator::new(MemoryStore::new());
    let request: AggregateRequest = serde_json::from_value(serde_json::json!({
        "start_time": "2022-09-01",
        "end_time": "2022-12-31",
        "group_type": "week",
    }))
    .unwrap();

    let err = aggregator.handle(request, false).await.unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(
        err.to_string(),
        "Invalid group type: 'week'. Allowed values are: year, month, day, hour"
    );
    assert!(matches!(err, Error::InvalidGroupType(_)));
}

fn group_type() -> impl Strategy<Value = GroupType> {
    prop::sample::select(GroupType::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_labels_strictly_ascend(
        offsets in prop::collection::vec(0i64..(3 * 366 * 24 * 3600), 0..60),
        values in prop::collection::vec(-1000i64..1000, 60),
        group in group_type(),
    ) {
        let base = datetime!(2021-01-01 00:00 UTC);
        let records: Vec<Record> = offsets
            .iter()
            .zip(&values)
            .map(|(secs, v)| Record::new(base + Duration::seconds(*secs), *v))
            .collect();
        let expected_total: i64 = records
            .iter()
            .map(|r| match r.value {
                Amount::Int(v) => v,
                Amount::Float(_) => unreachable!(),
            })
            .sum();

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let result = runtime.block_on(async {
            RangeAggregator::new(MemoryStore::with_records(records))
                .aggregate(base, base + Duration::days(3 * 366), group)
                .await
        }).unwrap();

        prop_assert_eq!(result.dataset().len(), result.labels().len());
        for pair in result.labels().windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        let total: Amount = result.dataset().iter().sum();
        prop_assert_eq!(total, Amount::Int(expected_total));
    }
}
