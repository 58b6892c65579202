//! Bucket keys and labels per granularity.
//!
//! A [`GroupType`] decides which calendar components form the key of a
//! bucket. Going back from a key to a timestamp fills every absent component
//! with its smallest value, so a `(2022, 10)` month key is labelled
//! `2022-10-01T00:00:00+00:00`.

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

use tally_types::{BucketKey, CANONICAL_OFFSET, CalendarField, ContractError, GroupType};

/// Calendar components used by `group_type`, in key order.
pub fn key_fields(group_type: GroupType) -> &'static [CalendarField] {
    group_type.key_fields()
}

/// Key of the bucket that contains `timestamp`, read in UTC.
pub fn bucket_key(timestamp: OffsetDateTime, group_type: GroupType) -> BucketKey {
    BucketKey::truncate(timestamp.to_offset(CANONICAL_OFFSET), group_type)
}

/// The first instant of the bucket identified by `key`, in UTC.
///
/// Absent components default to month 1, day 1, hour 0; minutes, seconds
/// and sub-seconds are always zero.
pub fn reconstruct_label(key: &BucketKey) -> Result<OffsetDateTime, ContractError> {
    let invalid = |e: time::error::ComponentRange| {
        ContractError::InvalidBucketKey(format!("{}: {}", key, e))
    };

    let month = Month::try_from(key.month().unwrap_or(1)).map_err(invalid)?;
    let date = Date::from_calendar_date(key.year(), month, key.day().unwrap_or(1)).map_err(invalid)?;
    let time = Time::from_hms(key.hour().unwrap_or(0), 0, 0).map_err(invalid)?;

    Ok(PrimitiveDateTime::new(date, time).assume_offset(CANONICAL_OFFSET))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_bucket_key_reads_utc() {
        // 01:30 at +02:00 is 23:30 UTC on the previous day.
        let key = bucket_key(datetime!(2022-03-01 01:30 +02:00), GroupType::Hour);
        assert_eq!(key.to_string(), "2022-02-28T23");
    }

    #[test]
    fn test_reconstruct_label_per_group_type() {
        let ts = datetime!(2022-10-04 13:45:12.5 UTC);
        let expected = [
            (GroupType::Year, datetime!(2022-01-01 00:00 UTC)),
            (GroupType::Month, datetime!(2022-10-01 00:00 UTC)),
            (GroupType::Day, datetime!(2022-10-04 00:00 UTC)),
            (GroupType::Hour, datetime!(2022-10-04 13:00 UTC)),
        ];
        for (group, label) in expected {
            let key = bucket_key(ts, group);
            assert_eq!(reconstruct_label(&key).unwrap(), label, "group {}", group);
        }
    }

    #[test]
    fn test_reconstruct_label_is_idempotent() {
        let key = BucketKey::new(2022, Some(2), Some(1), Some(7)).unwrap();
        let first = reconstruct_label(&key).unwrap();
        let second = reconstruct_label(&bucket_key(first, GroupType::Hour)).unwrap();
        assert_eq!(first, second);
        assert_eq!(reconstruct_label(&key).unwrap(), first);
    }

    #[test]
    fn test_label_has_utc_offset() {
        let key = BucketKey::new(2022, None, None, None).unwrap();
        assert_eq!(reconstruct_label(&key).unwrap().offset(), CANONICAL_OFFSET);
    }

    #[test]
    fn test_key_fields_delegates() {
        assert_eq!(
            key_fields(GroupType::Day),
            &[CalendarField::Year, CalendarField::Month, CalendarField::Day]
        );
    }
}
