//! Data models for stored data.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use tally_core::TimeInput;
use tally_core::timestamp::to_iso;
use tally_types::{Amount, Record};

/// A collection stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCollection {
    /// Collection name.
    pub name: String,
    /// When the collection was first written to.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A record stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Database row ID.
    pub id: i64,
    /// Owning collection.
    pub collection: String,
    /// Record time, whole seconds, UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Record value.
    pub value: Amount,
}

impl StoredRecord {
    /// Convert to a plain [`Record`].
    pub fn to_record(&self) -> Record {
        Record::new(self.timestamp, self.value)
    }
}

impl From<StoredRecord> for Record {
    fn from(stored: StoredRecord) -> Self {
        Record::new(stored.timestamp, stored.value)
    }
}

/// Summary of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Collection name.
    pub collection: String,
    /// Number of records.
    pub count: u64,
    /// Oldest record time, if any.
    #[serde(with = "time::serde::rfc3339::option")]
    pub first: Option<OffsetDateTime>,
    /// Newest record time, if any.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last: Option<OffsetDateTime>,
    /// Sum of all values.
    pub total: Amount,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Rows read from the input.
    pub total: usize,
    /// Rows written to the store.
    pub imported: usize,
    /// Rows rejected as malformed.
    pub skipped: usize,
    /// One message per rejected row.
    pub errors: Vec<String>,
}

/// Row shape shared by import and export.
///
/// Timestamps are written as `+00:00` ISO-8601 and read with the same
/// rules as aggregation bounds, so naive and offset inputs both import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RecordRow {
    pub timestamp: String,
    pub value: String,
}

impl RecordRow {
    pub(crate) fn from_record(record: &StoredRecord) -> Self {
        Self {
            timestamp: to_iso(record.timestamp, false),
            value: record.value.to_string(),
        }
    }
}

/// JSON import row: the timestamp may be any JSON value and is validated
/// on parse; the value is a bare number.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JsonRecordRow {
    pub timestamp: TimeInput,
    pub value: Amount,
}

/// JSON export row.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonExportRow {
    pub timestamp: String,
    pub value: Amount,
}

impl JsonExportRow {
    pub(crate) fn from_record(record: &StoredRecord) -> Self {
        Self {
            timestamp: to_iso(record.timestamp, false),
            value: record.value,
        }
    }
}
