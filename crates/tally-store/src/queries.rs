//! Query builder for stored records.
//!
//! [`RecordQuery`] follows the builder pattern: every filter is optional and
//! can be chained in any order.
//!
//! # Example
//!
//! ```
//! use tally_store::{Store, RecordQuery};
//! use time::{OffsetDateTime, Duration};
//!
//! let store = Store::open_in_memory()?;
//! let last_month = OffsetDateTime::now_utc() - Duration::days(30);
//!
//! let query = RecordQuery::new()
//!     .collection("salary")
//!     .since(last_month)
//!     .limit(50)
//!     .offset(0);
//!
//! let records = store.query_records(&query)?;
//! # Ok::<(), tally_store::Error>(())
//! ```

use time::OffsetDateTime;

/// Fluent query builder for records.
///
/// Use this with [`Store::query_records`](crate::Store::query_records),
/// [`Store::export_csv`](crate::Store::export_csv) and
/// [`Store::export_json`](crate::Store::export_json).
///
/// By default, queries return results ordered by timestamp descending
/// (newest first).
///
/// Bounds are inclusive. Records are stored with whole-second precision, so
/// a `since` bound with a fractional second is rounded up and an `until`
/// bound is rounded down; no record outside the requested window is ever
/// returned.
#[derive(Debug, Default, Clone)]
pub struct RecordQuery {
    /// Filter by collection name.
    pub collection: Option<String>,
    /// Include only records at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Include only records at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by timestamp descending (newest first).
    pub newest_first: bool,
}

impl RecordQuery {
    /// Every record of every collection, newest first.
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    pub fn collection(mut self, collection: &str) -> Self {
        self.collection = Some(collection.to_string());
        self
    }

    /// Filter to records at or after this time.
    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Filter to records at or before this time.
    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` matches; page 2 of 50 is `.limit(50).offset(50)`.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results by oldest first (ascending by timestamp).
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// The `WHERE` clause (empty without filters) and its positional
    /// parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(collection) = &self.collection {
            conditions.push("collection = ?");
            params.push(Box::new(collection.clone()));
        }
        if let Some(since) = self.since {
            conditions.push("ts >= ?");
            params.push(Box::new(ceil_seconds(since)));
        }
        if let Some(until) = self.until {
            conditions.push("ts <= ?");
            params.push(Box::new(floor_seconds(until)));
        }

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!("WHERE {}", conditions.join(" AND ")), params)
        }
    }

    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };
        let mut sql = format!(
            "SELECT id, collection, ts, value FROM records {where_clause} ORDER BY ts {order}, id {order}"
        );

        // SQLite only accepts OFFSET after a LIMIT.
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }
        sql
    }
}

/// Unix seconds of the first whole second at or after `ts`.
pub(crate) fn ceil_seconds(ts: OffsetDateTime) -> i64 {
    let secs = ts.unix_timestamp();
    if ts.nanosecond() > 0 { secs + 1 } else { secs }
}

/// Unix seconds of the last whole second at or before `ts`.
pub(crate) fn floor_seconds(ts: OffsetDateTime) -> i64 {
    ts.unix_timestamp()
}
