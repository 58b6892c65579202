//! Main store implementation.

use std::io::{Read, Write};
use std::path::Path;

use rusqlite::types::{Type, Value, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use tally_core::timestamp;
use tally_core::{BucketQuery, TimeInput};
use tally_types::{AggregatedBucket, Amount, BucketKey, GroupType, Record};

use crate::error::{Error, Result};
use crate::models::{
    CollectionStats, ImportResult, JsonExportRow, JsonRecordRow, RecordRow, StoredCollection,
    StoredRecord,
};
use crate::queries::{RecordQuery, ceil_seconds, floor_seconds};
use crate::schema;

/// SQLite-based store for timestamped records.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }
}

fn check_collection_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        Err(Error::InvalidCollection(name.to_string()))
    } else {
        Ok(())
    }
}

fn timestamp_from_secs(secs: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| Error::InvalidTimestamp(format!("{}: {}", secs, e)))
}

fn column_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let secs: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn column_optional_timestamp(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<OffsetDateTime>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(_) => column_timestamp(row, idx).map(Some),
        None => Ok(None),
    }
}

fn column_amount(row: &Row<'_>, idx: usize) -> rusqlite::Result<Amount> {
    match row.get_ref(idx)? {
        ValueRef::Integer(v) => Ok(Amount::Int(v)),
        ValueRef::Real(v) => Ok(Amount::Float(v)),
        ValueRef::Null => Ok(Amount::ZERO),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "value".to_string(),
            other.data_type(),
        )),
    }
}

fn amount_to_sql(amount: Amount) -> Value {
    match amount {
        Amount::Int(v) => Value::Integer(v),
        Amount::Float(v) => Value::Real(v),
    }
}

// Collection operations
impl Store {
    /// Create a collection if it does not exist yet.
    pub fn ensure_collection(&self, name: &str) -> Result<StoredCollection> {
        check_collection_name(name)?;
        let now = OffsetDateTime::now_utc().unix_timestamp();

        self.conn.execute(
            "INSERT OR IGNORE INTO collections (name, created_at) VALUES (?1, ?2)",
            rusqlite::params![name, now],
        )?;

        self.get_collection(name)?
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// Get a collection by name.
    pub fn get_collection(&self, name: &str) -> Result<Option<StoredCollection>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, created_at FROM collections WHERE name = ?")?;

        let collection = stmt
            .query_row([name], |row| {
                Ok(StoredCollection {
                    name: row.get(0)?,
                    created_at: column_timestamp(row, 1)?,
                })
            })
            .optional()?;

        Ok(collection)
    }

    /// List all collections, by name.
    pub fn list_collections(&self) -> Result<Vec<StoredCollection>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, created_at FROM collections ORDER BY name")?;

        let collections = stmt
            .query_map([], |row| {
                Ok(StoredCollection {
                    name: row.get(0)?,
                    created_at: column_timestamp(row, 1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(collections)
    }
}

// Record operations
impl Store {
    /// Insert records into a collection, creating it if needed.
    ///
    /// Timestamps are stored as whole UTC seconds; any fractional part is
    /// dropped. All records are written in one transaction.
    pub fn insert_records(&mut self, collection: &str, records: &[Record]) -> Result<usize> {
        self.ensure_collection(collection)?;

        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO records (collection, ts, value) VALUES (?1, ?2, ?3)")?;
            for record in records {
                stmt.execute(rusqlite::params![
                    collection,
                    floor_seconds(record.timestamp),
                    amount_to_sql(record.value),
                ])?;
            }
        }
        tx.commit()?;

        info!("Inserted {} records into {}", records.len(), collection);
        Ok(records.len())
    }

    /// Query records with filters.
    pub fn query_records(&self, query: &RecordQuery) -> Result<Vec<StoredRecord>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_ref.as_slice(), |row| {
                Ok(StoredRecord {
                    id: row.get(0)?,
                    collection: row.get(1)?,
                    timestamp: column_timestamp(row, 2)?,
                    value: column_amount(row, 3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Count records, optionally within one collection.
    pub fn count_records(&self, collection: Option<&str>) -> Result<u64> {
        let count: i64 = match collection {
            Some(name) => self.conn.query_row(
                "SELECT COUNT(*) FROM records WHERE collection = ?",
                [name],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?,
        };

        Ok(count as u64)
    }

    /// Delete every record of a collection and the collection itself.
    pub fn delete_collection(&mut self, name: &str) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let deleted = tx.execute("DELETE FROM records WHERE collection = ?", [name])?;
        let removed = tx.execute("DELETE FROM collections WHERE name = ?", [name])?;
        tx.commit()?;

        if removed == 0 {
            return Err(Error::CollectionNotFound(name.to_string()));
        }
        info!("Deleted collection {} ({} records)", name, deleted);
        Ok(deleted)
    }
}

/// SQL expressions extracting each key component from `ts`, in key order.
fn key_columns(group_type: GroupType) -> &'static [&'static str] {
    const COLUMNS: [&str; 4] = [
        "CAST(strftime('%Y', ts, 'unixepoch') AS INTEGER)",
        "CAST(strftime('%m', ts, 'unixepoch') AS INTEGER)",
        "CAST(strftime('%d', ts, 'unixepoch') AS INTEGER)",
        "CAST(strftime('%H', ts, 'unixepoch') AS INTEGER)",
    ];
    &COLUMNS[..group_type.key_fields().len()]
}

fn key_component(row: &Row<'_>, idx: usize, width: usize) -> rusqlite::Result<Option<u8>> {
    if idx >= width {
        return Ok(None);
    }
    let v: i64 = row.get(idx)?;
    u8::try_from(v).map(Some).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e))
    })
}

// Aggregation
impl Store {
    /// Group a collection's records in the query window by calendar bucket
    /// and return each bucket's sum and count, ordered by key.
    pub fn aggregate_buckets(
        &self,
        collection: &str,
        query: &BucketQuery,
    ) -> Result<Vec<AggregatedBucket>> {
        if query.window.is_empty() {
            return Ok(Vec::new());
        }

        let columns = key_columns(query.group_type);
        let width = columns.len();
        let positions: Vec<String> = (1..=width).map(|i| i.to_string()).collect();
        let sql = format!(
            "SELECT {}, SUM(value), COUNT(*) FROM records \
             WHERE collection = ?1 AND ts >= ?2 AND ts <= ?3 \
             GROUP BY {} ORDER BY {}",
            columns.join(", "),
            positions.join(", "),
            positions.join(", "),
        );
        debug!("Executing aggregation: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                rusqlite::params![
                    collection,
                    ceil_seconds(query.window.start),
                    floor_seconds(query.window.end),
                ],
                |row| {
                    let year: i32 = row.get(0)?;
                    let month = key_component(row, 1, width)?;
                    let day = key_component(row, 2, width)?;
                    let hour = key_component(row, 3, width)?;
                    let total = column_amount(row, width)?;
                    let count: i64 = row.get(width + 1)?;
                    Ok((year, month, day, hour, total, count))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let buckets = rows
            .into_iter()
            .map(|(year, month, day, hour, total, count)| {
                let key = BucketKey::new(year, month, day, hour)?;
                Ok(AggregatedBucket::new(key, total, count as u64))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Aggregated {} buckets from {} by {}",
            buckets.len(),
            collection,
            query.group_type
        );
        Ok(buckets)
    }

    /// Per-collection summary, optionally for a single collection.
    pub fn stats(&self, collection: Option<&str>) -> Result<Vec<CollectionStats>> {
        let mut sql = String::from(
            "SELECT c.name, COUNT(r.id), MIN(r.ts), MAX(r.ts), SUM(r.value) \
             FROM collections c LEFT JOIN records r ON r.collection = c.name",
        );
        if collection.is_some() {
            sql.push_str(" WHERE c.name = ?1");
        }
        sql.push_str(" GROUP BY c.name ORDER BY c.name");

        let params: Vec<&dyn rusqlite::ToSql> = match &collection {
            Some(name) => vec![name as &dyn rusqlite::ToSql],
            None => Vec::new(),
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let stats = stmt
            .query_map(params.as_slice(), |row| {
                Ok(CollectionStats {
                    collection: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                    first: column_optional_timestamp(row, 2)?,
                    last: column_optional_timestamp(row, 3)?,
                    total: column_amount(row, 4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if let Some(name) = collection {
            if stats.is_empty() {
                return Err(Error::CollectionNotFound(name.to_string()));
            }
        }
        Ok(stats)
    }
}

impl Store {
    /// First and last record time of a collection, if it has records.
    pub fn time_bounds(&self, collection: &str) -> Result<Option<(OffsetDateTime, OffsetDateTime)>> {
        let bounds: (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT MIN(ts), MAX(ts) FROM records WHERE collection = ?",
            [collection],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        match bounds {
            (Some(first), Some(last)) => Ok(Some((
                timestamp_from_secs(first)?,
                timestamp_from_secs(last)?,
            ))),
            _ => Ok(None),
        }
    }

    // Import / export

    /// Import `timestamp,value` CSV rows into a collection.
    ///
    /// Malformed rows are skipped and reported in the result; valid rows are
    /// inserted in one transaction.
    pub fn import_csv<R: Read>(&mut self, collection: &str, reader: R) -> Result<ImportResult> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut result = ImportResult::default();
        let mut records = Vec::new();

        for (i, row) in csv_reader.deserialize::<RecordRow>().enumerate() {
            result.total += 1;
            // Header is line 1.
            let line = i + 2;
            let parsed = row
                .map_err(|e| e.to_string())
                .and_then(|row| parse_csv_row(&row).map_err(|e| e.to_string()));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping CSV line {}: {}", line, e);
                    result.skipped += 1;
                    result.errors.push(format!("line {}: {}", line, e));
                }
            }
        }

        result.imported = self.insert_records(collection, &records)?;
        info!(
            "Imported {} of {} CSV rows into {}",
            result.imported, result.total, collection
        );
        Ok(result)
    }

    /// Import a JSON array of `{"timestamp": ..., "value": ...}` objects.
    ///
    /// The document must be well-formed; individual rows with a bad
    /// timestamp are skipped and reported.
    pub fn import_json<R: Read>(&mut self, collection: &str, reader: R) -> Result<ImportResult> {
        let rows: Vec<JsonRecordRow> = serde_json::from_reader(reader)?;
        let mut result = ImportResult {
            total: rows.len(),
            ..Default::default()
        };
        let mut records = Vec::with_capacity(rows.len());

        for (i, row) in rows.into_iter().enumerate() {
            match timestamp::parse(row.timestamp) {
                Ok(ts) => records.push(Record::new(ts, row.value)),
                Err(e) => {
                    warn!("Skipping JSON row {}: {}", i, e);
                    result.skipped += 1;
                    result.errors.push(format!("row {}: {}", i, e));
                }
            }
        }

        result.imported = self.insert_records(collection, &records)?;
        info!(
            "Imported {} of {} JSON rows into {}",
            result.imported, result.total, collection
        );
        Ok(result)
    }

    /// Write the records matching `query` as `timestamp,value` CSV.
    pub fn export_csv<W: Write>(&self, query: &RecordQuery, writer: W) -> Result<usize> {
        let records = self.query_records(query)?;
        let mut csv_writer = csv::Writer::from_writer(writer);
        for record in &records {
            csv_writer.serialize(RecordRow::from_record(record))?;
        }
        csv_writer.flush()?;
        Ok(records.len())
    }

    /// Write the records matching `query` as a pretty-printed JSON array.
    pub fn export_json<W: Write>(&self, query: &RecordQuery, writer: W) -> Result<usize> {
        let records = self.query_records(query)?;
        let rows: Vec<JsonExportRow> = records.iter().map(JsonExportRow::from_record).collect();
        serde_json::to_writer_pretty(writer, &rows)?;
        Ok(records.len())
    }
}

fn parse_csv_row(row: &RecordRow) -> std::result::Result<Record, tally_core::Error> {
    let ts = timestamp::parse(TimeInput::from(&row.timestamp))?;
    let value: Amount = row.value.parse()?;
    Ok(Record::new(ts, value))
}
