//! SQLite schema, versioned through a single-row `schema_version` table.

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_version (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        version INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY,
        created_at INTEGER NOT NULL
    );

    -- ts is unix seconds (UTC). value has no declared type, so it keeps
    -- the INTEGER or REAL storage class it was written with.
    CREATE TABLE IF NOT EXISTS records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        collection TEXT NOT NULL REFERENCES collections(name),
        ts INTEGER NOT NULL,
        value NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_records_collection_ts
        ON records(collection, ts);
"#;

/// Version 1 declared `value NUMERIC`, which stored `2.0` as INTEGER 2.
/// Rebuild the table with an untyped column.
const MIGRATE_V1_TO_V2: &str = r#"
    CREATE TABLE records_v2 (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        collection TEXT NOT NULL REFERENCES collections(name),
        ts INTEGER NOT NULL,
        value NOT NULL
    );
    INSERT INTO records_v2 (id, collection, ts, value)
        SELECT id, collection, ts, value FROM records;
    DROP TABLE records;
    ALTER TABLE records_v2 RENAME TO records;
    CREATE INDEX IF NOT EXISTS idx_records_collection_ts
        ON records(collection, ts);
"#;

/// Create or upgrade the schema on `conn`.
pub fn initialize(conn: &Connection) -> Result<()> {
    match get_schema_version(conn)? {
        0 => {
            conn.execute_batch(SCHEMA)?;
            set_schema_version(conn, SCHEMA_VERSION)
        }
        v if v < SCHEMA_VERSION => {
            debug!("Migrating schema from version {} to {}", v, SCHEMA_VERSION);
            conn.execute_batch(&format!("BEGIN;\n{MIGRATE_V1_TO_V2}\nCOMMIT;"))?;
            set_schema_version(conn, SCHEMA_VERSION)
        }
        _ => Ok(()),
    }
}

/// Stored schema version, 0 for a fresh database.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let has_table = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !has_table {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
        [version],
    )?;
    Ok(())
}
