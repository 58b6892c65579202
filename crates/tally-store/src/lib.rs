//! SQLite persistence for timestamped records.
//!
//! This crate stores records in named collections and answers the bucket
//! queries of [`tally_core::RangeAggregator`] with a native `GROUP BY`.
//!
//! # Features
//!
//! - Named collections of `(timestamp, value)` records
//! - Query by collection and time range, with pagination
//! - Calendar bucket aggregation in SQL
//! - Per-collection statistics
//! - CSV and JSON import/export
//!
//! # Example
//!
//! ```no_run
//! use tally_store::{Store, RecordQuery};
//!
//! let store = Store::open_default()?;
//!
//! // Query recent records
//! let query = RecordQuery::new()
//!     .collection("salary")
//!     .limit(10);
//! let records = store.query_records(&query)?;
//! # Ok::<(), tally_store::Error>(())
//! ```

mod error;
mod handle;
mod models;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use handle::CollectionHandle;
pub use models::{CollectionStats, ImportResult, StoredCollection, StoredRecord};
pub use queries::RecordQuery;
pub use store::Store;

/// Collection used when none is configured.
pub const DEFAULT_COLLECTION: &str = "salary";

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/tally/data.db`
/// - macOS: `~/Library/Application Support/tally/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\tally\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("tally")
        .join("data.db")
}
