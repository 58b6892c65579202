//! Calendar-bucketed range aggregation.
//!
//! This crate sums timestamped numeric records over an inclusive time window
//! into calendar buckets (year, month, day or hour) and returns the totals
//! together with one label per bucket, in chronological order.
//!
//! # Components
//!
//! - [`timestamp`]: ISO-8601 parsing and rendering, calendar-aware stepping
//!   and label ranges
//! - [`granularity`]: bucket keys and labels for each [`GroupType`]
//! - [`RangeAggregator`]: window filter, grouping, sum and count
//! - [`assemble()`]: ordering and labelling of store buckets
//! - [`RecordStore`]: the narrow query capability a backing store provides
//!
//! # Time handling
//!
//! Everything is computed in UTC. Naive inputs are read as UTC, offset
//! inputs are converted to UTC, and labels always carry `+00:00` (or no
//! suffix at all when the caller asks to drop it).
//!
//! # Quick Start
//!
//! ```
//! use tally_core::{MemoryStore, RangeAggregator, timestamp};
//! use tally_types::{GroupType, Record};
//! use time::macros::datetime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::with_records([
//!         Record::new(datetime!(2022-02-01 00:15 UTC), 10),
//!         Record::new(datetime!(2022-02-01 00:45 UTC), 5),
//!         Record::new(datetime!(2022-02-01 01:10 UTC), 1),
//!     ]);
//!
//!     let aggregator = RangeAggregator::new(store);
//!     let result = aggregator
//!         .aggregate("2022-02-01T00:00:00", "2022-02-02T00:00:00", GroupType::Hour)
//!         .await?;
//!
//!     for (label, total) in result.iter() {
//!         println!("{} {}", timestamp::to_iso(label, false), total);
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod assemble;
pub mod error;
pub mod granularity;
pub mod mock;
pub mod request;
pub mod timestamp;
pub mod traits;

pub use aggregate::{RangeAggregator, bucketize};
pub use assemble::assemble;
pub use error::{Error, Result};
pub use granularity::{bucket_key, key_fields, reconstruct_label};
pub use mock::MemoryStore;
pub use request::{AggregateRequest, AggregateResponse};
pub use timestamp::{Step, TimeInput, TimeRange};
pub use traits::{BucketQuery, RecordStore, TimeWindow};

// Re-export the data model so callers need a single dependency.
pub use tally_types::{
    AggregatedBucket, AggregationResult, Amount, BucketKey, CalendarField, ContractError,
    GroupType, InvalidGroupTypeError, ParseError, Record, StoreError,
};
