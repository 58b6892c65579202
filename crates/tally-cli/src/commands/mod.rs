//! Command implementations for the CLI.

mod aggregate;
mod export;
mod import;
mod range;
mod serve;
mod stats;

pub use aggregate::{AggregateArgs, cmd_aggregate};
pub use export::{ExportArgs, cmd_export};
pub use import::cmd_import;
pub use range::{RangeArgs, cmd_range};
pub use serve::cmd_serve;
pub use stats::cmd_stats;
