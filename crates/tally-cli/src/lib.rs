//! Command-line interface for calendar-bucketed time series totals.
//!
//! The `tally` binary keeps records in a local SQLite database and sums them
//! into year, month, day or hour buckets.
//!
//! # Features
//!
//! - **Aggregation**: Sum a collection over an inclusive window
//! - **Label ranges**: Print the timestamp axis for a window and step
//! - **Import/export**: Load and dump records as CSV or JSON
//! - **Statistics**: Record counts, time bounds and totals per collection
//! - **HTTP server**: Serve the same operations over a REST API
//! - **Shell completions**: Generate completions for bash, zsh, fish, and PowerShell
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `aggregate` | Sum records into calendar buckets |
//! | `range` | Print a label axis |
//! | `import` | Import records from a file |
//! | `export` | Export records |
//! | `stats` | Per-collection summary |
//! | `serve` | Start the HTTP API server |
//! | `completions` | Generate shell completions |
//!
//! # Output Formats
//!
//! - **Text** (default): Human-readable tables
//! - **JSON**: The `{dataset, labels}` shape the HTTP API returns
//! - **CSV**: Comma-separated values for spreadsheets and data analysis
//!
//! # Configuration
//!
//! The CLI reads the service configuration from
//! `~/.config/tally/server.toml` (or platform equivalent) for the database
//! path, default collection and label rendering.
//!
//! # Environment Variables
//!
//! - `TALLY_DB`: Database path (overridden by `--database`)
//! - `TALLY_COLLECTION`: Collection (overridden by `--collection`)
//! - `NO_COLOR`: Disable colored output when set
//!
//! # Examples
//!
//! Import payroll records:
//! ```bash
//! tally import payments.csv --collection salary
//! ```
//!
//! Monthly totals as JSON:
//! ```bash
//! tally aggregate --from 2022-09-01T00:00:00 --to 2022-12-31T23:59:00 --group month --format json
//! ```
//!
//! Hourly label axis in a fixed offset:
//! ```bash
//! tally range --from 2022-02-01 --to 2022-02-02 --step "+1 hour" --offset +02:00
//! ```

// This crate is primarily a binary CLI application.
// The entry point and command implementations are in main.rs.

// Re-export core dependencies for convenience
pub use tally_core;
pub use tally_types;
