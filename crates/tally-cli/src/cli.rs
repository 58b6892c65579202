//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tally_core::Step;
use time::UtcOffset;
use time::macros::format_description;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// File format for import and export
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DataFormat {
    Csv,
    Json,
}

impl DataFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(DataFormat::Csv),
            "json" => Some(DataFormat::Json),
            _ => None,
        }
    }
}

/// Visual styling mode for output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StyleMode {
    /// Rich styling with tables and colors (default)
    #[default]
    Rich,
    /// Plain text with no decorations (for scripting)
    Plain,
}

/// Reusable time window arguments
#[derive(Debug, Clone, Args)]
pub struct WindowArgs {
    /// Window start, inclusive (ISO-8601 date or date-time; naive values are UTC)
    #[arg(long, alias = "dt-from")]
    pub from: String,

    /// Window end, inclusive
    #[arg(long, alias = "dt-upto")]
    pub to: String,
}

/// Reusable output format arguments
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Omit header row in CSV output (useful for appending)
    #[arg(long)]
    pub no_header: bool,
}

#[derive(Parser)]
#[command(name = "tally")]
#[command(
    author,
    version,
    about = "Calendar-bucketed totals over time series records",
    long_about = None
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output compact JSON (no pretty-printing)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Visual styling mode (rich, plain)
    #[arg(long, global = true, value_enum, default_value = "rich", env = "TALLY_STYLE")]
    pub style: StyleMode,

    /// Path to the service configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path (overrides config)
    #[arg(short, long, global = true, env = "TALLY_DB")]
    pub database: Option<PathBuf>,

    /// Collection to read or write (overrides config)
    #[arg(short, long, global = true, env = "TALLY_COLLECTION")]
    pub collection: Option<String>,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sum a collection into year, month, day or hour buckets
    Aggregate {
        #[command(flatten)]
        window: WindowArgs,

        /// Bucket granularity (year, month, day, hour)
        #[arg(short, long, alias = "group-type")]
        group: String,

        /// Leave the +00:00 suffix off labels
        #[arg(long)]
        drop_timezone: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print the timestamps from --from to --to, one step apart
    Range {
        #[command(flatten)]
        window: WindowArgs,

        /// Step between labels, e.g. "+1 month", "2 hours", "15min"
        #[arg(short, long, default_value = "+1 day", value_parser = parse_step, allow_hyphen_values = true)]
        step: Step,

        /// UTC offset stamped onto every label, e.g. +02:00
        #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
        offset: Option<UtcOffset>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Import records from a CSV or JSON file
    Import {
        /// Input file, or '-' for stdin
        input: PathBuf,

        /// Input format (inferred from the file extension when omitted)
        #[arg(short, long, value_enum)]
        format: Option<DataFormat>,
    },

    /// Export records as CSV or JSON
    Export {
        /// Include records at or after this time
        #[arg(long)]
        from: Option<String>,

        /// Include records at or before this time
        #[arg(long)]
        to: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: DataFormat,
    },

    /// Show record counts, time bounds and totals per collection
    Stats {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Start the HTTP API server
    Serve {
        /// Bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Parse a step such as `+1 month`
fn parse_step(s: &str) -> Result<Step, String> {
    let step: Step = s.parse().map_err(|e: tally_core::ParseError| e.to_string())?;
    if !step.advances() {
        return Err(format!("Step '{}' must move forward in time", s));
    }
    Ok(step)
}

/// Parse a UTC offset: `Z`, `+02:00`, `-0530` or `+2`
fn parse_offset(s: &str) -> Result<UtcOffset, String> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }

    let colon = format_description!("[offset_hour sign:mandatory]:[offset_minute]");
    let compact = format_description!("[offset_hour sign:mandatory][offset_minute]");
    let hours_only = format_description!("[offset_hour sign:mandatory padding:none]");

    UtcOffset::parse(trimmed, colon)
        .or_else(|_| UtcOffset::parse(trimmed, compact))
        .or_else(|_| UtcOffset::parse(trimmed, hours_only))
        .map_err(|_| format!("Invalid offset '{}'. Use e.g. +02:00, -0530 or Z", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use time::macros::offset;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_offset_forms() {
        assert_eq!(parse_offset("+02:00"), Ok(offset!(+2)));
        assert_eq!(parse_offset("-0530"), Ok(offset!(-5:30)));
        assert_eq!(parse_offset("+2"), Ok(offset!(+2)));
        assert_eq!(parse_offset("Z"), Ok(UtcOffset::UTC));
        assert!(parse_offset("Europe/Paris").is_err());
    }

    #[test]
    fn test_parse_step_rejects_backward() {
        assert_eq!(parse_step("+1 month"), Ok(Step::months(1)));
        assert!(parse_step("-1 day").is_err());
        assert!(parse_step("0 hours").is_err());
        assert!(parse_step("fortnight").is_err());
    }

    #[test]
    fn test_data_format_from_path() {
        use std::path::Path;
        assert_eq!(
            DataFormat::from_path(Path::new("pay.CSV")),
            Some(DataFormat::Csv)
        );
        assert_eq!(
            DataFormat::from_path(Path::new("dump.json")),
            Some(DataFormat::Json)
        );
        assert_eq!(DataFormat::from_path(Path::new("records")), None);
    }

    #[test]
    fn test_aggregate_args() {
        let cli = Cli::try_parse_from([
            "tally",
            "aggregate",
            "--from",
            "2022-09-01",
            "--to",
            "2022-12-31",
            "--group",
            "month",
            "--format",
            "json",
            "--collection",
            "bonus",
        ])
        .unwrap();

        assert_eq!(cli.collection.as_deref(), Some("bonus"));
        match cli.command {
            Commands::Aggregate {
                window,
                group,
                drop_timezone,
                output,
            } => {
                assert_eq!(window.from, "2022-09-01");
                assert_eq!(window.to, "2022-12-31");
                assert_eq!(group, "month");
                assert!(!drop_timezone);
                assert_eq!(output.format, OutputFormat::Json);
            }
            _ => panic!("expected aggregate"),
        }
    }

    #[test]
    fn test_range_args() {
        let cli = Cli::try_parse_from([
            "tally", "range", "--from", "2022-01-31", "--to", "2022-04-30", "--step", "+1 month",
            "--offset", "+02:00",
        ])
        .unwrap();

        match cli.command {
            Commands::Range { step, offset, .. } => {
                assert_eq!(step, Step::months(1));
                assert_eq!(offset, Some(offset!(+2)));
            }
            _ => panic!("expected range"),
        }
    }
}
