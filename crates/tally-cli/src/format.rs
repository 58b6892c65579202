//! Output formatting utilities for text, JSON, and CSV output.

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::builder::Builder;
use tally_core::AggregateResponse;
use tally_core::timestamp::to_iso;
use tally_store::CollectionStats;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::cli::StyleMode;
use crate::style;

/// Formatting options for output.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Omit header row in CSV output.
    pub no_header: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
    /// Visual styling mode.
    pub style: StyleMode,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            no_color: false,
            no_header: false,
            compact: false,
            style: StyleMode::Rich,
        }
    }
}

impl FormatOptions {
    pub fn new(no_color: bool, style: StyleMode) -> Self {
        // Plain mode automatically disables colors for pipe-friendliness
        Self {
            no_color: no_color || style == StyleMode::Plain,
            style,
            ..Default::default()
        }
    }

    /// Create with no_header option for CSV output.
    pub fn with_no_header(mut self, no_header: bool) -> Self {
        self.no_header = no_header;
        self
    }

    /// Create with compact JSON option.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }
}

/// Quote a CSV field if needed.
#[must_use]
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Render a range label: `+00:00` for UTC, the label's own offset otherwise.
pub fn format_label(ts: OffsetDateTime) -> Result<String> {
    if ts.offset().is_utc() {
        Ok(to_iso(ts, false))
    } else {
        Ok(ts.format(&Rfc3339)?)
    }
}

// ============================================================================
// Aggregation
// ============================================================================

pub fn format_aggregate_text(response: &AggregateResponse, opts: &FormatOptions) -> String {
    if response.labels.is_empty() {
        return "No records in window.\n".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["Bucket", "Total"]);
    for (label, value) in response.labels.iter().zip(&response.dataset) {
        builder.push_record([label.clone(), value.to_string()]);
    }

    let mut table = builder.build();
    style::apply_table_style(&mut table, opts.style);

    let mut output = table.to_string();
    output.push('\n');

    let summary = match response.labels.len() {
        1 => "1 bucket".to_string(),
        n => format!("{} buckets", n),
    };
    if opts.no_color {
        output.push_str(&summary);
    } else {
        output.push_str(&format!("{}", summary.dimmed()));
    }
    output.push('\n');
    output
}

#[must_use]
pub fn format_aggregate_csv(response: &AggregateResponse, opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "label,total\n".to_string()
    };
    for (label, value) in response.labels.iter().zip(&response.dataset) {
        output.push_str(&format!("{},{}\n", csv_escape(label), value));
    }
    output
}

/// Aggregations are emitted in the same `{dataset, labels}` shape as the
/// HTTP API.
pub fn format_aggregate_json(response: &AggregateResponse, opts: &FormatOptions) -> Result<String> {
    opts.as_json(response)
}

// ============================================================================
// Label ranges
// ============================================================================

pub fn format_range_text(labels: &[String]) -> String {
    let mut output = String::new();
    for label in labels {
        output.push_str(label);
        output.push('\n');
    }
    output
}

#[must_use]
pub fn format_range_csv(labels: &[String], opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "timestamp\n".to_string()
    };
    output.push_str(&format_range_text(labels));
    output
}

pub fn format_range_json(labels: &[String], opts: &FormatOptions) -> Result<String> {
    opts.as_json(&labels)
}

// ============================================================================
// Collection statistics
// ============================================================================

fn optional_timestamp(ts: Option<OffsetDateTime>) -> String {
    ts.map(|ts| to_iso(ts, false)).unwrap_or_default()
}

pub fn format_stats_text(stats: &[CollectionStats], opts: &FormatOptions) -> String {
    if stats.is_empty() {
        return "No collections. Run 'tally import' to load records.\n".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["Collection", "Records", "First", "Last", "Total"]);
    for s in stats {
        builder.push_record([
            s.collection.clone(),
            s.count.to_string(),
            optional_timestamp(s.first),
            optional_timestamp(s.last),
            s.total.to_string(),
        ]);
    }

    let mut table = builder.build();
    style::apply_table_style(&mut table, opts.style);

    let mut output = style::format_title("Collections", opts.no_color);
    output.push('\n');
    output.push_str(&table.to_string());
    output.push('\n');
    output
}

#[must_use]
pub fn format_stats_csv(stats: &[CollectionStats], opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "collection,count,first,last,total\n".to_string()
    };
    for s in stats {
        output.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_escape(&s.collection),
            s.count,
            optional_timestamp(s.first),
            optional_timestamp(s.last),
            s.total
        ));
    }
    output
}

pub fn format_stats_json(stats: &[CollectionStats], opts: &FormatOptions) -> Result<String> {
    opts.as_json(&stats)
}
