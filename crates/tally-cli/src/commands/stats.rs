//! Stats command implementation.

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_stats_csv, format_stats_json, format_stats_text};
use crate::util::{Settings, write_output};

/// Show statistics for the collection named with `--collection`, or for
/// every collection when none was named.
pub fn cmd_stats(
    settings: &Settings,
    format: OutputFormat,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let store = settings.open_store()?;
    let stats = store.stats(settings.explicit_collection.as_deref())?;

    let content = match format {
        OutputFormat::Json => format_stats_json(&stats, opts)?,
        OutputFormat::Csv => format_stats_csv(&stats, opts),
        OutputFormat::Text => format_stats_text(&stats, opts),
    };

    write_output(output, &content)
}
