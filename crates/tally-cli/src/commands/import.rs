//! Import command implementation.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tally_store::ImportResult;

use crate::cli::DataFormat;
use crate::style;
use crate::util::Settings;

/// Import records from `input` (`-` for stdin) into the configured collection.
pub fn cmd_import(
    settings: &Settings,
    input: &Path,
    format: Option<DataFormat>,
    quiet: bool,
    no_color: bool,
) -> Result<()> {
    let format = match format.or_else(|| DataFormat::from_path(input)) {
        Some(format) => format,
        None => bail!(
            "Cannot tell the format of {}. Use --format csv or --format json",
            input.display()
        ),
    };

    let reader: Box<dyn Read> = if input == Path::new("-") {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(input)
            .with_context(|| format!("Failed to read file: {}", input.display()))?;
        Box::new(BufReader::new(file))
    };

    let mut store = settings.open_store()?;
    let collection = settings.collection();

    let spinner = style::operation_spinner(&format!("Importing into {}...", collection), quiet);
    let result = match format {
        DataFormat::Csv => store.import_csv(collection, reader),
        DataFormat::Json => store.import_json(collection, reader),
    };
    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }
    let result = result.with_context(|| format!("Failed to import {}", input.display()))?;

    if !quiet {
        eprint!("{}", format_import_report(&result, collection, no_color));
    }
    Ok(())
}

fn format_import_report(result: &ImportResult, collection: &str, no_color: bool) -> String {
    let mut report = style::format_success(
        &format!(
            "Imported {} of {} records into '{}'",
            result.imported, result.total, collection
        ),
        no_color,
    );
    report.push('\n');

    if !result.errors.is_empty() {
        report.push_str(&style::format_warning(
            &format!("{} rows skipped:", result.skipped),
            no_color,
        ));
        report.push('\n');
        for err in result.errors.iter().take(10) {
            report.push_str(&format!("  {}\n", err));
        }
        if result.errors.len() > 10 {
            report.push_str(&format!(
                "  ... and {} more errors\n",
                result.errors.len() - 10
            ));
        }
    }
    report
}
