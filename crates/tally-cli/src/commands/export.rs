//! Export command implementation.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tally_core::timestamp;
use tally_store::RecordQuery;

use crate::cli::DataFormat;
use crate::util::Settings;

/// Arguments for the export command.
pub struct ExportArgs<'a> {
    pub from: Option<String>,
    pub to: Option<String>,
    pub format: DataFormat,
    pub output: Option<&'a PathBuf>,
    pub quiet: bool,
}

/// Build the export query: one collection, oldest first, optionally windowed.
pub fn export_query(
    collection: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<RecordQuery> {
    let mut query = RecordQuery::new().collection(collection).oldest_first();
    if let Some(from) = from {
        query = query.since(timestamp::parse(from)?);
    }
    if let Some(to) = to {
        query = query.until(timestamp::parse(to)?);
    }
    Ok(query)
}

pub fn cmd_export(settings: &Settings, args: ExportArgs<'_>) -> Result<()> {
    let ExportArgs {
        from,
        to,
        format,
        output,
        quiet,
    } = args;

    let store = settings.open_store()?;
    let query = export_query(settings.collection(), from.as_deref(), to.as_deref())?;

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create file: {}", path.display())
        })?)),
        None => Box::new(io::stdout().lock()),
    };

    let count = match format {
        DataFormat::Csv => store.export_csv(&query, &mut writer)?,
        DataFormat::Json => {
            let count = store.export_json(&query, &mut writer)?;
            writeln!(writer)?;
            count
        }
    };
    writer.flush()?;

    if !quiet && let Some(path) = output {
        eprintln!("Exported {} records to {}", count, path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_export_query_window() {
        let query = export_query("salary", Some("2022-09-01"), Some("2022-09-30T23:59:59")).unwrap();
        assert_eq!(query.collection.as_deref(), Some("salary"));
        assert_eq!(query.since, Some(datetime!(2022-09-01 00:00 UTC)));
        assert_eq!(query.until, Some(datetime!(2022-09-30 23:59:59 UTC)));
        assert!(!query.newest_first);
    }

    #[test]
    fn test_export_query_rejects_bad_bound() {
        assert!(export_query("salary", Some("yesterday"), None).is_err());
    }
}
