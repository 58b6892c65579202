//! Range command implementation.
//!
//! Prints the label axis a chart would use for a window: every timestamp
//! from `--from` to `--to`, one step apart.

use std::path::PathBuf;

use anyhow::{Result, bail};
use tally_core::Step;
use tally_core::timestamp;
use time::UtcOffset;

use crate::cli::OutputFormat;
use crate::format::{
    FormatOptions, format_label, format_range_csv, format_range_json, format_range_text,
};
use crate::util::write_output;

/// Upper bound on labels printed by one invocation.
const MAX_LABELS: usize = 1_000_000;

/// Arguments for the range command.
pub struct RangeArgs<'a> {
    pub from: String,
    pub to: String,
    pub step: Step,
    pub offset: Option<UtcOffset>,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub opts: &'a FormatOptions,
}

/// Build the label strings for a range.
pub fn range_labels(
    from: &str,
    to: &str,
    step: Step,
    offset: Option<UtcOffset>,
) -> Result<Vec<String>> {
    let range = timestamp::range(from, to, step, offset)?;

    let mut labels = Vec::new();
    for ts in &range {
        if labels.len() == MAX_LABELS {
            bail!(
                "Range produces more than {} labels; use a larger --step",
                MAX_LABELS
            );
        }
        labels.push(format_label(ts)?);
    }
    Ok(labels)
}

pub fn cmd_range(args: RangeArgs<'_>) -> Result<()> {
    let RangeArgs {
        from,
        to,
        step,
        offset,
        format,
        output,
        opts,
    } = args;

    let labels = range_labels(&from, &to, step, offset)?;
    tracing::debug!("Range {} .. {} by {} gave {} labels", from, to, step, labels.len());

    let content = match format {
        OutputFormat::Json => format_range_json(&labels, opts)?,
        OutputFormat::Csv => format_range_csv(&labels, opts),
        OutputFormat::Text => format_range_text(&labels),
    };

    write_output(output, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::offset;

    #[test]
    fn test_range_labels_hourly_inclusive() {
        let labels =
            range_labels("2022-02-01T00:00:00", "2022-02-02T00:00:00", Step::hours(1), None)
                .unwrap();
        assert_eq!(labels.len(), 25);
        assert_eq!(labels[0], "2022-02-01T00:00:00+00:00");
        assert_eq!(labels[24], "2022-02-02T00:00:00+00:00");
    }

    #[test]
    fn test_range_labels_month_end_clamps() {
        let labels = range_labels("2022-01-31", "2022-04-30", Step::months(1), None).unwrap();
        assert_eq!(
            labels,
            [
                "2022-01-31T00:00:00+00:00",
                "2022-02-28T00:00:00+00:00",
                "2022-03-31T00:00:00+00:00",
                "2022-04-30T00:00:00+00:00",
            ]
        );
    }

    #[test]
    fn test_range_labels_with_offset_keeps_wall_clock() {
        let labels =
            range_labels("2022-01-01", "2022-01-02", Step::days(1), Some(offset!(+2))).unwrap();
        assert_eq!(
            labels,
            ["2022-01-01T00:00:00+02:00", "2022-01-02T00:00:00+02:00"]
        );
    }

    #[test]
    fn test_range_labels_reversed_is_empty() {
        let labels = range_labels("2022-02-02", "2022-02-01", Step::days(1), None).unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn test_range_labels_bad_timestamp() {
        let err = range_labels("soon", "2022-02-01", Step::days(1), None).unwrap_err();
        assert!(err.to_string().contains("soon"));
    }
}
