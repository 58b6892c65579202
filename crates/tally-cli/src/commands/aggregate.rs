//! Aggregate command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tally_core::{AggregateRequest, RangeAggregator};
use tally_store::CollectionHandle;
use tokio::sync::Mutex;

use crate::cli::OutputFormat;
use crate::format::{
    FormatOptions, format_aggregate_csv, format_aggregate_json, format_aggregate_text,
};
use crate::util::{Settings, write_output};

/// Arguments for the aggregate command.
pub struct AggregateArgs<'a> {
    pub from: String,
    pub to: String,
    pub group: String,
    pub drop_timezone: bool,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub opts: &'a FormatOptions,
}

pub async fn cmd_aggregate(settings: &Settings, args: AggregateArgs<'_>) -> Result<()> {
    let AggregateArgs {
        from,
        to,
        group,
        drop_timezone,
        format,
        output,
        opts,
    } = args;

    let store = settings.open_store()?;
    let handle = CollectionHandle::new(Arc::new(Mutex::new(store)), settings.collection());
    let aggregator = RangeAggregator::new(handle);

    let request = AggregateRequest {
        start_time: from.into(),
        end_time: to.into(),
        group_type: Some(group),
    };
    let drop_timezone = drop_timezone || settings.config.output.drop_timezone;
    let response = aggregator.handle(request, drop_timezone).await?;

    let content = match format {
        OutputFormat::Json => format_aggregate_json(&response, opts)?,
        OutputFormat::Csv => format_aggregate_csv(&response, opts),
        OutputFormat::Text => format_aggregate_text(&response, opts),
    };

    write_output(output, &content)
}
