//! Example: Monthly Salary Report
//!
//! This example fills an in-memory store with one payment per day from
//! September to December and prints the totals per bucket (monthly unless
//! another group type is given), using the JSON shapes the HTTP service
//! returns.
//!
//! Run with: `cargo run --example salary_report -- [GROUP_TYPE]`

use std::env;

use time::Duration;
use time::macros::datetime;

use tally_core::{AggregateRequest, MemoryStore, RangeAggregator, Record};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let group_type = env::args().nth(1).unwrap_or_else(|| "month".to_string());

    let start = datetime!(2022-09-01 00:00 UTC);
    let payments = (0..122).map(|day| {
        Record::new(start + Duration::days(day), 1_000 + (day * 37) % 500)
    });
    let aggregator = RangeAggregator::new(MemoryStore::with_records(payments));

    let request: AggregateRequest = serde_json::from_value(serde_json::json!({
        "dt_from": "2022-09-01T00:00:00",
        "dt_upto": "2022-12-31T23:59:00",
        "group_type": group_type,
    }))?;

    let response = aggregator.handle(request, false).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    println!();

    println!("Totals per bucket:");
    for (label, total) in response.labels.iter().zip(&response.dataset) {
        println!("  {:<28} {:>10}", label, total);
    }

    Ok(())
}
