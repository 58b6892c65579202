//! Tally Service - HTTP API for bucketed totals.
//!
//! Run with: `cargo run -p tally-service`

use std::path::PathBuf;

use clap::Parser;

use tally_service::Config;

/// Tally Service - HTTP REST API for calendar-bucketed totals.
#[derive(Parser, Debug)]
#[command(name = "tally-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Database path (overrides config).
    #[arg(short, long, env = "TALLY_DB")]
    database: Option<PathBuf>,

    /// Collection used when a request names none (overrides config).
    #[arg(long, env = "TALLY_COLLECTION")]
    collection: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tally_service=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_else(|e| {
            tracing::warn!("Ignoring config file: {}", e);
            Config::default()
        }),
    };

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db_path) = args.database {
        config.storage.path = db_path;
    }
    if let Some(collection) = args.collection {
        config.storage.collection = collection;
    }

    tally_service::run(config).await
}
