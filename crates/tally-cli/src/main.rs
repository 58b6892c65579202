use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod format;
mod style;
mod util;

use cli::{Cli, Commands};
use commands::{AggregateArgs, ExportArgs, RangeArgs};
use format::FormatOptions;
use util::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "tally", &mut io::stdout());
        return Ok(());
    }

    // Initialize tracing
    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let settings = Settings::resolve(cli.config.as_deref(), cli.database, cli.collection)?;
    let base_opts = FormatOptions::new(cli.no_color, cli.style).with_compact(cli.compact);
    let output = cli.output.as_ref();

    match cli.command {
        Commands::Aggregate {
            window,
            group,
            drop_timezone,
            output: output_args,
        } => {
            let opts = base_opts.with_no_header(output_args.no_header);
            commands::cmd_aggregate(
                &settings,
                AggregateArgs {
                    from: window.from,
                    to: window.to,
                    group,
                    drop_timezone,
                    format: output_args.format,
                    output,
                    opts: &opts,
                },
            )
            .await
        }
        Commands::Range {
            window,
            step,
            offset,
            output: output_args,
        } => {
            let opts = base_opts.with_no_header(output_args.no_header);
            commands::cmd_range(RangeArgs {
                from: window.from,
                to: window.to,
                step,
                offset,
                format: output_args.format,
                output,
                opts: &opts,
            })
        }
        Commands::Import { input, format } => {
            commands::cmd_import(&settings, &input, format, cli.quiet, base_opts.no_color)
        }
        Commands::Export { from, to, format } => commands::cmd_export(
            &settings,
            ExportArgs {
                from,
                to,
                format,
                output,
                quiet: cli.quiet,
            },
        ),
        Commands::Stats { format } => commands::cmd_stats(&settings, format, output, &base_opts),
        Commands::Serve { bind } => commands::cmd_serve(settings, bind, cli.quiet).await,
        Commands::Completions { .. } => Ok(()),
    }
}
