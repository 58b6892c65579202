//! Serve command - start the HTTP API server.

use anyhow::Result;

use crate::util::Settings;

/// Execute the serve command.
pub async fn cmd_serve(settings: Settings, bind: Option<String>, quiet: bool) -> Result<()> {
    let mut config = settings.config;
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    if !quiet {
        eprintln!(
            "Starting tally API server on http://{} (collection '{}')",
            config.server.bind, config.storage.collection
        );
        eprintln!("Press Ctrl+C to stop");
    }

    tally_service::run(config).await
}
