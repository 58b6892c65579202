//! Utility functions for CLI operations.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_service::Config;
use tally_store::Store;

/// Settings shared by every command, after config file and flags are merged.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Server, storage and output configuration.
    pub config: Config,
    /// Collection named on the command line, if any.
    pub explicit_collection: Option<String>,
}

impl Settings {
    /// Load the service configuration and apply command-line overrides.
    ///
    /// A missing default config file is not an error; an unreadable one
    /// named with `--config` is.
    pub fn resolve(
        config_path: Option<&Path>,
        database: Option<PathBuf>,
        collection: Option<String>,
    ) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Config::load_default().unwrap_or_else(|e| {
                tracing::warn!("Ignoring config file: {}", e);
                Config::default()
            }),
        };

        if let Some(path) = database {
            config.storage.path = path;
        }
        if let Some(name) = &collection {
            config.storage.collection = name.clone();
        }

        Ok(Self {
            config,
            explicit_collection: collection,
        })
    }

    /// The collection commands operate on.
    pub fn collection(&self) -> &str {
        &self.config.storage.collection
    }

    /// Open the configured database.
    pub fn open_store(&self) -> Result<Store> {
        let path = &self.config.storage.path;
        tracing::debug!("Opening database at {}", path.display());
        Store::open(path).with_context(|| format!("Failed to open database {}", path.display()))
    }
}

/// Write output to file or stdout
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}
