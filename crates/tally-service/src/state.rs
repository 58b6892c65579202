//! Application state shared across handlers.

use std::sync::Arc;

use tally_core::RangeAggregator;
use tally_store::{CollectionHandle, Store};
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// The data store (wrapped in Mutex for thread-safe access).
    pub store: Arc<Mutex<Store>>,
    /// Configuration (RwLock for runtime updates).
    pub config: RwLock<Config>,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: Store, config: Config) -> Arc<Self> {
        Arc::new(Self {
            store: Arc::new(Mutex::new(store)),
            config: RwLock::new(config),
        })
    }

    /// An aggregator over `collection`, or over the configured default
    /// collection when `None`.
    pub async fn aggregator(
        &self,
        collection: Option<&str>,
    ) -> RangeAggregator<CollectionHandle> {
        let name = match collection {
            Some(name) => name.to_string(),
            None => self.config.read().await.storage.collection.clone(),
        };
        RangeAggregator::new(CollectionHandle::new(Arc::clone(&self.store), name))
    }
}
