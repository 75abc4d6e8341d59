use std::sync::Arc;

use crate::database::WebStore;
use crate::storage::{Storage, platform_storage};
use crate::tick::Ticker;
use crate::Result;

/// Builder for [`WebStore`] handles.
///
/// Storage defaults to [`platform_storage`], and the ticker to a fresh one.
/// Databases meant to interleave their callbacks should share a ticker.
#[derive(Debug)]
pub struct WebStoreOptions {
    name: String,
    storage: Option<Arc<dyn Storage>>,
    ticker: Option<Ticker>,
}

impl WebStoreOptions {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            storage: None,
            ticker: None,
        }
    }

    /// Use an explicit storage backend instead of the platform store.
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn ticker(mut self, ticker: Ticker) -> Self {
        self.ticker = Some(ticker);
        self
    }

    /// Create the handle.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if the name is empty, or if no storage
    /// was given and the platform store is unavailable.
    pub fn build(self) -> Result<WebStore> {
        let storage = match self.storage {
            Some(storage) => storage,
            None => platform_storage()?,
        };
        WebStore::with_ticker(&self.name, storage, self.ticker.unwrap_or_default())
    }
}

/// Module-level function to start configuring a database
pub fn webstore_options(name: &str) -> WebStoreOptions {
    WebStoreOptions::new(name)
}
