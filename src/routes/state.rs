use std::sync::Arc;

use crate::{config::Config, db::Cache, services::store::SongStore};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SongStore>,
    pub cache: Cache,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn SongStore>, cache: Cache, config: Config) -> Self {
        Self {
            store,
            cache,
            config: Arc::new(config),
        }
    }
}
