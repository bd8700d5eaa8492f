use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Datastore;
use crate::services::ChatHub;
use crate::utils::KeyedLocks;

/// Shared across workers through `web::Data`
pub struct AppState {
    pub store: Arc<dyn Datastore>,
    pub config: AppConfig,
    pub locks: KeyedLocks,
    pub chat: ChatHub,
}

impl AppState {
    pub fn new(store: Arc<dyn Datastore>, config: AppConfig) -> Self {
        Self {
            store,
            config,
            locks: KeyedLocks::new(),
            chat: ChatHub::new(),
        }
    }

    pub fn store(&self) -> &dyn Datastore {
        self.store.as_ref()
    }
}
