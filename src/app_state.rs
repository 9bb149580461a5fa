use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::event_hub::EventPublisher;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub events: EventPublisher,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, events: EventPublisher, config: Config) -> Self {
        Self {
            store,
            events,
            config,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
