use std::sync::Arc;

use crate::db::CourierDb;
use crate::dispatch::Dispatcher;
use crate::observability::metrics::Metrics;
use crate::store::CourierStore;

pub struct AppState {
    pub store: CourierStore,
    pub dispatcher: Dispatcher,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(db: Arc<dyn CourierDb>) -> Self {
        let metrics = Metrics::new();
        let store = CourierStore::new(db);
        let dispatcher = Dispatcher::new(store.clone(), metrics.clone());

        Self {
            store,
            dispatcher,
            metrics,
        }
    }
}
