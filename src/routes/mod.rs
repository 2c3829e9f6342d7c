pub mod cycle;
pub mod cycle_stats;
pub mod period_logs;
pub mod reminders;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::storage::Storage;
use crate::tracker::CycleTracker;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub tracker: CycleTracker,
}

impl AppState {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self {
            tracker: CycleTracker::new(Arc::clone(&store)),
            store,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(period_logs::routes(state.clone()))
        .merge(cycle::routes(state.clone()))
        .merge(cycle_stats::routes(state.clone()))
        .merge(reminders::routes(state))
        .route("/health", get(|| async { "✅ Backend up" }))
}
