use axum::{Router, routing::get};

use crate::{AppState, handlers, repository::StatisticsStore};

pub const HEALTH_PATH: &str = "/health";

pub fn create_router<S: StatisticsStore>(state: AppState<S>, statistics_path: &str) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(handlers::health_check::<S>))
        .route(statistics_path, get(handlers::get_statistics::<S>))
        .with_state(state)
}
