pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod report;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;

pub use config::Config;

use repository::{PgStatisticsStore, StatisticsStore};
use services::StatisticsService;

#[derive(Clone)]
pub struct AppState<S = PgStatisticsStore> {
    pub statistics_service: StatisticsService<S>,
}

impl<S: StatisticsStore> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            statistics_service: StatisticsService::new(store),
        }
    }
}
