use axum::{Json, extract::State, http::StatusCode};

use crate::{AppState, models::HealthResponse, repository::StatisticsStore};

pub async fn health_check<S: StatisticsStore>(
    State(state): State<AppState<S>>,
) -> (StatusCode, Json<HealthResponse>) {
    let healthy = match state.statistics_service.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(HealthResponse::new(healthy)))
}
