use axum::{extract::State, http::header, response::IntoResponse};

use crate::{
    AppState,
    error::AppResult,
    report::{CONTENT_TYPE, render_xml},
    repository::StatisticsStore,
};

/// Serves the repository size report as XML. Database failures become a
/// 500 carrying the error message.
pub async fn get_statistics<S: StatisticsStore>(
    State(state): State<AppState<S>>,
) -> AppResult<impl IntoResponse> {
    let report = state.statistics_service.generate().await?;
    let body = render_xml(&report)?;

    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], body))
}
