use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Metadata field not found: {schema}.{element}")]
    MetadataFieldNotFound {
        schema: &'static str,
        element: &'static str,
    },

    #[error("Cannot build response document: {0}")]
    Document(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Query(_)
            | AppError::MetadataFieldNotFound { .. }
            | AppError::Document(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Query(e) => {
                tracing::error!(error = %e, "Database error");
            }
            AppError::MetadataFieldNotFound { schema, element } => {
                tracing::error!(schema, element, "Metadata field missing from registry");
            }
            AppError::Document(msg) => {
                tracing::error!(error = %msg, "Document error");
            }
        }

        (self.status_code(), self.to_string()).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
