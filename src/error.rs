use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected before any computation. The only error a valuation caller sees.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Price source {source_id} unavailable: {message}")]
    SourceUnavailable { source_id: String, message: String },

    #[error("Listing extraction failed: {0}")]
    Extraction(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Extraction(_) | AppError::SourceUnavailable { .. } => StatusCode::BAD_GATEWAY,
            AppError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Extraction(_) => "extraction_failed",
            AppError::SourceUnavailable { .. } => "source_unavailable",
            AppError::NotConfigured(_) => "not_configured",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.label(),
            "details": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
