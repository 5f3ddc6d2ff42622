//! Error types for the Insights API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use insights_sdk::InsightsError;
use serde_json::json;

/// Insights API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error(transparent)]
    Insights(#[from] InsightsError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCredentials(_) => StatusCode::UNAUTHORIZED,
            ApiError::Insights(err) => insights_status(err),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::MissingCredentials(_) => "MISSING_CREDENTIALS",
            ApiError::Insights(err) => err.error_code(),
        }
    }
}

fn insights_status(err: &InsightsError) -> StatusCode {
    match err {
        InsightsError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        InsightsError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        // A rejected key fails every timeline category the same way
        InsightsError::Aggregation { source, .. } => match insights_status(source) {
            StatusCode::UNAUTHORIZED => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_GATEWAY,
        },
        InsightsError::Transport(_)
        | InsightsError::Decode(_)
        | InsightsError::Parse { .. }
        | InsightsError::MissingField(_) => StatusCode::BAD_GATEWAY,
        InsightsError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Report request failed");
        } else {
            tracing::debug!(error = %self, "Report request rejected");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
