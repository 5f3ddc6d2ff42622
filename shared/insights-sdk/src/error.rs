//! Error types for the Insights SDK

use crate::types::EventType;

/// Result type alias
pub type Result<T> = std::result::Result<T, InsightsError>;

/// Insights client errors
#[derive(Debug, thiserror::Error)]
pub enum InsightsError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Parse error: field '{field}' value '{value}': {reason}")]
    Parse {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Timeline query for {category} failed: {source}")]
    Aggregation {
        category: EventType,
        #[source]
        source: Box<InsightsError>,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl InsightsError {
    pub(crate) fn parse(field: &str, value: &str, reason: impl ToString) -> Self {
        InsightsError::Parse {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::Aggregation { .. } => "AGGREGATION_FAILURE",
            Self::InvalidParameter(_) => "INVALID_PARAMETER",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<reqwest::Error> for InsightsError {
    fn from(err: reqwest::Error) -> Self {
        InsightsError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for InsightsError {
    fn from(err: serde_json::Error) -> Self {
        InsightsError::Decode(err.to_string())
    }
}
