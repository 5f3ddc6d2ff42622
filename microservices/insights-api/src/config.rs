//! Insights API Configuration

use insights_core::{Result, ServiceError};
use insights_sdk::ClientConfig;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub http_bind: String,
    pub default_app_id: Option<String>,
    pub default_api_key: Option<String>,
    pub default_lookback_days: u32,
    pub client: ClientConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            http_bind: "0.0.0.0:8080".to_string(),
            default_app_id: None,
            default_api_key: None,
            default_lookback_days: 7,
            client: ClientConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let default_lookback_days = match std::env::var("DEFAULT_LOOKBACK_DAYS") {
            Ok(value) => value
                .parse()
                .map_err(|e| ServiceError::Config(format!("Invalid DEFAULT_LOOKBACK_DAYS: {}", e)))?,
            Err(_) => 7,
        };

        Ok(Self {
            http_bind: std::env::var("HTTP_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            default_app_id: std::env::var("INSIGHTS_APP_ID").ok().filter(|s| !s.is_empty()),
            default_api_key: std::env::var("INSIGHTS_API_KEY").ok().filter(|s| !s.is_empty()),
            default_lookback_days,
            client: ClientConfig::from_env(),
        })
    }
}
