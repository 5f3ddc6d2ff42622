//! Client configuration

const DEFAULT_BASE_URL: &str = "https://api.applicationinsights.io/";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            user_agent: format!("insights-sdk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("INSIGHTS_BASE_URL").unwrap_or(defaults.base_url),
            request_timeout_secs: std::env::var("INSIGHTS_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            user_agent: std::env::var("INSIGHTS_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://api.applicationinsights.io/");
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.user_agent.starts_with("insights-sdk/"));
    }
}
