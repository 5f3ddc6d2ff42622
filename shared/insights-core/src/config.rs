//! Configuration management for services

use std::env;

/// Settings the runtime itself reads. Each service owns its own bind
/// address and tunables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("SERVICE_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| Self::default().service_name),
        }
    }
}
