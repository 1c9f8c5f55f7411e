// src/config.rs
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/chat";

/// Settings for talking to the chat service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Url,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Validate raw settings. A timeout of zero seconds means no timeout.
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint.trim()).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        match endpoint.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }

        let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        Ok(Self { endpoint, timeout })
    }
}
