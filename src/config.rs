use crate::error::{PaymentError, Result};
use std::time::Duration;
use url::Url;

/// Settings for talking to the backend and opening the gateway.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST backend (e.g. "http://localhost:8080").
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Attempts for idempotent reads. Mutating calls are never retried.
    pub max_retries: u32,
    /// Upper bound on waiting for a capture response.
    pub capture_timeout_ms: u64,
    /// Publishable gateway key handed to the checkout UI.
    pub gateway_key: String,
    pub merchant_name: String,
    pub theme_color: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 30_000,
            max_retries: 3,
            capture_timeout_ms: 60_000,
            gateway_key: String::new(),
            merchant_name: "TaskPay".to_string(),
            theme_color: "#3399cc".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<Url> {
        if self.timeout_ms == 0 {
            return Err(PaymentError::Config("timeout_ms must be positive".into()));
        }
        if self.capture_timeout_ms == 0 {
            return Err(PaymentError::Config(
                "capture_timeout_ms must be positive".into(),
            ));
        }
        Url::parse(&self.base_url)
            .map_err(|e| PaymentError::Config(format!("invalid base URL: {e}")))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        let url = config.validate().unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = ClientConfig {
            base_url: "not a url".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PaymentError::Config(_))));

        let config = ClientConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PaymentError::Config(_))));
    }
}
