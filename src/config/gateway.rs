//! Payment gateway configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;
use crate::adapters::gateway::FlowConfig;
use crate::application::CallbackUrls;

/// Payment gateway configuration (Flow)
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Gateway API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    pub api_key: String,

    /// Shared signing secret
    pub secret_key: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Public base URL of this service, used to build callback URLs
    pub public_base_url: String,

    /// Base URL of the client application the payer returns to
    pub client_base_url: String,

    /// Tokenless pending orders older than this are failed
    #[serde(default = "default_orphan_max_age")]
    pub orphan_max_age_secs: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Adapter configuration for the Flow client.
    pub fn flow_config(&self) -> FlowConfig {
        FlowConfig::new(self.api_key.clone(), self.secret_key.clone())
            .with_base_url(self.base_url.clone())
            .with_currency(self.currency.clone())
            .with_timeout(self.timeout())
    }

    pub fn callback_urls(&self) -> CallbackUrls {
        CallbackUrls::from_public_base(&self.public_base_url)
    }

    /// Client base URL without a trailing slash.
    pub fn client_base(&self) -> &str {
        self.client_base_url.trim_end_matches('/')
    }

    /// Validate gateway configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.api_key.trim().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__API_KEY"));
        }
        if self.secret_key.trim().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__SECRET_KEY"));
        }

        for (name, url) in [
            ("GATEWAY__BASE_URL", &self.base_url),
            ("GATEWAY__PUBLIC_BASE_URL", &self.public_base_url),
            ("GATEWAY__CLIENT_BASE_URL", &self.client_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidUrl(name));
            }
            if *environment == Environment::Production && !url.starts_with("https://") {
                return Err(ValidationError::UrlMustBeHttps(name));
            }
        }

        if self.timeout_secs == 0 || self.timeout_secs > 60 {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency);
        }
        if self.orphan_max_age_secs <= self.timeout_secs {
            return Err(ValidationError::OrphanAgeTooShort);
        }
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            secret_key: String::new(),
            currency: default_currency(),
            timeout_secs: default_timeout(),
            public_base_url: String::new(),
            client_base_url: String::new(),
            orphan_max_age_secs: default_orphan_max_age(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.flow.cl/api".to_string()
}

fn default_currency() -> String {
    "CLP".to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_orphan_max_age() -> u64 {
    1800
}

fn default_sweep_interval() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> GatewayConfig {
        GatewayConfig {
            api_key: "api-key".to_string(),
            secret_key: "secret".to_string(),
            public_base_url: "https://api.tickets.example.com".to_string(),
            client_base_url: "https://tickets.example.com/".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.currency, "CLP");
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert_eq!(config.orphan_max_age_secs, 1800);
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate(&Environment::Production).is_ok());
    }

    #[test]
    fn test_missing_credentials() {
        let config = GatewayConfig {
            secret_key: " ".to_string(),
            ..valid()
        };
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::MissingRequired("GATEWAY__SECRET_KEY"))
        );
    }

    #[test]
    fn test_http_allowed_outside_production_only() {
        let config = GatewayConfig {
            public_base_url: "http://localhost:8080".to_string(),
            ..valid()
        };
        assert!(config.validate(&Environment::Development).is_ok());
        assert_eq!(
            config.validate(&Environment::Production),
            Err(ValidationError::UrlMustBeHttps("GATEWAY__PUBLIC_BASE_URL"))
        );
    }

    #[test]
    fn test_orphan_age_must_exceed_timeout() {
        let config = GatewayConfig {
            orphan_max_age_secs: 10,
            ..valid()
        };
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::OrphanAgeTooShort)
        );
    }

    #[test]
    fn test_currency_format() {
        let config = GatewayConfig {
            currency: "clp".to_string(),
            ..valid()
        };
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::InvalidCurrency)
        );
    }

    #[test]
    fn test_derived_urls() {
        let config = valid();
        assert_eq!(
            config.callback_urls().confirmation_url,
            "https://api.tickets.example.com/api/payments/confirmation"
        );
        assert_eq!(config.client_base(), "https://tickets.example.com");
    }
}
