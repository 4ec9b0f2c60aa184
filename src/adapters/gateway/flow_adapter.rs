//! Flow payment gateway adapter.
//!
//! Implements the `PaymentGateway` trait against Flow's REST API.
//!
//! # Security
//!
//! - Every request carries an HMAC-SHA256 signature over its parameters
//! - Credentials held as `secrecy::SecretString`
//!
//! # Failure Handling
//!
//! Each call has a hard timeout. Transport failures and timeouts surface as
//! `Unavailable` (retryable), including a body that stops arriving midway.
//! Non-success statuses become `RequestRejected`. A complete success body
//! that does not parse becomes `MalformedResponse`. Nothing is retried here.
//!
//! # Configuration
//!
//! ```ignore
//! let config = FlowConfig::new(api_key, secret_key).with_base_url("https://sandbox.flow.cl/api");
//! let adapter = FlowGatewayAdapter::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::GatewayToken;
use crate::domain::payment::{GatewayStatus, SignatureEngine};
use crate::ports::{CreateOrderRequest, GatewayError, GatewayOrder, GatewayStatusReport, PaymentGateway};

use super::params::{CreateOrderParams, GatewayParams, StatusQueryParams};

/// Flow API configuration.
#[derive(Clone)]
pub struct FlowConfig {
    api_key: SecretString,

    /// Shared secret used to sign requests.
    secret_key: SecretString,

    /// Base URL for the API (default: https://www.flow.cl/api).
    base_url: String,

    /// ISO currency code sent with every order.
    currency: String,

    /// Per-request timeout.
    timeout: Duration,
}

impl FlowConfig {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            secret_key: SecretString::new(secret_key.into()),
            base_url: "https://www.flow.cl/api".to_string(),
            currency: "CLP".to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for FlowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowConfig")
            .field("api_key", &"[REDACTED]")
            .field("secret_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("currency", &self.currency)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Flow payment gateway adapter.
pub struct FlowGatewayAdapter {
    config: FlowConfig,
    signer: SignatureEngine,
    http_client: reqwest::Client,
}

impl FlowGatewayAdapter {
    /// Create a new adapter with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the HTTP client cannot be built.
    pub fn new(config: FlowConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            signer: SignatureEngine::new(config.secret_key.clone()),
            config,
            http_client,
        })
    }

    fn api_key(&self) -> Result<String, GatewayError> {
        let key = self.config.api_key.expose_secret();
        if key.trim().is_empty() {
            return Err(GatewayError::configuration("Gateway API key is not configured"));
        }
        Ok(key.clone())
    }

    fn sign<P: GatewayParams>(&self, params: &P) -> Result<Vec<(&'static str, String)>, GatewayError> {
        params
            .signed(&self.signer)
            .map_err(|e| GatewayError::configuration(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for FlowGatewayAdapter {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/payment/create", self.config.base_url);
        let params = CreateOrderParams {
            api_key: self.api_key()?,
            commerce_order: request.merchant_order_code.to_string(),
            subject: request.description,
            currency: self.config.currency.clone(),
            amount: request.amount.to_string(),
            email: request.payer_email,
            url_confirmation: request.confirmation_url,
            url_return: request.return_url,
        };
        let form = self.sign(&params)?;

        let response = self
            .http_client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::rejected(format!(
                "Order creation failed: {}",
                error_message(&body)
            ))
            .with_http_status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        let created: FlowCreateResponse = serde_json::from_slice(&body).map_err(|e| {
            GatewayError::malformed(format!("Failed to parse order creation response: {}", e))
        })?;

        let token = GatewayToken::new(created.token)
            .map_err(|_| GatewayError::malformed("Order creation response has no token"))?;
        if created.url.trim().is_empty() {
            return Err(GatewayError::malformed("Order creation response has no URL"));
        }

        Ok(GatewayOrder {
            redirect_url: redirect_url(&created.url, &token)?,
            token,
        })
    }

    async fn get_status(&self, token: &GatewayToken) -> Result<GatewayStatusReport, GatewayError> {
        let url = format!("{}/payment/getStatus", self.config.base_url);
        let params = StatusQueryParams {
            api_key: self.api_key()?,
            token: token.to_string(),
        };
        let query = self.sign(&params)?;

        let response = self
            .http_client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::rejected(format!(
                "Status query failed: {}",
                error_message(&body)
            ))
            .with_http_status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        let raw: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
            GatewayError::malformed(format!("Failed to parse status response: {}", e))
        })?;

        let code = status_code(&raw)
            .ok_or_else(|| GatewayError::malformed("Status response has no numeric status"))?;

        Ok(GatewayStatusReport {
            status: GatewayStatus::from_code(code),
            raw,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FlowCreateResponse {
    #[serde(default)]
    url: String,
    #[serde(default)]
    token: String,
}

#[derive(Debug, Deserialize)]
struct FlowErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    message: String,
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::unavailable(format!("Gateway timed out: {}", err))
    } else {
        GatewayError::unavailable(format!("Gateway unreachable: {}", err))
    }
}

/// Payment page URL with the token appended to any query it already has.
fn redirect_url(base: &str, token: &GatewayToken) -> Result<String, GatewayError> {
    reqwest::Url::parse_with_params(base.trim(), &[("token", token.as_str())])
        .map(String::from)
        .map_err(|e| {
            GatewayError::malformed(format!("Order creation response has an invalid URL: {}", e))
        })
}

/// Best-effort extraction of the gateway's error message.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<FlowErrorBody>(body) {
        Ok(FlowErrorBody {
            code: Some(code),
            message,
        }) => format!("{} (code {})", message, code),
        Ok(FlowErrorBody { message, .. }) => message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

/// The status field arrives as a number, occasionally as a numeric string.
fn status_code(raw: &serde_json::Value) -> Option<i32> {
    match raw.get("status")? {
        serde_json::Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
