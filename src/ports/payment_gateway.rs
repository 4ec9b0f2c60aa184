//! Payment gateway port.
//!
//! Defines the contract for talking to the external payment gateway: order
//! creation and status polling. Implementations sign every request and carry
//! a timeout on every call.
//!
//! # Design
//!
//! - **No retries**: a failed call is reported once; retry policy belongs
//!   to the caller
//! - **No local state**: implementations only make outbound calls

use crate::domain::foundation::{Amount, GatewayToken, MerchantOrderCode};
use crate::domain::payment::{GatewayStatus, PaymentOrderError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register a new order with the gateway.
    ///
    /// Returns where to send the payer and the token the gateway will use
    /// for callbacks and status queries.
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError>;

    /// Ask the gateway for the current status of an order.
    async fn get_status(&self, token: &GatewayToken) -> Result<GatewayStatusReport, GatewayError>;
}

/// Request to create a gateway order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Idempotency key for the gateway.
    pub merchant_order_code: MerchantOrderCode,

    pub amount: Amount,

    /// Payer email, pre-filled on the gateway's payment page.
    pub payer_email: String,

    /// Description shown to the payer.
    pub description: String,

    /// Server-to-server confirmation callback.
    pub confirmation_url: String,

    /// Where the gateway sends the browser afterwards.
    pub return_url: String,
}

/// Order accepted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    /// Fully-formed URL to send the payer to.
    pub redirect_url: String,

    pub token: GatewayToken,
}

/// Status report returned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayStatusReport {
    pub status: GatewayStatus,

    /// Full response body, kept for diagnostics.
    pub raw: serde_json::Value,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    pub code: GatewayErrorCode,

    pub message: String,

    /// HTTP status returned by the gateway, if it answered.
    pub http_status: Option<u16>,

    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Network failure or timeout.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Unavailable, message)
    }

    /// Non-success HTTP status.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::RequestRejected, message)
    }

    /// Success status with a body we could not read.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::MalformedResponse, message)
    }

    /// Missing credentials.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Configuration, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for PaymentOrderError {
    fn from(err: GatewayError) -> Self {
        match err.code {
            GatewayErrorCode::Unavailable => PaymentOrderError::gateway_unavailable(err.message),
            GatewayErrorCode::RequestRejected | GatewayErrorCode::MalformedResponse => {
                PaymentOrderError::gateway_rejected(err.message)
            }
            GatewayErrorCode::Configuration => PaymentOrderError::configuration(err.message),
        }
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    Unavailable,
    RequestRejected,
    MalformedResponse,
    Configuration,
}

impl GatewayErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayErrorCode::Unavailable)
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::Unavailable => "gateway_unavailable",
            GatewayErrorCode::RequestRejected => "gateway_request_error",
            GatewayErrorCode::MalformedResponse => "gateway_malformed_response",
            GatewayErrorCode::Configuration => "configuration_error",
        };
        write!(f, "{}", s)
    }
}
