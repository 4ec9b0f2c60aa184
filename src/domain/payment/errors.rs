//! Payment lifecycle error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Configuration | 500 |
//! | GatewayUnavailable | 503 |
//! | GatewayRejected | 502 |
//! | NotFound | 404 |
//! | Conflict | 409 |
//! | InvalidState | 409 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors surfaced by the payment lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOrderError {
    /// Missing or unusable gateway credentials. Fatal, never retried.
    Configuration(String),

    /// The gateway could not be reached or timed out. Safe to retry.
    GatewayUnavailable(String),

    /// The gateway answered with an error or an unreadable body.
    GatewayRejected { message: String },

    /// No order carries this gateway token.
    NotFound(String),

    /// Another purchase attempt for the registration is in progress.
    Conflict(String),

    /// Invalid state for the requested operation.
    InvalidState { current: String, attempted: String },

    ValidationFailed { field: String, message: String },

    /// Database or other infrastructure failure.
    Infrastructure(String),
}

impl PaymentOrderError {
    pub fn configuration(message: impl Into<String>) -> Self {
        PaymentOrderError::Configuration(message.into())
    }

    pub fn gateway_unavailable(message: impl Into<String>) -> Self {
        PaymentOrderError::GatewayUnavailable(message.into())
    }

    pub fn gateway_rejected(message: impl Into<String>) -> Self {
        PaymentOrderError::GatewayRejected {
            message: message.into(),
        }
    }

    pub fn not_found(token: impl Into<String>) -> Self {
        PaymentOrderError::NotFound(token.into())
    }

    pub fn conflict(registration_id: impl Into<String>) -> Self {
        PaymentOrderError::Conflict(registration_id.into())
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        PaymentOrderError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentOrderError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        PaymentOrderError::Infrastructure(message.into())
    }

    /// Machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            PaymentOrderError::Configuration(_) => "CONFIGURATION_ERROR",
            PaymentOrderError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            PaymentOrderError::GatewayRejected { .. } => "GATEWAY_REQUEST_ERROR",
            PaymentOrderError::NotFound(_) => "PAYMENT_NOT_FOUND",
            PaymentOrderError::Conflict(_) => "PAYMENT_IN_PROGRESS",
            PaymentOrderError::InvalidState { .. } => "INVALID_STATE_TRANSITION",
            PaymentOrderError::ValidationFailed { .. } => "VALIDATION_FAILED",
            PaymentOrderError::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            PaymentOrderError::Configuration(msg) => {
                format!("Payment provider is not configured: {}", msg)
            }
            PaymentOrderError::GatewayUnavailable(_) => {
                "We could not reach the payment provider, please try again".to_string()
            }
            PaymentOrderError::GatewayRejected { message } => {
                format!("The payment provider rejected the request: {}", message)
            }
            PaymentOrderError::NotFound(token) => format!("No payment found for token {}", token),
            PaymentOrderError::Conflict(registration_id) => format!(
                "A payment is already in progress for registration {}",
                registration_id
            ),
            PaymentOrderError::InvalidState { current, attempted } => {
                format!("Cannot {} payment in {} state", attempted, current)
            }
            PaymentOrderError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            PaymentOrderError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentOrderError::GatewayUnavailable(_))
    }
}

impl std::fmt::Display for PaymentOrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for PaymentOrderError {}

impl From<DomainError> for PaymentOrderError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::PendingOrderExists | ErrorCode::OrderSuperseded => PaymentOrderError::Conflict(
                err.details
                    .get("registration_id")
                    .cloned()
                    .unwrap_or_default(),
            ),
            ErrorCode::ValidationFailed => PaymentOrderError::ValidationFailed {
                field: err.details.get("field").cloned().unwrap_or_default(),
                message: err.message,
            },
            _ => PaymentOrderError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for PaymentOrderError {
    fn from(err: ValidationError) -> Self {
        PaymentOrderError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}
