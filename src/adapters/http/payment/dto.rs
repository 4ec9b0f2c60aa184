//! Request and response DTOs for payment endpoints.

use serde::{Deserialize, Serialize};

use crate::ports::PaymentDetailsView;

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/registrations/{registration_id}/payment`.
#[derive(Debug, Clone, Deserialize)]
pub struct InitiatePaymentRequest {
    /// Whole currency units.
    pub amount: i64,
    pub payer_email: String,
    pub subject: String,
}

/// Token sent by the gateway, as form field or query parameter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenParams {
    pub token: Option<String>,
}

impl TokenParams {
    /// The token, if present and non-blank.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentResponse {
    pub redirect_url: String,
}

/// Payment details for the confirmation page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub order_id: String,
    pub registration_id: i64,
    pub merchant_order_code: String,
    pub amount: i64,
    pub state: String,
    pub estado: String,
    pub updated_at: String,
    pub registrant_name: String,
    pub registrant_email: String,
    pub ticket_type_name: String,
}

impl From<PaymentDetailsView> for PaymentStatusResponse {
    fn from(view: PaymentDetailsView) -> Self {
        Self {
            order_id: view.order_id.to_string(),
            registration_id: view.registration_id.value(),
            merchant_order_code: view.merchant_order_code.to_string(),
            amount: view.amount.value(),
            state: view.state.as_str().to_string(),
            estado: view.estado,
            updated_at: view.updated_at.to_rfc3339(),
            registrant_name: view.registrant.registrant_name,
            registrant_email: view.registrant.registrant_email,
            ticket_type_name: view.registrant.ticket_type_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Whether the same request may succeed if retried.
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}
