//! HTTP handlers for payment endpoints.
//!
//! These handlers connect Axum routes to the payment lifecycle service.

use std::sync::Arc;

use axum::extract::{Form, Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};

use crate::application::{InitiatePaymentCommand, PaymentLifecycleService, ReconcileOutcome};
use crate::domain::foundation::{Amount, GatewayToken, RegistrationId};
use crate::domain::payment::PaymentOrderError;

use super::dto::{
    ErrorResponse, HealthResponse, InitiatePaymentRequest, InitiatePaymentResponse,
    PaymentStatusResponse, TokenParams,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for payment routes.
#[derive(Clone)]
pub struct PaymentAppState {
    pub service: Arc<PaymentLifecycleService>,

    /// Base URL of the registrant-facing client, used for return redirects.
    pub client_base_url: String,
}

impl PaymentAppState {
    pub fn new(service: Arc<PaymentLifecycleService>, client_base_url: impl Into<String>) -> Self {
        Self {
            service,
            client_base_url: client_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Client page that looks up the payment by token.
    fn result_url(&self, token: &str) -> String {
        let base = format!("{}/payment/result", self.client_base_url);
        match reqwest::Url::parse_with_params(&base, &[("token", token)]) {
            Ok(url) => url.to_string(),
            Err(_) => self.failure_url(),
        }
    }

    fn failure_url(&self) -> String {
        format!("{}/payment/failure", self.client_base_url)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Registrant-facing endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/registrations/:registration_id/payment - Start a purchase attempt
pub async fn initiate_payment(
    State(state): State<PaymentAppState>,
    Path(registration_id): Path<i64>,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let cmd = InitiatePaymentCommand {
        registration_id: RegistrationId::new(registration_id)?,
        amount: Amount::try_new(request.amount)?,
        payer_email: request.payer_email,
        subject: request.subject,
    };

    let result = state.service.initiate(cmd).await?;

    let response = InitiatePaymentResponse {
        redirect_url: result.redirect_url,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/payments/:token - Payment details for the confirmation page
///
/// Reconciles with the gateway first when the order is still pending.
pub async fn get_payment_status(
    State(state): State<PaymentAppState>,
    Path(raw_token): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let Ok(token) = GatewayToken::new(raw_token.as_str()) else {
        return Err(PaymentOrderError::not_found(raw_token).into());
    };
    let view = state.service.get_display_status(&token).await?;
    Ok(Json(PaymentStatusResponse::from(view)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Gateway callbacks
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payments/confirmation - Server-to-server notification
///
/// Always answers 200 so the gateway stops retrying; any failure is logged
/// and left for the next reconciliation.
pub async fn payment_confirmation(
    State(state): State<PaymentAppState>,
    form: Option<Form<TokenParams>>,
) -> StatusCode {
    let params = form.map(|Form(p)| p).unwrap_or_default();
    let Some(token) = params.token().and_then(|t| GatewayToken::new(t).ok()) else {
        tracing::warn!("Payment confirmation received without token");
        return StatusCode::OK;
    };

    match state.service.reconcile(&token).await {
        Ok(ReconcileOutcome::UnknownToken) => {
            tracing::warn!(token = %token, "Payment confirmation for unknown token");
        }
        Ok(outcome) => {
            tracing::info!(token = %token, outcome = ?outcome, "Payment confirmation processed");
        }
        Err(e) => {
            tracing::error!(token = %token, error = %e, "Payment confirmation failed");
        }
    }

    StatusCode::OK
}

/// GET /api/payments/return - Browser return from the gateway (query token)
pub async fn payment_return_get(
    State(state): State<PaymentAppState>,
    query: Option<Query<TokenParams>>,
) -> Redirect {
    let params = query.map(|Query(p)| p).unwrap_or_default();
    return_redirect(&state, &params)
}

/// POST /api/payments/return - Browser return from the gateway (form token)
pub async fn payment_return_post(
    State(state): State<PaymentAppState>,
    form: Option<Form<TokenParams>>,
) -> Redirect {
    let params = form.map(|Form(p)| p).unwrap_or_default();
    return_redirect(&state, &params)
}

fn return_redirect(state: &PaymentAppState, params: &TokenParams) -> Redirect {
    match params.token() {
        Some(token) => Redirect::to(&state.result_url(token)),
        None => {
            tracing::warn!("Payment return received without token");
            Redirect::to(&state.failure_url())
        }
    }
}

/// GET /health - Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts payment errors to HTTP responses.
#[derive(Debug)]
pub struct PaymentApiError(PaymentOrderError);

impl From<PaymentOrderError> for PaymentApiError {
    fn from(err: PaymentOrderError) -> Self {
        Self(err)
    }
}

impl From<crate::domain::foundation::ValidationError> for PaymentApiError {
    fn from(err: crate::domain::foundation::ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            PaymentOrderError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            PaymentOrderError::NotFound(_) => StatusCode::NOT_FOUND,
            PaymentOrderError::Conflict(_) | PaymentOrderError::InvalidState { .. } => {
                StatusCode::CONFLICT
            }
            PaymentOrderError::GatewayRejected { .. } => StatusCode::BAD_GATEWAY,
            PaymentOrderError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PaymentOrderError::Configuration(_) | PaymentOrderError::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(code = self.0.code(), error = %self.0, "Payment request failed");
        }

        let body = ErrorResponse::new(self.0.code(), self.0.message(), self.0.is_retryable());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::memory::{
        InMemoryPaymentOrderStore, InMemoryRegistrationLedger, RecordingConfirmationNotifier,
    };
    use crate::application::{CallbackUrls, LifecyclePorts};
    use crate::domain::payment::{GatewayStatus, OrderState};
    use crate::ports::{GatewayError, RegistrantDetails};

    struct Fixture {
        state: PaymentAppState,
        store: InMemoryPaymentOrderStore,
        gateway: MockPaymentGateway,
        ledger: InMemoryRegistrationLedger,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryPaymentOrderStore::new();
        let gateway = MockPaymentGateway::new();
        let ledger = InMemoryRegistrationLedger::new();
        store
            .add_registrant(
                RegistrationId::new(42).unwrap(),
                RegistrantDetails {
                    registrant_name: "Ana Pérez".to_string(),
                    registrant_email: "ana@example.com".to_string(),
                    ticket_type_name: "General".to_string(),
                },
            )
            .await;
        let ports = LifecyclePorts {
            store: Arc::new(store.clone()),
            gateway: Arc::new(gateway.clone()),
            ledger: Arc::new(ledger.clone()),
            notifier: Arc::new(RecordingConfirmationNotifier::new()),
        };
        let service = PaymentLifecycleService::new(
            ports,
            CallbackUrls::from_public_base("https://api.example.com"),
        );
        Fixture {
            state: PaymentAppState::new(Arc::new(service), "https://tickets.example.com/"),
            store,
            gateway,
            ledger,
        }
    }

    fn request() -> InitiatePaymentRequest {
        InitiatePaymentRequest {
            amount: 15000,
            payer_email: "ana@example.com".to_string(),
            subject: "Entrada General".to_string(),
        }
    }

    async fn initiate(f: &Fixture) -> String {
        let result = f
            .state
            .service
            .initiate(InitiatePaymentCommand {
                registration_id: RegistrationId::new(42).unwrap(),
                amount: Amount::try_new(15000).unwrap(),
                payer_email: "ana@example.com".to_string(),
                subject: "Entrada General".to_string(),
            })
            .await
            .unwrap();
        result.token.to_string()
    }

    fn location(redirect: Redirect) -> (StatusCode, String) {
        let response = redirect.into_response();
        let location = response
            .headers()
            .get("location")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        (response.status(), location)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Initiate
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn initiate_returns_created_with_redirect() {
        let f = fixture().await;
        let response = initiate_payment(State(f.state.clone()), Path(42), Json(request()))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        let orders = f.store.orders_for(RegistrationId::new(42).unwrap()).await;
        assert_eq!(orders.len(), 1);
        assert!(orders[0].gateway_token.is_some());
    }

    #[tokio::test]
    async fn initiate_rejects_non_positive_amount() {
        let f = fixture().await;
        let mut req = request();
        req.amount = 0;

        let response = initiate_payment(State(f.state), Path(42), Json(req))
            .await
            .err()
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn initiate_maps_gateway_outage_to_503() {
        let f = fixture().await;
        f.gateway
            .set_error(GatewayError::unavailable("connection refused"));

        let response = initiate_payment(State(f.state), Path(42), Json(request()))
            .await
            .err()
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Status
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn status_for_unknown_token_is_404() {
        let f = fixture().await;
        let response = get_payment_status(State(f.state), Path("tok_missing".to_string()))
            .await
            .err()
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_reconciles_pending_order() {
        let f = fixture().await;
        let token = initiate(&f).await;
        f.gateway.set_status(&token, GatewayStatus::Paid);

        let response = get_payment_status(State(f.state), Path(token))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(f.ledger.call_count().await, 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Confirmation callback
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn confirmation_marks_order_paid() {
        let f = fixture().await;
        let token = initiate(&f).await;
        f.gateway.set_status(&token, GatewayStatus::Paid);

        let status = payment_confirmation(
            State(f.state),
            Some(Form(TokenParams {
                token: Some(token),
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let orders = f.store.orders_for(RegistrationId::new(42).unwrap()).await;
        assert_eq!(orders[0].state, OrderState::Paid);
    }

    #[tokio::test]
    async fn confirmation_is_ok_for_unknown_or_missing_token() {
        let f = fixture().await;

        let unknown = payment_confirmation(
            State(f.state.clone()),
            Some(Form(TokenParams {
                token: Some("tok_unknown".to_string()),
            })),
        )
        .await;
        let missing = payment_confirmation(State(f.state), None).await;

        assert_eq!(unknown, StatusCode::OK);
        assert_eq!(missing, StatusCode::OK);
    }

    #[tokio::test]
    async fn confirmation_is_ok_when_gateway_is_down() {
        let f = fixture().await;
        let token = initiate(&f).await;
        f.gateway.set_error(GatewayError::unavailable("timeout"));

        let status = payment_confirmation(
            State(f.state),
            Some(Form(TokenParams {
                token: Some(token),
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let orders = f.store.orders_for(RegistrationId::new(42).unwrap()).await;
        assert_eq!(orders[0].state, OrderState::Pending);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Return redirect
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn return_with_token_redirects_to_result_page() {
        let f = fixture().await;
        let redirect = payment_return_post(
            State(f.state),
            Some(Form(TokenParams {
                token: Some("tok_1".to_string()),
            })),
        )
        .await;

        let (status, location) = location(redirect);
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(
            location,
            "https://tickets.example.com/payment/result?token=tok_1"
        );
    }

    #[tokio::test]
    async fn return_without_token_redirects_to_failure_page() {
        let f = fixture().await;
        let redirect = payment_return_get(State(f.state), None).await;

        let (status, location) = location(redirect);
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location, "https://tickets.example.com/payment/failure");
    }

    #[test]
    fn error_statuses_follow_error_kind() {
        let cases = [
            (PaymentOrderError::conflict("42"), StatusCode::CONFLICT),
            (
                PaymentOrderError::gateway_rejected("bad amount"),
                StatusCode::BAD_GATEWAY,
            ),
            (
                PaymentOrderError::configuration("missing key"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PaymentOrderError::infrastructure("db down"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(PaymentApiError(err).into_response().status(), expected);
        }
    }
}
