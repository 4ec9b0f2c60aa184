//! Axum router configuration for payment endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    get_payment_status, health, initiate_payment, payment_confirmation, payment_return_get,
    payment_return_post, PaymentAppState,
};

/// Registrant-facing payment routes.
///
/// # Routes
/// - `POST /registrations/:registration_id/payment` - Start a purchase attempt
/// - `GET /payments/:token` - Payment details, reconciled on demand
pub fn payment_routes() -> Router<PaymentAppState> {
    Router::new()
        .route(
            "/registrations/:registration_id/payment",
            post(initiate_payment),
        )
        .route("/payments/:token", get(get_payment_status))
}

/// Gateway callback routes.
///
/// These carry no authentication; the token is only a lookup key and the
/// order state always comes from a signed status query.
///
/// # Routes
/// - `POST /payments/confirmation` - Server-to-server notification
/// - `GET|POST /payments/return` - Browser return, redirects to the client
pub fn callback_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/payments/confirmation", post(payment_confirmation))
        .route(
            "/payments/return",
            get(payment_return_get).post(payment_return_post),
        )
}

/// Create the complete payment router, mounted under `/api`, plus `/health`.
pub fn payment_router() -> Router<PaymentAppState> {
    Router::new()
        .nest("/api", payment_routes().merge(callback_routes()))
        .route("/health", get(health))
}
