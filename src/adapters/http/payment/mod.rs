//! HTTP adapter for payment endpoints.
//!
//! Exposes the payment lifecycle via REST API:
//! - `POST /api/registrations/:registration_id/payment` - Start a purchase attempt
//! - `GET /api/payments/:token` - Payment details for the confirmation page
//! - `POST /api/payments/confirmation` - Gateway notification
//! - `GET|POST /api/payments/return` - Browser return from the gateway
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{PaymentApiError, PaymentAppState};
pub use routes::payment_router;
