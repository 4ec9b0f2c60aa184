//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `gateway` - Flow payment gateway client and a scriptable mock
//! - `postgres` - Payment order store and registration ledger
//! - `email` - Confirmation notifiers (Resend, log-only)
//! - `memory` - In-process implementations for tests and local runs
//! - `http` - Axum endpoints

pub mod email;
pub mod gateway;
pub mod http;
pub mod memory;
pub mod postgres;

pub use email::{LoggingConfirmationNotifier, ResendConfirmationNotifier};
pub use gateway::{FlowConfig, FlowGatewayAdapter, MockPaymentGateway};
pub use http::{payment_router, PaymentAppState};
pub use memory::{
    InMemoryPaymentOrderStore, InMemoryRegistrationLedger, RecordingConfirmationNotifier,
};
pub use postgres::{PostgresPaymentOrderStore, PostgresRegistrationLedger};
