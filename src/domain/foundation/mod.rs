//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types that form the
//! vocabulary of the payment domain.

mod amount;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use amount::Amount;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{GatewayToken, MerchantOrderCode, PaymentOrderId, RegistrationId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
