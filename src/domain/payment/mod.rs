//! Payment domain module.
//!
//! Handles the lifecycle of payment orders for ticketed registrations.
//!
//! # Module Structure
//!
//! - `order` - PaymentOrder aggregate and its derived phase
//! - `order_state` - OrderState state machine
//! - `gateway_status` - Gateway status codes and the allow-list mapping
//! - `signature` - Canonical HMAC-SHA256 parameter signing
//! - `errors` - Lifecycle error taxonomy

mod errors;
mod gateway_status;
mod order;
mod order_state;
mod signature;

pub use errors::PaymentOrderError;
pub use gateway_status::GatewayStatus;
pub use order::{superseded_error, OrderPhase, PaymentOrder};
pub use order_state::OrderState;
pub use signature::{SignatureEngine, SignatureError};
