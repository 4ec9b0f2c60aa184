//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentGateway` - External payment processor
//! - `PaymentOrderStore` - Sole writer of the payment order table
//! - `RegistrationLedger` - Marks tickets as sold
//! - `ConfirmationNotifier` - Payment confirmation messages

mod confirmation_notifier;
mod payment_gateway;
mod payment_order_store;
mod registration_ledger;

pub use confirmation_notifier::ConfirmationNotifier;
pub use payment_gateway::{
    CreateOrderRequest, GatewayError, GatewayErrorCode, GatewayOrder, GatewayStatusReport,
    PaymentGateway,
};
pub use payment_order_store::{
    PaymentDetailsView, PaymentOrderStore, RegistrantDetails, StateUpdate,
};
pub use registration_ledger::RegistrationLedger;
