//! Payment order handlers.
//!
//! ## Commands
//! - Starting a purchase attempt
//! - Reconciling an order with the gateway
//! - Failing orphaned orders
//!
//! ## Queries
//! - Payment details for the confirmation page

mod get_payment_status;
mod initiate_payment;
mod reconcile_payment;
mod sweep_orphaned_orders;

// Commands
pub use initiate_payment::{
    CallbackUrls, InitiatePaymentCommand, InitiatePaymentHandler, InitiatePaymentResult,
};
pub use reconcile_payment::{ReconcileOutcome, ReconcilePaymentCommand, ReconcilePaymentHandler};
pub use sweep_orphaned_orders::{
    SweepOrphanedOrdersCommand, SweepOrphanedOrdersHandler, SweepOrphanedOrdersResult,
};

// Queries
pub use get_payment_status::{GetPaymentStatusHandler, GetPaymentStatusQuery};
