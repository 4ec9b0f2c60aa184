//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod payment;

pub use payment::{
    // Commands
    CallbackUrls, InitiatePaymentCommand, InitiatePaymentHandler, InitiatePaymentResult,
    ReconcileOutcome, ReconcilePaymentCommand, ReconcilePaymentHandler,
    SweepOrphanedOrdersCommand, SweepOrphanedOrdersHandler, SweepOrphanedOrdersResult,
    // Queries
    GetPaymentStatusHandler, GetPaymentStatusQuery,
};
