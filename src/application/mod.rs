//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).
//! `PaymentLifecycleService` is the facade the HTTP layer and background
//! tasks call.

pub mod handlers;
mod payment_lifecycle;
mod single_flight;

pub use handlers::{
    CallbackUrls, GetPaymentStatusHandler, GetPaymentStatusQuery, InitiatePaymentCommand,
    InitiatePaymentHandler, InitiatePaymentResult, ReconcileOutcome, ReconcilePaymentCommand,
    ReconcilePaymentHandler, SweepOrphanedOrdersCommand, SweepOrphanedOrdersHandler,
    SweepOrphanedOrdersResult,
};
pub use payment_lifecycle::{LifecyclePorts, PaymentLifecycleService};
pub use single_flight::SingleFlight;
