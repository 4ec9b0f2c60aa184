//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresPaymentOrderStore` - Sole writer of `payment_orders`
//! - `PostgresRegistrationLedger` - Marks registrations as sold

mod payment_order_store;
mod registration_ledger;

pub use payment_order_store::PostgresPaymentOrderStore;
pub use registration_ledger::PostgresRegistrationLedger;
