//! In-memory adapters for tests and local development.

mod confirmation_notifier;
mod payment_order_store;
mod registration_ledger;

pub use confirmation_notifier::RecordingConfirmationNotifier;
pub use payment_order_store::InMemoryPaymentOrderStore;
pub use registration_ledger::InMemoryRegistrationLedger;
