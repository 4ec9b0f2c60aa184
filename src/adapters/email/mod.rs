//! Confirmation notifier adapters.
//!
//! - `ResendConfirmationNotifier` - Sends email through Resend
//! - `LoggingConfirmationNotifier` - Logs only, for deployments without email

mod logging_notifier;
mod resend_notifier;

pub use logging_notifier::LoggingConfirmationNotifier;
pub use resend_notifier::ResendConfirmationNotifier;
