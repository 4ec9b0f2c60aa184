//! Notifier used when no email provider is configured.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::{ConfirmationNotifier, PaymentDetailsView};

/// Logs confirmations instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingConfirmationNotifier;

#[async_trait]
impl ConfirmationNotifier for LoggingConfirmationNotifier {
    async fn payment_confirmed(&self, details: &PaymentDetailsView) -> Result<(), DomainError> {
        tracing::info!(
            order_id = %details.order_id,
            registration_id = %details.registration_id,
            "Payment confirmed, email delivery disabled"
        );
        Ok(())
    }
}
