//! Confirmation notifier port.
//!
//! Tells the registrant that their payment went through. The lifecycle
//! service calls it once per order, right after the `Pending -> Paid`
//! transition takes effect.

use crate::domain::foundation::DomainError;
use async_trait::async_trait;

use super::PaymentDetailsView;

#[async_trait]
pub trait ConfirmationNotifier: Send + Sync {
    async fn payment_confirmed(&self, details: &PaymentDetailsView) -> Result<(), DomainError>;
}
