//! Registration ledger port.
//!
//! Records the outcome of a confirmed payment on the registration itself,
//! i.e. marks the ticket as sold. Owned by the registration module; the
//! payment core only calls it.

use crate::domain::foundation::{DomainError, PaymentOrderId, RegistrationId};
use async_trait::async_trait;

#[async_trait]
pub trait RegistrationLedger: Send + Sync {
    /// Mark the registration's ticket as sold by `order_id`.
    ///
    /// Must tolerate being called again for the same pair.
    async fn record_ticket_sold(
        &self,
        registration_id: RegistrationId,
        order_id: PaymentOrderId,
    ) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_ledger_is_object_safe() {
        fn _accepts_dyn(_ledger: &dyn RegistrationLedger) {}
    }
}
