//! In-memory registration ledger.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, PaymentOrderId, RegistrationId};
use crate::ports::RegistrationLedger;

/// Records sold tickets and counts every call, including repeats.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistrationLedger {
    sold: Arc<RwLock<HashMap<RegistrationId, PaymentOrderId>>>,
    calls: Arc<RwLock<usize>>,
    failure: Arc<RwLock<Option<DomainError>>>,
}

impl InMemoryRegistrationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `error` until cleared.
    pub async fn fail_with(&self, error: Option<DomainError>) {
        *self.failure.write().await = error;
    }

    /// Order that sold the registration's ticket, if any.
    pub async fn sold_by(&self, registration_id: RegistrationId) -> Option<PaymentOrderId> {
        self.sold.read().await.get(&registration_id).copied()
    }

    pub async fn call_count(&self) -> usize {
        *self.calls.read().await
    }
}

#[async_trait]
impl RegistrationLedger for InMemoryRegistrationLedger {
    async fn record_ticket_sold(
        &self,
        registration_id: RegistrationId,
        order_id: PaymentOrderId,
    ) -> Result<(), DomainError> {
        *self.calls.write().await += 1;

        if let Some(error) = self.failure.read().await.clone() {
            return Err(error);
        }

        self.sold.write().await.insert(registration_id, order_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_sale_and_tolerates_repeats() {
        let ledger = InMemoryRegistrationLedger::new();
        let registration = RegistrationId::new(42).unwrap();
        let order = PaymentOrderId::new();

        ledger.record_ticket_sold(registration, order).await.unwrap();
        ledger.record_ticket_sold(registration, order).await.unwrap();

        assert_eq!(ledger.sold_by(registration).await, Some(order));
        assert_eq!(ledger.call_count().await, 2);
    }

    #[tokio::test]
    async fn injected_failure_is_returned() {
        let ledger = InMemoryRegistrationLedger::new();
        ledger
            .fail_with(Some(DomainError::database("connection reset")))
            .await;

        let result = ledger
            .record_ticket_sold(RegistrationId::new(1).unwrap(), PaymentOrderId::new())
            .await;

        assert!(result.is_err());
        assert_eq!(ledger.sold_by(RegistrationId::new(1).unwrap()).await, None);
    }
}
