//! GetPaymentStatusHandler - Query handler for the payment confirmation page.

use std::sync::Arc;

use crate::domain::foundation::GatewayToken;
use crate::domain::payment::PaymentOrderError;
use crate::ports::{PaymentDetailsView, PaymentOrderStore};

/// Query for the order behind a gateway token.
#[derive(Debug, Clone)]
pub struct GetPaymentStatusQuery {
    pub token: GatewayToken,
}

/// Reads the stored order with its registration details.
pub struct GetPaymentStatusHandler {
    store: Arc<dyn PaymentOrderStore>,
}

impl GetPaymentStatusHandler {
    pub fn new(store: Arc<dyn PaymentOrderStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: &GetPaymentStatusQuery,
    ) -> Result<PaymentDetailsView, PaymentOrderError> {
        self.store
            .find_with_registration_details(&query.token)
            .await?
            .ok_or_else(|| PaymentOrderError::not_found(query.token.as_str()))
    }
}
