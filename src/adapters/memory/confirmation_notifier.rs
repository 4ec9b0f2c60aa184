//! Recording confirmation notifier.
//!
//! Keeps every confirmation it is asked to send. Used in tests and when no
//! email provider is configured.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::ports::{ConfirmationNotifier, PaymentDetailsView};

#[derive(Debug, Clone, Default)]
pub struct RecordingConfirmationNotifier {
    sent: Arc<RwLock<Vec<PaymentDetailsView>>>,
    failure: Arc<RwLock<Option<DomainError>>>,
}

impl RecordingConfirmationNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail with `error` until cleared.
    pub async fn fail_with(&self, error: Option<DomainError>) {
        *self.failure.write().await = error;
    }

    pub async fn sent(&self) -> Vec<PaymentDetailsView> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl ConfirmationNotifier for RecordingConfirmationNotifier {
    async fn payment_confirmed(&self, details: &PaymentDetailsView) -> Result<(), DomainError> {
        if let Some(error) = self.failure.read().await.clone() {
            return Err(error);
        }

        tracing::info!(
            order_id = %details.order_id,
            recipient = %details.registrant.registrant_email,
            "Payment confirmation recorded"
        );
        self.sent.write().await.push(details.clone());
        Ok(())
    }
}
