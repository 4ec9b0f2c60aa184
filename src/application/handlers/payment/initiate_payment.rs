//! InitiatePaymentHandler - Command handler for starting a purchase attempt.

use std::sync::Arc;

use crate::domain::foundation::{
    Amount, ErrorCode, GatewayToken, MerchantOrderCode, PaymentOrderId, RegistrationId,
};
use crate::domain::payment::PaymentOrderError;
use crate::ports::{CreateOrderRequest, PaymentGateway, PaymentOrderStore};

/// Command to start paying for a registration.
#[derive(Debug, Clone)]
pub struct InitiatePaymentCommand {
    pub registration_id: RegistrationId,
    pub amount: Amount,
    pub payer_email: String,
    /// Description shown to the payer on the gateway page.
    pub subject: String,
}

/// Result of a successful initiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatePaymentResult {
    pub order_id: PaymentOrderId,
    pub merchant_order_code: MerchantOrderCode,
    pub token: GatewayToken,
    /// Where to send the payer.
    pub redirect_url: String,
}

/// Public URLs the gateway calls back on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrls {
    pub confirmation_url: String,
    pub return_url: String,
}

impl CallbackUrls {
    /// Derive both callback URLs from the public base URL of this service.
    pub fn from_public_base(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            confirmation_url: format!("{}/api/payments/confirmation", base),
            return_url: format!("{}/api/payments/return", base),
        }
    }
}

/// Handler for starting a purchase attempt.
///
/// Supersedes stale attempts, records a fresh `Pending` order, registers it
/// with the gateway and stores the returned token. If the gateway call fails
/// the order stays `Pending` without a token; the orphan sweep or the next
/// attempt resolves it.
pub struct InitiatePaymentHandler {
    store: Arc<dyn PaymentOrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    callbacks: CallbackUrls,
}

impl InitiatePaymentHandler {
    pub fn new(
        store: Arc<dyn PaymentOrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        callbacks: CallbackUrls,
    ) -> Self {
        Self {
            store,
            gateway,
            callbacks,
        }
    }

    pub async fn handle(
        &self,
        cmd: InitiatePaymentCommand,
    ) -> Result<InitiatePaymentResult, PaymentOrderError> {
        validate(&cmd)?;

        // 1. Void stale attempts and insert the new order atomically
        let merchant_order_code = MerchantOrderCode::generate(cmd.registration_id);
        let order = self
            .store
            .replace_pending(cmd.registration_id, cmd.amount, merchant_order_code)
            .await?;

        tracing::info!(
            order_id = %order.id,
            registration_id = %cmd.registration_id,
            merchant_order_code = %order.merchant_order_code,
            amount = cmd.amount.value(),
            "Payment order created"
        );

        // 2. Register with the gateway
        let request = CreateOrderRequest {
            merchant_order_code: order.merchant_order_code.clone(),
            amount: order.amount,
            payer_email: cmd.payer_email.trim().to_string(),
            description: cmd.subject.trim().to_string(),
            confirmation_url: self.callbacks.confirmation_url.clone(),
            return_url: self.callbacks.return_url.clone(),
        };

        let gateway_order = match self.gateway.create_order(request).await {
            Ok(gateway_order) => gateway_order,
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id,
                    error = %e,
                    retryable = e.retryable,
                    "Gateway order creation failed, order left without token"
                );
                return Err(e.into());
            }
        };

        // 3. Remember the token for callbacks and status queries
        let order = match self
            .store
            .attach_gateway_token(&order.id, &gateway_order.token)
            .await
        {
            Ok(order) => order,
            Err(e) => {
                // A newer attempt voided this order while the gateway call ran
                if e.code == ErrorCode::OrderSuperseded {
                    tracing::warn!(
                        order_id = %order.id,
                        token = %gateway_order.token,
                        "Order superseded before its token was stored"
                    );
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            order_id = %order.id,
            token = %gateway_order.token,
            "Payment order registered with gateway"
        );

        Ok(InitiatePaymentResult {
            order_id: order.id,
            merchant_order_code: order.merchant_order_code,
            token: gateway_order.token,
            redirect_url: gateway_order.redirect_url,
        })
    }
}

fn validate(cmd: &InitiatePaymentCommand) -> Result<(), PaymentOrderError> {
    let email = cmd.payer_email.trim();
    if email.is_empty() {
        return Err(PaymentOrderError::validation("payer_email", "cannot be empty"));
    }
    if !email.contains('@') {
        return Err(PaymentOrderError::validation(
            "payer_email",
            "must be an email address",
        ));
    }
    if cmd.subject.trim().is_empty() {
        return Err(PaymentOrderError::validation("subject", "cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::memory::InMemoryPaymentOrderStore;
    use crate::domain::payment::OrderState;
    use crate::ports::{GatewayError, GatewayOrder, GatewayStatusReport};
    use async_trait::async_trait;

    /// Gateway that lets a competing attempt replace the order mid-call.
    struct RacingGateway {
        store: InMemoryPaymentOrderStore,
        inner: MockPaymentGateway,
    }

    #[async_trait]
    impl PaymentGateway for RacingGateway {
        async fn create_order(
            &self,
            request: CreateOrderRequest,
        ) -> Result<GatewayOrder, GatewayError> {
            if self.inner.call_count("create_order") == 0 {
                let registration = RegistrationId::new(42).unwrap();
                self.store
                    .replace_pending(
                        registration,
                        Amount::try_new(15000).unwrap(),
                        MerchantOrderCode::generate(registration),
                    )
                    .await
                    .unwrap();
            }
            self.inner.create_order(request).await
        }

        async fn get_status(
            &self,
            token: &GatewayToken,
        ) -> Result<GatewayStatusReport, GatewayError> {
            self.inner.get_status(token).await
        }
    }

    fn command(registration: i64) -> InitiatePaymentCommand {
        InitiatePaymentCommand {
            registration_id: RegistrationId::new(registration).unwrap(),
            amount: Amount::try_new(15000).unwrap(),
            payer_email: "ana@example.com".to_string(),
            subject: "Entrada General".to_string(),
        }
    }

    fn handler(
        store: &InMemoryPaymentOrderStore,
        gateway: &MockPaymentGateway,
    ) -> InitiatePaymentHandler {
        InitiatePaymentHandler::new(
            Arc::new(store.clone()),
            Arc::new(gateway.clone()),
            CallbackUrls::from_public_base("https://api.test/"),
        )
    }

    #[test]
    fn callback_urls_are_derived_from_public_base() {
        let urls = CallbackUrls::from_public_base("https://api.test/");
        assert_eq!(urls.confirmation_url, "https://api.test/api/payments/confirmation");
        assert_eq!(urls.return_url, "https://api.test/api/payments/return");
    }

    #[tokio::test]
    async fn creates_order_and_attaches_token() {
        let store = InMemoryPaymentOrderStore::new();
        let gateway = MockPaymentGateway::new();

        let result = handler(&store, &gateway).handle(command(42)).await.unwrap();

        let stored = store.find_by_id(&result.order_id).await.unwrap();
        assert_eq!(stored.state, OrderState::Pending);
        assert_eq!(stored.gateway_token, Some(result.token.clone()));
        assert!(result.redirect_url.contains(result.token.as_str()));
    }

    #[tokio::test]
    async fn sends_callbacks_and_trimmed_payer_data() {
        let store = InMemoryPaymentOrderStore::new();
        let gateway = MockPaymentGateway::new();
        let mut cmd = command(42);
        cmd.payer_email = "  ana@example.com ".to_string();

        let result = handler(&store, &gateway).handle(cmd).await.unwrap();

        let sent = &gateway.create_requests()[0];
        assert_eq!(sent.payer_email, "ana@example.com");
        assert_eq!(sent.merchant_order_code, result.merchant_order_code);
        assert_eq!(sent.confirmation_url, "https://api.test/api/payments/confirmation");
    }

    #[tokio::test]
    async fn new_attempt_voids_previous_pending_order() {
        let store = InMemoryPaymentOrderStore::new();
        let gateway = MockPaymentGateway::new();
        let handler = handler(&store, &gateway);

        let first = handler.handle(command(42)).await.unwrap();
        let second = handler.handle(command(42)).await.unwrap();

        assert_ne!(first.merchant_order_code, second.merchant_order_code);
        assert_eq!(
            store.find_by_id(&first.order_id).await.unwrap().state,
            OrderState::Voided
        );
        assert_eq!(
            store.find_by_id(&second.order_id).await.unwrap().state,
            OrderState::Pending
        );
    }

    #[tokio::test]
    async fn gateway_timeout_leaves_tokenless_pending_order() {
        let store = InMemoryPaymentOrderStore::new();
        let gateway = MockPaymentGateway::new();
        gateway.set_error(GatewayError::unavailable("timed out"));

        let err = handler(&store, &gateway).handle(command(42)).await.unwrap_err();

        assert!(err.is_retryable());
        let orders = store.orders_for(RegistrationId::new(42).unwrap()).await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].state, OrderState::Pending);
        assert!(orders[0].gateway_token.is_none());
    }

    #[tokio::test]
    async fn gateway_rejection_is_not_retryable() {
        let store = InMemoryPaymentOrderStore::new();
        let gateway = MockPaymentGateway::new();
        gateway.set_error(GatewayError::rejected("amount below minimum").with_http_status(400));

        let err = handler(&store, &gateway).handle(command(42)).await.unwrap_err();

        assert_eq!(err.code(), "GATEWAY_REQUEST_ERROR");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn invalid_email_is_rejected_before_any_write() {
        let store = InMemoryPaymentOrderStore::new();
        let gateway = MockPaymentGateway::new();
        let mut cmd = command(42);
        cmd.payer_email = "not-an-email".to_string();

        let err = handler(&store, &gateway).handle(cmd).await.unwrap_err();

        assert!(matches!(err, PaymentOrderError::ValidationFailed { .. }));
        assert!(store.orders_for(RegistrationId::new(42).unwrap()).await.is_empty());
        assert_eq!(gateway.call_count("create_order"), 0);
    }

    #[tokio::test]
    async fn superseded_order_is_a_conflict_not_a_redirect() {
        let store = InMemoryPaymentOrderStore::new();
        let gateway = RacingGateway {
            store: store.clone(),
            inner: MockPaymentGateway::new(),
        };
        let handler = InitiatePaymentHandler::new(
            Arc::new(store.clone()),
            Arc::new(gateway),
            CallbackUrls::from_public_base("https://api.test/"),
        );

        let err = handler.handle(command(42)).await.unwrap_err();

        assert!(matches!(err, PaymentOrderError::Conflict(_)));
        let orders = store.orders_for(RegistrationId::new(42).unwrap()).await;
        assert_eq!(orders.len(), 2);
        let voided: Vec<_> = orders.iter().filter(|o| o.state == OrderState::Voided).collect();
        let pending: Vec<_> = orders.iter().filter(|o| o.state == OrderState::Pending).collect();
        assert_eq!(voided.len(), 1);
        assert_eq!(pending.len(), 1);
        assert!(voided[0].gateway_token.is_none());
        assert!(pending[0].gateway_token.is_none());
    }
}
