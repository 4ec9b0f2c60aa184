//! PaymentLifecycleService - the single entry point for payment orders.
//!
//! Wires the payment handlers to one set of ports and adds the policies that
//! span them: reconciliations for the same token are collapsed into one
//! gateway round trip, and status reads reconcile still-pending orders on
//! demand so the confirmation page does not depend on the server-to-server
//! callback arriving first.

use std::sync::Arc;

use crate::domain::foundation::GatewayToken;
use crate::domain::payment::{OrderState, PaymentOrderError};
use crate::ports::{
    ConfirmationNotifier, PaymentDetailsView, PaymentGateway, PaymentOrderStore,
    RegistrationLedger,
};

use super::handlers::payment::{
    CallbackUrls, GetPaymentStatusHandler, GetPaymentStatusQuery, InitiatePaymentCommand,
    InitiatePaymentHandler, InitiatePaymentResult, ReconcileOutcome, ReconcilePaymentCommand,
    ReconcilePaymentHandler, SweepOrphanedOrdersCommand, SweepOrphanedOrdersHandler,
    SweepOrphanedOrdersResult,
};
use super::single_flight::SingleFlight;

type ReconcileResult = Result<ReconcileOutcome, PaymentOrderError>;

/// Ports the lifecycle depends on.
#[derive(Clone)]
pub struct LifecyclePorts {
    pub store: Arc<dyn PaymentOrderStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub ledger: Arc<dyn RegistrationLedger>,
    pub notifier: Arc<dyn ConfirmationNotifier>,
}

pub struct PaymentLifecycleService {
    initiate: InitiatePaymentHandler,
    reconcile: Arc<ReconcilePaymentHandler>,
    status: GetPaymentStatusHandler,
    sweep: SweepOrphanedOrdersHandler,
    in_flight: SingleFlight<GatewayToken, ReconcileResult>,
}

impl PaymentLifecycleService {
    pub fn new(ports: LifecyclePorts, callbacks: CallbackUrls) -> Self {
        Self {
            initiate: InitiatePaymentHandler::new(
                ports.store.clone(),
                ports.gateway.clone(),
                callbacks,
            ),
            reconcile: Arc::new(ReconcilePaymentHandler::new(
                ports.store.clone(),
                ports.gateway,
                ports.ledger,
                ports.notifier,
            )),
            status: GetPaymentStatusHandler::new(ports.store.clone()),
            sweep: SweepOrphanedOrdersHandler::new(ports.store),
            in_flight: SingleFlight::new(),
        }
    }

    /// Start a purchase attempt and return where to send the payer.
    pub async fn initiate(
        &self,
        cmd: InitiatePaymentCommand,
    ) -> Result<InitiatePaymentResult, PaymentOrderError> {
        self.initiate.handle(cmd).await
    }

    /// Reconcile the order behind `token` with the gateway.
    ///
    /// Concurrent calls for the same token share one execution.
    pub async fn reconcile(&self, token: &GatewayToken) -> ReconcileResult {
        let handler = self.reconcile.clone();
        let cmd = ReconcilePaymentCommand {
            token: token.clone(),
        };
        self.in_flight
            .run(token.clone(), move || async move { handler.handle(cmd).await })
            .await
    }

    /// Payment details for display, reconciling first if still pending.
    ///
    /// A failed reconciliation is logged and the stored state returned, so a
    /// gateway outage degrades to a stale "Pendiente" rather than an error.
    pub async fn get_display_status(
        &self,
        token: &GatewayToken,
    ) -> Result<PaymentDetailsView, PaymentOrderError> {
        let query = GetPaymentStatusQuery {
            token: token.clone(),
        };
        let view = self.status.handle(&query).await?;
        if view.state != OrderState::Pending {
            return Ok(view);
        }

        match self.reconcile(token).await {
            Ok(ReconcileOutcome::Transitioned { .. })
            | Ok(ReconcileOutcome::AlreadySettled { .. }) => self.status.handle(&query).await,
            Ok(_) => Ok(view),
            Err(e) => {
                tracing::warn!(
                    order_id = %view.order_id,
                    error = %e,
                    "On-demand reconcile failed, returning stored status"
                );
                Ok(view)
            }
        }
    }

    /// Fail tokenless pending orders older than `max_age_secs`.
    pub async fn sweep_orphans(
        &self,
        max_age_secs: u64,
    ) -> Result<SweepOrphanedOrdersResult, PaymentOrderError> {
        self.sweep
            .handle(SweepOrphanedOrdersCommand { max_age_secs })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::memory::{
        InMemoryPaymentOrderStore, InMemoryRegistrationLedger, RecordingConfirmationNotifier,
    };
    use crate::domain::foundation::{Amount, RegistrationId};
    use crate::domain::payment::GatewayStatus;
    use crate::ports::{GatewayError, RegistrantDetails};
    use std::time::Duration;

    struct Fixture {
        store: InMemoryPaymentOrderStore,
        gateway: MockPaymentGateway,
        ledger: InMemoryRegistrationLedger,
        service: Arc<PaymentLifecycleService>,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryPaymentOrderStore::new();
        store
            .add_registrant(
                RegistrationId::new(42).unwrap(),
                RegistrantDetails {
                    registrant_name: "Ana".to_string(),
                    registrant_email: "ana@example.com".to_string(),
                    ticket_type_name: "General".to_string(),
                },
            )
            .await;
        let gateway = MockPaymentGateway::new();
        let ledger = InMemoryRegistrationLedger::new();
        let service = PaymentLifecycleService::new(
            LifecyclePorts {
                store: Arc::new(store.clone()),
                gateway: Arc::new(gateway.clone()),
                ledger: Arc::new(ledger.clone()),
                notifier: Arc::new(RecordingConfirmationNotifier::new()),
            },
            CallbackUrls::from_public_base("https://api.test"),
        );
        Fixture {
            store,
            gateway,
            ledger,
            service: Arc::new(service),
        }
    }

    fn command() -> InitiatePaymentCommand {
        InitiatePaymentCommand {
            registration_id: RegistrationId::new(42).unwrap(),
            amount: Amount::try_new(15000).unwrap(),
            payer_email: "ana@example.com".to_string(),
            subject: "Entrada General".to_string(),
        }
    }

    #[tokio::test]
    async fn display_status_reconciles_pending_orders() {
        let f = fixture().await;
        let started = f.service.initiate(command()).await.unwrap();
        f.gateway.set_status(started.token.as_str(), GatewayStatus::Paid);

        let view = f.service.get_display_status(&started.token).await.unwrap();

        assert_eq!(view.state, OrderState::Paid);
        assert_eq!(view.estado, "Pagado");
    }

    #[tokio::test]
    async fn display_status_does_not_query_settled_orders() {
        let f = fixture().await;
        let started = f.service.initiate(command()).await.unwrap();
        f.gateway.set_status(started.token.as_str(), GatewayStatus::Paid);
        f.service.reconcile(&started.token).await.unwrap();

        f.service.get_display_status(&started.token).await.unwrap();

        assert_eq!(f.gateway.call_count("get_status"), 1);
    }

    #[tokio::test]
    async fn display_status_survives_gateway_outage() {
        let f = fixture().await;
        let started = f.service.initiate(command()).await.unwrap();
        f.gateway
            .set_method_error("get_status", GatewayError::unavailable("timeout"));

        let view = f.service.get_display_status(&started.token).await.unwrap();

        assert_eq!(view.estado, "Pendiente");
    }

    #[tokio::test]
    async fn display_status_for_unknown_token_is_not_found() {
        let f = fixture().await;

        let err = f
            .service
            .get_display_status(&GatewayToken::new("missing").unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "PAYMENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn concurrent_reconciles_share_one_gateway_query() {
        let f = fixture().await;
        let started = f.service.initiate(command()).await.unwrap();
        f.gateway.set_status(started.token.as_str(), GatewayStatus::Paid);
        f.gateway.set_status_delay(Duration::from_millis(100));

        let mut tasks = Vec::new();
        for _ in 0..5 {
            let service = f.service.clone();
            let token = started.token.clone();
            tasks.push(tokio::spawn(async move { service.reconcile(&token).await }));
        }
        for task in tasks {
            assert!(matches!(
                task.await.unwrap().unwrap(),
                ReconcileOutcome::Transitioned { .. }
            ));
        }

        assert_eq!(f.gateway.call_count("get_status"), 1);
        assert_eq!(f.ledger.call_count().await, 1);
    }

    #[tokio::test]
    async fn sweep_fails_orphan_left_by_gateway_timeout() {
        let f = fixture().await;
        f.gateway.set_error(GatewayError::unavailable("timeout"));
        assert!(f.service.initiate(command()).await.is_err());
        let orphan = f.store.orders_for(RegistrationId::new(42).unwrap()).await[0].clone();
        f.store
            .backdate(&orphan.id, orphan.created_at.minus_secs(3600))
            .await;

        let result = f.service.sweep_orphans(900).await.unwrap();

        assert_eq!(result.failed, vec![orphan.id]);
        let retried = f.service.initiate(command()).await.unwrap();
        assert_ne!(retried.order_id, orphan.id);
    }
}
