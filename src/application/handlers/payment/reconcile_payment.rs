//! ReconcilePaymentHandler - Command handler for settling an order from the
//! gateway's authoritative status.
//!
//! Callback payloads are never trusted: every reconciliation asks the gateway
//! directly. The local state only changes through a conditional write, and
//! the paid side effects run only for the caller whose write took effect, so
//! replayed or concurrent callbacks settle an order exactly once.

use std::sync::Arc;

use crate::domain::foundation::{GatewayToken, PaymentOrderId, StateMachine};
use crate::domain::payment::{GatewayStatus, OrderState, PaymentOrder, PaymentOrderError};
use crate::ports::{
    ConfirmationNotifier, PaymentGateway, PaymentOrderStore, RegistrationLedger, StateUpdate,
};

/// Command to reconcile the order behind a gateway token.
#[derive(Debug, Clone)]
pub struct ReconcilePaymentCommand {
    pub token: GatewayToken,
}

/// What reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No order carries the token.
    UnknownToken,

    /// Order was already final; the gateway was not asked.
    AlreadySettled { order_id: PaymentOrderId, state: OrderState },

    /// This call moved the order.
    Transitioned {
        order_id: PaymentOrderId,
        from: OrderState,
        to: OrderState,
    },

    /// Gateway status did not move the order.
    Unchanged {
        order_id: PaymentOrderId,
        state: OrderState,
        gateway_status: GatewayStatus,
    },
}

/// Handler for reconciling a payment order with the gateway.
pub struct ReconcilePaymentHandler {
    store: Arc<dyn PaymentOrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn RegistrationLedger>,
    notifier: Arc<dyn ConfirmationNotifier>,
}

impl ReconcilePaymentHandler {
    pub fn new(
        store: Arc<dyn PaymentOrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<dyn RegistrationLedger>,
        notifier: Arc<dyn ConfirmationNotifier>,
    ) -> Self {
        Self {
            store,
            gateway,
            ledger,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReconcilePaymentCommand,
    ) -> Result<ReconcileOutcome, PaymentOrderError> {
        // 1. Look up the local order
        let Some(order) = self.store.find_by_gateway_token(&cmd.token).await? else {
            tracing::warn!(token = %cmd.token, "Reconcile requested for unknown token");
            return Ok(ReconcileOutcome::UnknownToken);
        };

        if order.is_terminal() {
            tracing::debug!(
                order_id = %order.id,
                state = order.state.as_str(),
                "Order already settled, skipping gateway query"
            );
            return Ok(ReconcileOutcome::AlreadySettled {
                order_id: order.id,
                state: order.state,
            });
        }

        // 2. Ask the gateway
        let report = self.gateway.get_status(&cmd.token).await.map_err(|e| {
            tracing::warn!(order_id = %order.id, error = %e, "Gateway status query failed");
            PaymentOrderError::from(e)
        })?;

        let unchanged = ReconcileOutcome::Unchanged {
            order_id: order.id,
            state: order.state,
            gateway_status: report.status,
        };

        let Some(target) = report.status.target_state() else {
            tracing::info!(
                order_id = %order.id,
                gateway_status = report.status.code(),
                "Gateway status does not settle the order"
            );
            return Ok(unchanged);
        };

        if target == order.state {
            return Ok(unchanged);
        }

        if !order.state.can_transition_to(&target) {
            tracing::warn!(
                order_id = %order.id,
                local_state = order.state.as_str(),
                gateway_status = report.status.code(),
                "Gateway status conflicts with local state, leaving order as is"
            );
            return Ok(unchanged);
        }

        // 3. Conditional write; only the winner continues
        let update = StateUpdate {
            expected: order.state,
            target,
            gateway_status: Some(report.status.code()),
        };
        let Some(updated) = self.store.update_state(&order.id, update).await? else {
            let current = self
                .store
                .find_by_gateway_token(&cmd.token)
                .await?
                .map(|o| o.state)
                .unwrap_or(order.state);
            tracing::info!(
                order_id = %order.id,
                state = current.as_str(),
                "Order settled by a concurrent writer"
            );
            return Ok(ReconcileOutcome::AlreadySettled {
                order_id: order.id,
                state: current,
            });
        };

        tracing::info!(
            order_id = %updated.id,
            from = order.state.as_str(),
            to = updated.state.as_str(),
            gateway_status = report.status.code(),
            "Payment order reconciled"
        );

        if updated.state == OrderState::Paid {
            self.on_paid(&updated, &cmd.token).await;
        }

        Ok(ReconcileOutcome::Transitioned {
            order_id: updated.id,
            from: order.state,
            to: updated.state,
        })
    }

    /// Paid side effects. The order is already Paid, so failures are logged
    /// rather than returned.
    async fn on_paid(&self, order: &PaymentOrder, token: &GatewayToken) {
        if let Err(e) = self
            .ledger
            .record_ticket_sold(order.registration_id, order.id)
            .await
        {
            tracing::error!(
                order_id = %order.id,
                registration_id = %order.registration_id,
                error = %e,
                "Failed to mark ticket as sold"
            );
        }

        match self.store.find_with_registration_details(token).await {
            Ok(Some(details)) => {
                if let Err(e) = self.notifier.payment_confirmed(&details).await {
                    tracing::error!(
                        order_id = %order.id,
                        error = %e,
                        "Failed to send payment confirmation"
                    );
                }
            }
            Ok(None) => {
                tracing::warn!(
                    order_id = %order.id,
                    "No registration details for paid order, confirmation not sent"
                );
            }
            Err(e) => {
                tracing::error!(
                    order_id = %order.id,
                    error = %e,
                    "Failed to load registration details for confirmation"
                );
            }
        }
    }
}
