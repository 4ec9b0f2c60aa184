//! In-memory payment order store.
//!
//! Keeps orders in a single `RwLock`-guarded table. Every operation takes the
//! lock once, which gives the same atomicity the Postgres adapter gets from
//! transactions and conditional updates. Useful for tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{
    Amount, DomainError, ErrorCode, GatewayToken, MerchantOrderCode, PaymentOrderId,
    RegistrationId, StateMachine, Timestamp,
};
use crate::domain::payment::{OrderState, PaymentOrder};
use crate::ports::{PaymentDetailsView, PaymentOrderStore, RegistrantDetails, StateUpdate};

#[derive(Debug, Default)]
struct StoreState {
    orders: Vec<PaymentOrder>,
    registrants: HashMap<RegistrationId, RegistrantDetails>,
}

impl StoreState {
    fn insert_pending(
        &mut self,
        registration_id: RegistrationId,
        amount: Amount,
        merchant_order_code: MerchantOrderCode,
    ) -> Result<PaymentOrder, DomainError> {
        let has_pending = self
            .orders
            .iter()
            .any(|o| o.registration_id == registration_id && o.state == OrderState::Pending);
        if has_pending {
            return Err(DomainError::new(
                ErrorCode::PendingOrderExists,
                format!("Registration {} already has a pending order", registration_id),
            )
            .with_detail("registration_id", registration_id.to_string()));
        }

        if self
            .orders
            .iter()
            .any(|o| o.merchant_order_code == merchant_order_code)
        {
            return Err(DomainError::database(format!(
                "Duplicate merchant order code {}",
                merchant_order_code
            )));
        }

        let order = PaymentOrder::new_pending(registration_id, amount, merchant_order_code);
        self.orders.push(order.clone());
        Ok(order)
    }

    fn void_stale(&mut self, registration_id: RegistrationId) -> u64 {
        let mut voided = 0;
        for order in self
            .orders
            .iter_mut()
            .filter(|o| o.registration_id == registration_id && o.state.is_supersedable())
        {
            if order.transition_to(OrderState::Voided).is_ok() {
                voided += 1;
            }
        }
        voided
    }
}

/// In-memory implementation of [`PaymentOrderStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentOrderStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryPaymentOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the registrant shown next to the registration's orders.
    pub async fn add_registrant(&self, registration_id: RegistrationId, details: RegistrantDetails) {
        self.state
            .write()
            .await
            .registrants
            .insert(registration_id, details);
    }

    /// All orders of a registration, oldest first.
    pub async fn orders_for(&self, registration_id: RegistrationId) -> Vec<PaymentOrder> {
        self.state
            .read()
            .await
            .orders
            .iter()
            .filter(|o| o.registration_id == registration_id)
            .cloned()
            .collect()
    }

    pub async fn find_by_id(&self, order_id: &PaymentOrderId) -> Option<PaymentOrder> {
        self.state
            .read()
            .await
            .orders
            .iter()
            .find(|o| &o.id == order_id)
            .cloned()
    }

    /// Overwrite `created_at` so tests can age an order.
    pub async fn backdate(&self, order_id: &PaymentOrderId, created_at: Timestamp) {
        if let Some(order) = self
            .state
            .write()
            .await
            .orders
            .iter_mut()
            .find(|o| &o.id == order_id)
        {
            order.created_at = created_at;
        }
    }
}

#[async_trait]
impl PaymentOrderStore for InMemoryPaymentOrderStore {
    async fn create(
        &self,
        registration_id: RegistrationId,
        amount: Amount,
        merchant_order_code: MerchantOrderCode,
    ) -> Result<PaymentOrder, DomainError> {
        self.state
            .write()
            .await
            .insert_pending(registration_id, amount, merchant_order_code)
    }

    async fn void_stale_pending(&self, registration_id: RegistrationId) -> Result<u64, DomainError> {
        Ok(self.state.write().await.void_stale(registration_id))
    }

    async fn replace_pending(
        &self,
        registration_id: RegistrationId,
        amount: Amount,
        merchant_order_code: MerchantOrderCode,
    ) -> Result<PaymentOrder, DomainError> {
        let mut state = self.state.write().await;
        state.void_stale(registration_id);
        state.insert_pending(registration_id, amount, merchant_order_code)
    }

    async fn update_state(
        &self,
        order_id: &PaymentOrderId,
        update: StateUpdate,
    ) -> Result<Option<PaymentOrder>, DomainError> {
        if !update.expected.can_transition_to(&update.target) {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition from {} to {}",
                    update.expected.as_str(),
                    update.target.as_str()
                ),
            ));
        }

        let mut state = self.state.write().await;
        let Some(order) = state.orders.iter_mut().find(|o| &o.id == order_id) else {
            return Ok(None);
        };
        if order.state != update.expected {
            return Ok(None);
        }

        order.transition_to(update.target)?;
        if update.gateway_status.is_some() {
            order.gateway_status = update.gateway_status;
        }
        Ok(Some(order.clone()))
    }

    async fn attach_gateway_token(
        &self,
        order_id: &PaymentOrderId,
        token: &GatewayToken,
    ) -> Result<PaymentOrder, DomainError> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .iter_mut()
            .find(|o| &o.id == order_id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::OrderNotFound, format!("Order {} not found", order_id))
            })?;

        order.attach_token(token.clone())?;
        Ok(order.clone())
    }

    async fn find_by_gateway_token(
        &self,
        token: &GatewayToken,
    ) -> Result<Option<PaymentOrder>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .orders
            .iter()
            .find(|o| o.gateway_token.as_ref() == Some(token))
            .cloned())
    }

    async fn find_with_registration_details(
        &self,
        token: &GatewayToken,
    ) -> Result<Option<PaymentDetailsView>, DomainError> {
        let state = self.state.read().await;
        let Some(order) = state
            .orders
            .iter()
            .find(|o| o.gateway_token.as_ref() == Some(token))
        else {
            return Ok(None);
        };

        Ok(state
            .registrants
            .get(&order.registration_id)
            .map(|registrant| PaymentDetailsView::new(order, registrant.clone())))
    }

    async fn find_orphaned_before(&self, cutoff: Timestamp) -> Result<Vec<PaymentOrder>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .orders
            .iter()
            .filter(|o| {
                o.state == OrderState::Pending
                    && o.gateway_token.is_none()
                    && o.created_at.is_before(&cutoff)
            })
            .cloned()
            .collect())
    }
}
