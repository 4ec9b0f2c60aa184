//! Payment order store port.
//!
//! The store is the only writer of the payment order table. It owns the
//! invariant that a registration has at most one `Pending` order.
//!
//! # Design
//!
//! - **Atomic supersession**: `replace_pending` voids stale orders and
//!   inserts the new one as a single unit; a concurrent loser gets
//!   `PendingOrderExists`
//! - **Conditional writes**: `update_state` only applies when the stored
//!   state still matches what the caller read, so racing reconcilers cannot
//!   apply the same transition twice
//! - **Append-only by state**: orders are never deleted

use crate::domain::foundation::{
    Amount, DomainError, GatewayToken, MerchantOrderCode, PaymentOrderId, RegistrationId,
    Timestamp,
};
use crate::domain::payment::{OrderState, PaymentOrder};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Repository port for payment orders.
#[async_trait]
pub trait PaymentOrderStore: Send + Sync {
    /// Insert a new `Pending` order.
    ///
    /// # Errors
    ///
    /// - `PendingOrderExists` if the registration already has a pending order
    /// - `DatabaseError` on persistence failure
    async fn create(
        &self,
        registration_id: RegistrationId,
        amount: Amount,
        merchant_order_code: MerchantOrderCode,
    ) -> Result<PaymentOrder, DomainError>;

    /// Move every `Pending` or `Failed` order of the registration to `Voided`.
    ///
    /// Returns the number of orders voided.
    async fn void_stale_pending(&self, registration_id: RegistrationId) -> Result<u64, DomainError>;

    /// `void_stale_pending` followed by `create`, as one atomic unit.
    ///
    /// # Errors
    ///
    /// - `PendingOrderExists` if a concurrent attempt committed first
    /// - `DatabaseError` on persistence failure
    async fn replace_pending(
        &self,
        registration_id: RegistrationId,
        amount: Amount,
        merchant_order_code: MerchantOrderCode,
    ) -> Result<PaymentOrder, DomainError>;

    /// Conditionally move an order to a new state.
    ///
    /// Returns `None` when the stored state no longer equals
    /// `update.expected`, meaning another writer already moved it.
    async fn update_state(
        &self,
        order_id: &PaymentOrderId,
        update: StateUpdate,
    ) -> Result<Option<PaymentOrder>, DomainError>;

    /// Set the gateway token of a `Pending` order that has none yet.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if a token is already set
    /// - `OrderSuperseded` if the order left `Pending` while the gateway call ran
    /// - `OrderNotFound` if the order does not exist
    async fn attach_gateway_token(
        &self,
        order_id: &PaymentOrderId,
        token: &GatewayToken,
    ) -> Result<PaymentOrder, DomainError>;

    async fn find_by_gateway_token(
        &self,
        token: &GatewayToken,
    ) -> Result<Option<PaymentOrder>, DomainError>;

    /// Order joined with registration, registrant and ticket type.
    async fn find_with_registration_details(
        &self,
        token: &GatewayToken,
    ) -> Result<Option<PaymentDetailsView>, DomainError>;

    /// Pending orders without a gateway token created before `cutoff`.
    async fn find_orphaned_before(&self, cutoff: Timestamp) -> Result<Vec<PaymentOrder>, DomainError>;
}

/// A conditional state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateUpdate {
    /// State the caller observed.
    pub expected: OrderState,

    pub target: OrderState,

    /// Raw gateway code that triggered the change, if any.
    pub gateway_status: Option<i32>,
}

/// Registration data shown next to a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrantDetails {
    pub registrant_name: String,
    pub registrant_email: String,
    pub ticket_type_name: String,
}

/// Read model for the payment confirmation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetailsView {
    pub order_id: PaymentOrderId,
    pub registration_id: RegistrationId,
    pub merchant_order_code: MerchantOrderCode,
    pub gateway_token: Option<GatewayToken>,
    pub amount: Amount,
    pub state: OrderState,

    /// Registrant-facing label of `state`.
    pub estado: String,

    pub updated_at: Timestamp,
    pub registrant: RegistrantDetails,
}

impl PaymentDetailsView {
    pub fn new(order: &PaymentOrder, registrant: RegistrantDetails) -> Self {
        Self {
            order_id: order.id,
            registration_id: order.registration_id,
            merchant_order_code: order.merchant_order_code.clone(),
            gateway_token: order.gateway_token.clone(),
            amount: order.amount,
            state: order.state,
            estado: order.state.display_label().to_string(),
            updated_at: order.updated_at,
            registrant,
        }
    }
}
