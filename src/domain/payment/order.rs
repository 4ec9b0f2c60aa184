//! Payment order aggregate.
//!
//! A `PaymentOrder` records one attempt to pay for a registration. Orders are
//! never deleted: settled orders stay behind as the audit trail of every
//! attempt.
//!
//! # Design Decisions
//!
//! - **Whole currency units**: amounts are integers, never floats
//! - **Token written once**: the gateway token is attached after order
//!   creation succeeds and is immutable from then on
//! - **Explicit phase**: "pending without a token" is surfaced as
//!   [`OrderPhase::Orphaned`] instead of being inferred at each call site

use crate::domain::foundation::{
    Amount, DomainError, ErrorCode, GatewayToken, MerchantOrderCode, PaymentOrderId,
    RegistrationId, StateMachine, Timestamp,
};
use serde::{Deserialize, Serialize};

use super::OrderState;

/// Payment order aggregate.
///
/// # Invariants
///
/// - `merchant_order_code` is globally unique
/// - `gateway_token` is set at most once
/// - `state` only moves along [`OrderState`] transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub id: PaymentOrderId,

    /// Registration this order pays for.
    pub registration_id: RegistrationId,

    pub amount: Amount,

    /// Idempotency key sent to the gateway.
    pub merchant_order_code: MerchantOrderCode,

    /// Assigned by the gateway once order creation succeeds.
    pub gateway_token: Option<GatewayToken>,

    pub state: OrderState,

    /// Last raw status code reported by the gateway, if any.
    pub gateway_status: Option<i32>,

    pub created_at: Timestamp,

    /// When the state last changed.
    pub updated_at: Timestamp,
}

/// Lifecycle phase derived from state and token presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderPhase {
    /// Pending, but the gateway never returned a token. It can never be
    /// confirmed and is resolved by the orphan sweep or a new attempt.
    Orphaned,

    /// Pending and known to the gateway.
    AwaitingConfirmation { token: GatewayToken },

    /// Paid, Failed or Voided.
    Settled(OrderState),
}

impl PaymentOrder {
    /// Create a new pending order without a gateway token.
    pub fn new_pending(
        registration_id: RegistrationId,
        amount: Amount,
        merchant_order_code: MerchantOrderCode,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: PaymentOrderId::new(),
            registration_id,
            amount,
            merchant_order_code,
            gateway_token: None,
            state: OrderState::Pending,
            gateway_status: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn phase(&self) -> OrderPhase {
        match (&self.state, &self.gateway_token) {
            (OrderState::Pending, None) => OrderPhase::Orphaned,
            (OrderState::Pending, Some(token)) => OrderPhase::AwaitingConfirmation {
                token: token.clone(),
            },
            (state, _) => OrderPhase::Settled(*state),
        }
    }

    /// True once the order can no longer change state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Attach the gateway token.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if a token is already set
    /// - `OrderSuperseded` if the order is no longer `Pending`
    pub fn attach_token(&mut self, token: GatewayToken) -> Result<(), DomainError> {
        if let Some(existing) = &self.gateway_token {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Order {} already has gateway token {}", self.id, existing),
            ));
        }
        if self.state != OrderState::Pending {
            return Err(superseded_error(self.id, self.registration_id, self.state));
        }
        self.gateway_token = Some(token);
        Ok(())
    }

    /// Move to `target`, stamping `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current state is not allowed.
    pub fn transition_to(&mut self, target: OrderState) -> Result<(), DomainError> {
        self.state = self.state.transition_to(target).map_err(|e| {
            DomainError::new(ErrorCode::InvalidStateTransition, e.to_string())
                .with_detail("order_id", self.id.to_string())
        })?;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

/// Error for a gateway token that arrives after its order left `Pending`.
pub fn superseded_error(
    order_id: PaymentOrderId,
    registration_id: RegistrationId,
    state: OrderState,
) -> DomainError {
    DomainError::new(
        ErrorCode::OrderSuperseded,
        format!(
            "Order {} is {} and can no longer take a gateway token",
            order_id,
            state.as_str()
        ),
    )
    .with_detail("registration_id", registration_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_order() -> PaymentOrder {
        let registration = RegistrationId::new(42).unwrap();
        PaymentOrder::new_pending(
            registration,
            Amount::try_new(15000).unwrap(),
            MerchantOrderCode::generate(registration),
        )
    }

    #[test]
    fn new_order_is_orphaned_until_token_attached() {
        let mut order = pending_order();
        assert_eq!(order.phase(), OrderPhase::Orphaned);

        let token = GatewayToken::new("tok_1").unwrap();
        order.attach_token(token.clone()).unwrap();
        assert_eq!(order.phase(), OrderPhase::AwaitingConfirmation { token });
    }

    #[test]
    fn token_is_set_at_most_once() {
        let mut order = pending_order();
        order.attach_token(GatewayToken::new("tok_1").unwrap()).unwrap();

        let result = order.attach_token(GatewayToken::new("tok_2").unwrap());
        assert!(result.is_err());
        assert_eq!(order.gateway_token.unwrap().as_str(), "tok_1");
    }

    #[test]
    fn voided_order_rejects_token() {
        let mut order = pending_order();
        order.transition_to(OrderState::Voided).unwrap();

        let err = order
            .attach_token(GatewayToken::new("tok_late").unwrap())
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::OrderSuperseded);
        assert_eq!(err.details.get("registration_id"), Some(&"42".to_string()));
        assert!(order.gateway_token.is_none());
    }

    #[test]
    fn settled_orders_report_their_state() {
        let mut order = pending_order();
        order.attach_token(GatewayToken::new("tok_1").unwrap()).unwrap();
        order.transition_to(OrderState::Paid).unwrap();

        assert_eq!(order.phase(), OrderPhase::Settled(OrderState::Paid));
        assert!(order.is_terminal());
    }

    #[test]
    fn invalid_transition_leaves_state_untouched() {
        let mut order = pending_order();
        order.transition_to(OrderState::Failed).unwrap();

        let err = order.transition_to(OrderState::Paid).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        assert_eq!(order.state, OrderState::Failed);
    }
}
