//! Payment order state machine.
//!
//! Defines the states a payment order moves through and the valid
//! transitions between them.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// State of a payment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Order created, payment not yet confirmed by the gateway.
    Pending,

    /// Gateway confirmed the payment. Terminal.
    Paid,

    /// Gateway rejected the payment, or the attempt was abandoned.
    /// Can still be superseded by a new attempt.
    Failed,

    /// Superseded by a newer purchase attempt. Terminal.
    Voided,
}

impl OrderState {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Pending => "pending",
            OrderState::Paid => "paid",
            OrderState::Failed => "failed",
            OrderState::Voided => "voided",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(OrderState::Pending),
            "paid" => Some(OrderState::Paid),
            "failed" => Some(OrderState::Failed),
            "voided" => Some(OrderState::Voided),
            _ => None,
        }
    }

    /// Label shown to registrants on the confirmation page.
    pub fn display_label(&self) -> &'static str {
        match self {
            OrderState::Pending => "Pendiente",
            OrderState::Paid => "Pagado",
            OrderState::Failed => "Rechazado",
            OrderState::Voided => "Anulado",
        }
    }

    /// True for states a new purchase attempt may void.
    pub fn is_supersedable(&self) -> bool {
        matches!(self, OrderState::Pending | OrderState::Failed)
    }
}

impl StateMachine for OrderState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use OrderState::*;
        matches!(
            (self, target),
            (Pending, Paid) | (Pending, Failed) | (Pending, Voided) | (Failed, Voided)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use OrderState::*;
        match self {
            Pending => vec![Paid, Failed, Voided],
            Failed => vec![Voided],
            Paid => vec![],
            Voided => vec![],
        }
    }
}
