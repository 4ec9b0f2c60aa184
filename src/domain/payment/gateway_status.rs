//! Gateway status codes and their mapping onto local order states.
//!
//! The gateway reports payment status as a numeric code. Only codes on an
//! explicit allow-list move an order; anything else leaves it `Pending` so a
//! later poll can settle it.

use serde::{Deserialize, Serialize};

use super::OrderState;

/// Status code reported by the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayStatus {
    /// 1: payment not completed yet.
    AwaitingPayment,

    /// 2: payment confirmed.
    Paid,

    /// 3: payment rejected by the processor.
    Rejected,

    /// 4: payment cancelled or expired.
    Cancelled,

    /// Any code outside the known set.
    Unrecognized(i32),
}

impl GatewayStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => GatewayStatus::AwaitingPayment,
            2 => GatewayStatus::Paid,
            3 => GatewayStatus::Rejected,
            4 => GatewayStatus::Cancelled,
            other => GatewayStatus::Unrecognized(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            GatewayStatus::AwaitingPayment => 1,
            GatewayStatus::Paid => 2,
            GatewayStatus::Rejected => 3,
            GatewayStatus::Cancelled => 4,
            GatewayStatus::Unrecognized(code) => *code,
        }
    }

    /// Local state this status settles an order into.
    ///
    /// Returns `None` when the order must stay as it is.
    pub fn target_state(&self) -> Option<OrderState> {
        match self {
            GatewayStatus::Paid => Some(OrderState::Paid),
            GatewayStatus::Rejected | GatewayStatus::Cancelled => Some(OrderState::Failed),
            GatewayStatus::AwaitingPayment | GatewayStatus::Unrecognized(_) => None,
        }
    }
}
