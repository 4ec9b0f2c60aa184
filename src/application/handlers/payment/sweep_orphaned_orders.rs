//! SweepOrphanedOrdersHandler - Command handler that fails abandoned orders.
//!
//! An order whose gateway call never returned a token can never be confirmed.
//! Once it is older than the configured age it is moved to `Failed`, which
//! keeps it out of the "payment in progress" count and lets the registrant
//! start over.

use std::sync::Arc;

use crate::domain::foundation::{PaymentOrderId, Timestamp};
use crate::domain::payment::{OrderState, PaymentOrderError};
use crate::ports::{PaymentOrderStore, StateUpdate};

/// Command to sweep orphaned orders.
#[derive(Debug, Clone, Copy)]
pub struct SweepOrphanedOrdersCommand {
    /// Orders created more than this many seconds ago are swept.
    pub max_age_secs: u64,
}

/// Result of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOrphanedOrdersResult {
    /// Orders this sweep moved to `Failed`.
    pub failed: Vec<PaymentOrderId>,

    /// Orders that changed state underneath the sweep.
    pub skipped: usize,
}

pub struct SweepOrphanedOrdersHandler {
    store: Arc<dyn PaymentOrderStore>,
}

impl SweepOrphanedOrdersHandler {
    pub fn new(store: Arc<dyn PaymentOrderStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        cmd: SweepOrphanedOrdersCommand,
    ) -> Result<SweepOrphanedOrdersResult, PaymentOrderError> {
        let cutoff = Timestamp::now().minus_secs(cmd.max_age_secs);
        let orphans = self.store.find_orphaned_before(cutoff).await?;

        let mut result = SweepOrphanedOrdersResult::default();
        for order in orphans {
            let update = StateUpdate {
                expected: OrderState::Pending,
                target: OrderState::Failed,
                gateway_status: None,
            };
            match self.store.update_state(&order.id, update).await? {
                Some(_) => {
                    tracing::info!(
                        order_id = %order.id,
                        registration_id = %order.registration_id,
                        created_at = %order.created_at.to_rfc3339(),
                        "Orphaned payment order failed"
                    );
                    result.failed.push(order.id);
                }
                None => result.skipped += 1,
            }
        }

        if !result.failed.is_empty() || result.skipped > 0 {
            tracing::info!(
                failed = result.failed.len(),
                skipped = result.skipped,
                "Orphan sweep finished"
            );
        }

        Ok(result)
    }
}
