//! PostgreSQL implementation of RegistrationLedger.
//!
//! Writes to the `registrations` table owned by the registration module.
//! Only the sold flag and the paying order are touched.

use crate::domain::foundation::{DomainError, ErrorCode, PaymentOrderId, RegistrationId};
use crate::ports::RegistrationLedger;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresRegistrationLedger {
    pool: PgPool,
}

impl PostgresRegistrationLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationLedger for PostgresRegistrationLedger {
    async fn record_ticket_sold(
        &self,
        registration_id: RegistrationId,
        order_id: PaymentOrderId,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE registrations
            SET ticket_sold = TRUE,
                payment_order_id = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(registration_id.value())
        .bind(order_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to mark ticket as sold: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::OrderNotFound,
                format!("Registration {} not found", registration_id),
            )
            .with_detail("registration_id", registration_id.to_string()));
        }

        Ok(())
    }
}
