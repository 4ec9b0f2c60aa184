//! PostgreSQL implementation of PaymentOrderStore.
//!
//! The single-pending invariant is enforced by the partial unique index
//! `payment_orders_one_pending_per_registration`. Supersession runs in one
//! transaction, and every state change is a conditional `UPDATE ... WHERE
//! state = $expected`, so concurrent writers cannot both win.

use crate::domain::foundation::{
    Amount, DomainError, ErrorCode, GatewayToken, MerchantOrderCode, PaymentOrderId,
    RegistrationId, StateMachine, Timestamp,
};
use crate::domain::payment::{superseded_error, OrderState, PaymentOrder};
use crate::ports::{PaymentDetailsView, PaymentOrderStore, RegistrantDetails, StateUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const ONE_PENDING_INDEX: &str = "payment_orders_one_pending_per_registration";
const ORDER_COLUMNS: &str = "id, registration_id, amount, merchant_order_code, gateway_token, \
                             state, gateway_status, created_at, updated_at";

/// PostgreSQL implementation of the PaymentOrderStore port.
pub struct PostgresPaymentOrderStore {
    pool: PgPool,
}

impl PostgresPaymentOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_pending(
        tx: &mut Transaction<'_, Postgres>,
        order: &PaymentOrder,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_orders (
                id, registration_id, amount, merchant_order_code, gateway_token,
                state, gateway_status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, NULL, $5, NULL, $6, $7)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.registration_id.value())
        .bind(order.amount.value())
        .bind(order.merchant_order_code.as_str())
        .bind(order.state.as_str())
        .bind(order.created_at.as_datetime())
        .bind(order.updated_at.as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(ONE_PENDING_INDEX) {
                    return pending_order_exists(order.registration_id);
                }
            }
            DomainError::database(format!("Failed to insert payment order: {}", e))
        })?;

        Ok(())
    }

    async fn void_stale(
        tx: &mut Transaction<'_, Postgres>,
        registration_id: RegistrationId,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_orders
            SET state = 'voided', updated_at = NOW()
            WHERE registration_id = $1 AND state IN ('pending', 'failed')
            "#,
        )
        .bind(registration_id.value())
        .execute(&mut **tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to void stale orders: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, DomainError> {
        self.pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to start transaction: {}", e)))
    }
}

/// Database row representation of a payment order.
#[derive(Debug, sqlx::FromRow)]
struct PaymentOrderRow {
    id: Uuid,
    registration_id: i64,
    amount: i64,
    merchant_order_code: String,
    gateway_token: Option<String>,
    state: String,
    gateway_status: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentOrderRow> for PaymentOrder {
    type Error = DomainError;

    fn try_from(row: PaymentOrderRow) -> Result<Self, Self::Error> {
        Ok(PaymentOrder {
            id: PaymentOrderId::from_uuid(row.id),
            registration_id: RegistrationId::new(row.registration_id).map_err(corrupt_row)?,
            amount: Amount::try_new(row.amount).map_err(corrupt_row)?,
            merchant_order_code: MerchantOrderCode::from_stored(row.merchant_order_code),
            gateway_token: row
                .gateway_token
                .map(GatewayToken::new)
                .transpose()
                .map_err(corrupt_row)?,
            state: parse_state(&row.state)?,
            gateway_status: row.gateway_status,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Order row joined with registration, contact and ticket type.
#[derive(Debug, sqlx::FromRow)]
struct PaymentDetailsRow {
    #[sqlx(flatten)]
    order: PaymentOrderRow,
    registrant_name: String,
    registrant_email: String,
    ticket_type_name: String,
}

impl TryFrom<PaymentDetailsRow> for PaymentDetailsView {
    type Error = DomainError;

    fn try_from(row: PaymentDetailsRow) -> Result<Self, Self::Error> {
        let order = PaymentOrder::try_from(row.order)?;
        Ok(PaymentDetailsView::new(
            &order,
            RegistrantDetails {
                registrant_name: row.registrant_name,
                registrant_email: row.registrant_email,
                ticket_type_name: row.ticket_type_name,
            },
        ))
    }
}

fn parse_state(s: &str) -> Result<OrderState, DomainError> {
    OrderState::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid state value: {}", s),
        )
    })
}

fn corrupt_row(e: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Corrupt payment order row: {}", e))
}

fn pending_order_exists(registration_id: RegistrationId) -> DomainError {
    DomainError::new(
        ErrorCode::PendingOrderExists,
        format!("Registration {} already has a pending order", registration_id),
    )
    .with_detail("registration_id", registration_id.to_string())
}

#[async_trait]
impl PaymentOrderStore for PostgresPaymentOrderStore {
    async fn create(
        &self,
        registration_id: RegistrationId,
        amount: Amount,
        merchant_order_code: MerchantOrderCode,
    ) -> Result<PaymentOrder, DomainError> {
        let order = PaymentOrder::new_pending(registration_id, amount, merchant_order_code);

        let mut tx = self.begin().await?;
        Self::insert_pending(&mut tx, &order).await?;
        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit transaction: {}", e)))?;

        Ok(order)
    }

    async fn void_stale_pending(&self, registration_id: RegistrationId) -> Result<u64, DomainError> {
        let mut tx = self.begin().await?;
        let voided = Self::void_stale(&mut tx, registration_id).await?;
        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit transaction: {}", e)))?;

        Ok(voided)
    }

    async fn replace_pending(
        &self,
        registration_id: RegistrationId,
        amount: Amount,
        merchant_order_code: MerchantOrderCode,
    ) -> Result<PaymentOrder, DomainError> {
        let order = PaymentOrder::new_pending(registration_id, amount, merchant_order_code);

        // A concurrent replace blocks on the voided rows, then hits the
        // partial index once the first commits.
        let mut tx = self.begin().await?;
        let voided = Self::void_stale(&mut tx, registration_id).await?;
        Self::insert_pending(&mut tx, &order).await?;
        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit transaction: {}", e)))?;

        if voided > 0 {
            tracing::info!(
                registration_id = %registration_id,
                voided,
                "Superseded stale payment orders"
            );
        }

        Ok(order)
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

        let row: Option<PaymentOrderRow> = sqlx::query_as(&format!(
            r#"
            UPDATE payment_orders
            SET state = $3,
                gateway_status = COALESCE($4, gateway_status),
                updated_at = NOW()
            WHERE id = $1 AND state = $2
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id.as_uuid())
        .bind(update.expected.as_str())
        .bind(update.target.as_str())
        .bind(update.gateway_status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update order state: {}", e)))?;

        row.map(PaymentOrder::try_from).transpose()
    }

    async fn attach_gateway_token(
        &self,
        order_id: &PaymentOrderId,
        token: &GatewayToken,
    ) -> Result<PaymentOrder, DomainError> {
        // Only a still-pending order may take a token; a superseded one
        // must not become payable again.
        let row: Option<PaymentOrderRow> = sqlx::query_as(&format!(
            r#"
            UPDATE payment_orders
            SET gateway_token = $2
            WHERE id = $1 AND gateway_token IS NULL AND state = 'pending'
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id.as_uuid())
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to attach gateway token: {}", e)))?;

        if let Some(row) = row {
            return PaymentOrder::try_from(row);
        }

        let current: Option<PaymentOrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payment_orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find order: {}", e)))?;

        let Some(current) = current else {
            return Err(DomainError::new(
                ErrorCode::OrderNotFound,
                format!("Order {} not found", order_id),
            ));
        };
        let current = PaymentOrder::try_from(current)?;
        if current.gateway_token.is_some() {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Order {} already has a gateway token", order_id),
            ));
        }
        Err(superseded_error(
            current.id,
            current.registration_id,
            current.state,
        ))
    }

    async fn find_by_gateway_token(
        &self,
        token: &GatewayToken,
    ) -> Result<Option<PaymentOrder>, DomainError> {
        let row: Option<PaymentOrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payment_orders WHERE gateway_token = $1",
            ORDER_COLUMNS
        ))
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find order by token: {}", e)))?;

        row.map(PaymentOrder::try_from).transpose()
    }

    async fn find_with_registration_details(
        &self,
        token: &GatewayToken,
    ) -> Result<Option<PaymentDetailsView>, DomainError> {
        let row: Option<PaymentDetailsRow> = sqlx::query_as(
            r#"
            SELECT po.id, po.registration_id, po.amount, po.merchant_order_code,
                   po.gateway_token, po.state, po.gateway_status, po.created_at,
                   po.updated_at,
                   c.full_name AS registrant_name,
                   c.email AS registrant_email,
                   tt.name AS ticket_type_name
            FROM payment_orders po
            JOIN registrations r ON r.id = po.registration_id
            JOIN contacts c ON c.id = r.contact_id
            JOIN ticket_types tt ON tt.id = r.ticket_type_id
            WHERE po.gateway_token = $1
            "#,
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load payment details: {}", e)))?;

        row.map(PaymentDetailsView::try_from).transpose()
    }

    async fn find_orphaned_before(&self, cutoff: Timestamp) -> Result<Vec<PaymentOrder>, DomainError> {
        let rows: Vec<PaymentOrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM payment_orders
            WHERE state = 'pending' AND gateway_token IS NULL AND created_at < $1
            ORDER BY created_at
            "#,
            ORDER_COLUMNS
        ))
        .bind(cutoff.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find orphaned orders: {}", e)))?;

        rows.into_iter().map(PaymentOrder::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(state: &str) -> PaymentOrderRow {
        PaymentOrderRow {
            id: Uuid::new_v4(),
            registration_id: 42,
            amount: 15000,
            merchant_order_code: "R42-abc".to_string(),
            gateway_token: Some("tok_1".to_string()),
            state: state.to_string(),
            gateway_status: Some(2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parse_state_works_for_all_values() {
        assert_eq!(parse_state("pending").unwrap(), OrderState::Pending);
        assert_eq!(parse_state("paid").unwrap(), OrderState::Paid);
        assert_eq!(parse_state("failed").unwrap(), OrderState::Failed);
        assert_eq!(parse_state("voided").unwrap(), OrderState::Voided);
    }

    #[test]
    fn parse_state_rejects_invalid_values() {
        assert!(parse_state("refunded").is_err());
        assert!(parse_state("").is_err());
    }

    #[test]
    fn row_converts_to_order() {
        let order = PaymentOrder::try_from(row("paid")).unwrap();
        assert_eq!(order.registration_id.value(), 42);
        assert_eq!(order.state, OrderState::Paid);
        assert_eq!(order.gateway_token.unwrap().as_str(), "tok_1");
    }

    #[test]
    fn corrupt_rows_are_database_errors() {
        let mut bad = row("paid");
        bad.amount = 0;
        let err = PaymentOrder::try_from(bad).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn pending_conflict_carries_registration() {
        let err = pending_order_exists(RegistrationId::new(42).unwrap());
        assert_eq!(err.code, ErrorCode::PendingOrderExists);
        assert_eq!(err.details.get("registration_id").unwrap(), "42");
    }
}
