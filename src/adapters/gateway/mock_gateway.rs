//! Mock payment gateway for testing.
//!
//! Provides a configurable implementation of `PaymentGateway` for unit and
//! integration tests. Supports:
//! - Per-token status configuration
//! - Error injection, globally or per method
//! - Call tracking
//! - Artificial latency on status queries

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::domain::foundation::GatewayToken;
use crate::domain::payment::GatewayStatus;
use crate::ports::{CreateOrderRequest, GatewayError, GatewayOrder, GatewayStatusReport, PaymentGateway};

/// Mock payment gateway for testing.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// let order = gateway.create_order(request).await?;
///
/// gateway.set_status(order.token.as_str(), GatewayStatus::Paid);
/// gateway.set_method_error("get_status", GatewayError::unavailable("timeout"));
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Status reported per token.
    statuses: HashMap<String, GatewayStatus>,

    /// Order to hand out on the next `create_order` call.
    next_order: Option<GatewayOrder>,

    /// Tokens issued so far, used to number generated tokens.
    issued: u64,

    /// Error to return on the next call to any method.
    next_error: Option<GatewayError>,

    /// Sticky errors by method name.
    method_errors: HashMap<String, GatewayError>,

    status_delay: Option<Duration>,

    call_log: Vec<MethodCall>,

    create_requests: Vec<CreateOrderRequest>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Set the status reported for `token`.
    pub fn set_status(&self, token: &str, status: GatewayStatus) {
        self.state().statuses.insert(token.to_string(), status);
    }

    /// Set the order returned by the next `create_order` call.
    pub fn set_next_order(&self, order: GatewayOrder) {
        self.state().next_order = Some(order);
    }

    /// Fail the next call to any method.
    pub fn set_error(&self, error: GatewayError) {
        self.state().next_error = Some(error);
    }

    /// Fail every call to `method` until cleared.
    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    /// Delay every `get_status` answer by `delay`.
    pub fn set_status_delay(&self, delay: Duration) {
        self.state().status_delay = Some(delay);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Requests received by `create_order`, in order.
    pub fn create_requests(&self) -> Vec<CreateOrderRequest> {
        self.state().create_requests.clone()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), GatewayError> {
        let mut state = self.state();

        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError> {
        self.record_call(
            "create_order",
            vec![
                request.merchant_order_code.to_string(),
                request.amount.to_string(),
            ],
        );
        self.check_error("create_order")?;

        let mut state = self.state();
        state.create_requests.push(request);
        state.issued += 1;

        let order = match state.next_order.take() {
            Some(order) => order,
            None => {
                let token = GatewayToken::new(format!("tok_mock_{}", state.issued))
                    .map_err(|e| GatewayError::malformed(e.to_string()))?;
                GatewayOrder {
                    redirect_url: format!("https://gateway.test/pay?token={}", token),
                    token,
                }
            }
        };

        state
            .statuses
            .entry(order.token.as_str().to_string())
            .or_insert(GatewayStatus::AwaitingPayment);

        Ok(order)
    }

    async fn get_status(&self, token: &GatewayToken) -> Result<GatewayStatusReport, GatewayError> {
        self.record_call("get_status", vec![token.to_string()]);
        self.check_error("get_status")?;

        let delay = self.state().status_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let status = self
            .state()
            .statuses
            .get(token.as_str())
            .copied()
            .ok_or_else(|| {
                GatewayError::rejected(format!("Unknown token {}", token)).with_http_status(400)
            })?;

        Ok(GatewayStatusReport {
            status,
            raw: json!({ "token": token.as_str(), "status": status.code() }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Amount, MerchantOrderCode, RegistrationId};
    use crate::ports::GatewayErrorCode;

    fn request() -> CreateOrderRequest {
        let registration = RegistrationId::new(42).unwrap();
        CreateOrderRequest {
            merchant_order_code: MerchantOrderCode::generate(registration),
            amount: Amount::try_new(15000).unwrap(),
            payer_email: "ana@example.com".to_string(),
            description: "Entrada General".to_string(),
            confirmation_url: "https://api.test/api/payments/confirmation".to_string(),
            return_url: "https://api.test/api/payments/return".to_string(),
        }
    }

    #[tokio::test]
    async fn created_orders_start_awaiting_payment() {
        let gateway = MockPaymentGateway::new();

        let order = gateway.create_order(request()).await.unwrap();
        let report = gateway.get_status(&order.token).await.unwrap();

        assert!(order.redirect_url.ends_with(order.token.as_str()));
        assert_eq!(report.status, GatewayStatus::AwaitingPayment);
        assert_eq!(report.raw["status"], 1);
    }

    #[tokio::test]
    async fn configured_status_is_reported() {
        let gateway = MockPaymentGateway::new();
        let order = gateway.create_order(request()).await.unwrap();

        gateway.set_status(order.token.as_str(), GatewayStatus::Paid);

        let report = gateway.get_status(&order.token).await.unwrap();
        assert_eq!(report.status, GatewayStatus::Paid);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let gateway = MockPaymentGateway::new();

        let err = gateway
            .get_status(&GatewayToken::new("nope").unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::RequestRejected);
        assert_eq!(err.http_status, Some(400));
    }

    #[tokio::test]
    async fn next_error_is_consumed_but_method_error_sticks() {
        let gateway = MockPaymentGateway::new();
        gateway.set_error(GatewayError::unavailable("blip"));

        assert!(gateway.create_order(request()).await.is_err());
        assert!(gateway.create_order(request()).await.is_ok());

        gateway.set_method_error("create_order", GatewayError::unavailable("down"));
        assert!(gateway.create_order(request()).await.is_err());
        assert!(gateway.create_order(request()).await.is_err());

        gateway.clear_errors();
        assert!(gateway.create_order(request()).await.is_ok());
    }

    #[tokio::test]
    async fn calls_are_tracked() {
        let gateway = MockPaymentGateway::new();
        let order = gateway.create_order(request()).await.unwrap();
        gateway.get_status(&order.token).await.unwrap();
        gateway.get_status(&order.token).await.unwrap();

        assert_eq!(gateway.call_count("create_order"), 1);
        assert_eq!(gateway.call_count("get_status"), 2);
        assert_eq!(gateway.calls()[1].args, vec![order.token.to_string()]);
        assert_eq!(gateway.create_requests()[0].amount.value(), 15000);
    }
}
