//! Resend confirmation notifier.
//!
//! Sends the payment confirmation email through Resend's HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::EmailConfig;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{ConfirmationNotifier, PaymentDetailsView};

const RESEND_API_URL: &str = "https://api.resend.com";

/// Confirmation notifier backed by Resend.
pub struct ResendConfirmationNotifier {
    api_key: SecretString,
    from: String,
    api_base_url: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    html: String,
}

impl ResendConfirmationNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self, DomainError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                DomainError::new(ErrorCode::InternalError, format!("HTTP client: {}", e))
            })?;

        Ok(Self {
            api_key: SecretString::new(config.resend_api_key.clone()),
            from: config.from_header(),
            api_base_url: RESEND_API_URL.to_string(),
            http_client,
        })
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

fn subject(details: &PaymentDetailsView) -> String {
    format!("Pago confirmado: {}", details.registrant.ticket_type_name)
}

fn body(details: &PaymentDetailsView) -> String {
    format!(
        "<p>Hola {name},</p>\
         <p>Recibimos tu pago de ${amount} por la entrada <strong>{ticket}</strong>.</p>\
         <p>Orden: {code}<br>Estado: {estado}</p>",
        name = escape_html(&details.registrant.registrant_name),
        amount = details.amount,
        ticket = escape_html(&details.registrant.ticket_type_name),
        code = details.merchant_order_code,
        estado = details.estado,
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
impl ConfirmationNotifier for ResendConfirmationNotifier {
    async fn payment_confirmed(&self, details: &PaymentDetailsView) -> Result<(), DomainError> {
        let request = SendEmailRequest {
            from: &self.from,
            to: [details.registrant.registrant_email.as_str()],
            subject: subject(details),
            html: body(details),
        };

        let response = self
            .http_client
            .post(format!("{}/emails", self.api_base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::InternalError, format!("Resend unreachable: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("Resend API error ({}): {}", status, error_text),
            ));
        }

        tracing::info!(
            order_id = %details.order_id,
            "Payment confirmation email sent"
        );
        Ok(())
    }
}
