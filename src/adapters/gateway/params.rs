//! Signed parameter sets for gateway requests.
//!
//! Each request type is a closed struct, so a misspelled or forgotten field
//! is a compile error rather than a signature mismatch at the gateway. The
//! signature is computed over exactly the fields that are sent.

use crate::domain::payment::{SignatureEngine, SignatureError};

/// Name of the signature field appended to every request.
pub const SIGNATURE_FIELD: &str = "s";

/// A parameter set that can be signed and sent to the gateway.
pub trait GatewayParams {
    /// Unsigned fields as `(name, value)` pairs.
    fn fields(&self) -> Vec<(&'static str, &str)>;

    /// Fields plus the signature, ready for form or query encoding.
    fn signed(&self, signer: &SignatureEngine) -> Result<Vec<(&'static str, String)>, SignatureError> {
        let fields = self.fields();
        let signature = signer.sign(fields.iter().map(|(k, v)| (*k, *v)))?;

        let mut signed: Vec<(&'static str, String)> = fields
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        signed.push((SIGNATURE_FIELD, signature));
        Ok(signed)
    }
}

/// Parameters of `POST /payment/create`.
#[derive(Debug, Clone)]
pub struct CreateOrderParams {
    pub api_key: String,
    pub commerce_order: String,
    pub subject: String,
    pub currency: String,
    pub amount: String,
    pub email: String,
    pub url_confirmation: String,
    pub url_return: String,
}

impl GatewayParams for CreateOrderParams {
    fn fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("apiKey", self.api_key.as_str()),
            ("commerceOrder", self.commerce_order.as_str()),
            ("subject", self.subject.as_str()),
            ("currency", self.currency.as_str()),
            ("amount", self.amount.as_str()),
            ("email", self.email.as_str()),
            ("urlConfirmation", self.url_confirmation.as_str()),
            ("urlReturn", self.url_return.as_str()),
        ]
    }
}

/// Parameters of `GET /payment/getStatus`.
#[derive(Debug, Clone)]
pub struct StatusQueryParams {
    pub api_key: String,
    pub token: String,
}

impl GatewayParams for StatusQueryParams {
    fn fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("apiKey", self.api_key.as_str()),
            ("token", self.token.as_str()),
        ]
    }
}
