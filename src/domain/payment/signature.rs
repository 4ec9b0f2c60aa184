//! Canonical HMAC-SHA256 signing of gateway parameter sets.
//!
//! The gateway recomputes every signature on its side, so both outbound
//! requests and inbound callbacks must use exactly this canonical form:
//!
//! 1. Sort parameter names byte-wise ascending
//! 2. Concatenate `name + value` for each parameter, no separators
//! 3. HMAC-SHA256 the result with the shared secret
//! 4. Render as lowercase hex

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Errors raised while signing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Gateway signing secret is not configured")]
    MissingSecret,

    #[error("Gateway signing secret was rejected: {0}")]
    InvalidKey(String),
}

/// Signs and verifies gateway parameter sets with a shared secret.
#[derive(Clone)]
pub struct SignatureEngine {
    secret: SecretString,
}

impl SignatureEngine {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Sign a flat parameter mapping.
    ///
    /// The result does not depend on the iteration order of `params`.
    ///
    /// # Errors
    ///
    /// Returns `SignatureError::MissingSecret` if the secret is blank.
    pub fn sign<'a, I>(&self, params: I) -> Result<String, SignatureError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let canonical = canonicalize(params);
        let digest = self.mac(canonical.as_bytes())?;
        Ok(hex::encode(digest))
    }

    /// Check `signature` against the canonical signature of `params`.
    ///
    /// Comparison is constant-time. Malformed hex never matches.
    pub fn verify<'a, I>(&self, params: I, signature: &str) -> Result<bool, SignatureError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let canonical = canonicalize(params);
        let expected = self.mac(canonical.as_bytes())?;
        let provided = match hex::decode(signature.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(false),
        };
        Ok(expected.as_slice().ct_eq(provided.as_slice()).unwrap_u8() == 1)
    }

    fn mac(&self, payload: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let secret = self.secret.expose_secret();
        if secret.trim().is_empty() {
            return Err(SignatureError::MissingSecret);
        }
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureEngine").finish_non_exhaustive()
    }
}

fn canonicalize<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let sorted: BTreeMap<&str, &str> = params.into_iter().collect();
    sorted.iter().fold(String::new(), |mut acc, (key, value)| {
        acc.push_str(key);
        acc.push_str(value);
        acc
    })
}
