//! Amount value object in whole currency units.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// A strictly positive amount in whole currency units.
///
/// Amounts never pass through floating point: they are created, signed,
/// stored and compared as integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl Amount {
    /// Creates an Amount, returning error unless strictly positive.
    pub fn try_new(value: i64) -> Result<Self, ValidationError> {
        if value <= 0 {
            return Err(ValidationError::invalid_format(
                "amount",
                format!("must be a positive whole amount, got {}", value),
            ));
        }
        Ok(Self(value))
    }

    /// Returns the value as i64.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_accepts_positive_values() {
        assert_eq!(Amount::try_new(1).unwrap().value(), 1);
        assert_eq!(Amount::try_new(15000).unwrap().value(), 15000);
    }

    #[test]
    fn amount_rejects_zero_and_negative() {
        assert!(Amount::try_new(0).is_err());
        assert!(Amount::try_new(-100).is_err());
    }

    #[test]
    fn amount_displays_without_decimals() {
        assert_eq!(Amount::try_new(15000).unwrap().to_string(), "15000");
    }

    #[test]
    fn amount_deserialization_validates() {
        let ok: Amount = serde_json::from_str("2500").unwrap();
        assert_eq!(ok.value(), 2500);
        assert!(serde_json::from_str::<Amount>("0").is_err());
        assert!(serde_json::from_str::<Amount>("12.5").is_err());
    }
}
