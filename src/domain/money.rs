use crate::error::PaymentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of fractional digits a provider accepts for an amount.
pub const MAX_SCALE: u32 = 2;

/// Represents a positive monetary amount to be charged.
///
/// This is a wrapper around `rust_decimal::Decimal` that rejects zero,
/// negative values and sub-cent precision at construction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value <= Decimal::ZERO {
            return Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }
        if value.normalize().scale() > MAX_SCALE {
            return Err(PaymentError::ValidationError(format!(
                "Amount {} has more than {} decimal places",
                value, MAX_SCALE
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Fixed two-decimal rendering used on the wire, e.g. `25.00`.
    pub fn to_provider_string(&self) -> String {
        let mut value = self.0.round_dp(MAX_SCALE);
        value.rescale(MAX_SCALE);
        value.to_string()
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_provider_string())
    }
}

/// ISO-4217 style three letter currency code, stored upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, PaymentError> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(PaymentError::ValidationError(format!(
                "Invalid currency code: {:?}",
                code
            )))
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the caller wants charged. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    amount: Amount,
    currency: Currency,
}

impl PaymentRequest {
    pub fn new(amount: Decimal, currency: &str) -> Result<Self, PaymentError> {
        Ok(Self {
            amount: Amount::new(amount)?,
            currency: Currency::new(currency)?,
        })
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(Amount::new(dec!(10.50)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(PaymentError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(PaymentError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(10.001)),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_trailing_zeros_do_not_count_as_precision() {
        assert!(Amount::new(dec!(25.0000)).is_ok());
    }

    #[test]
    fn test_provider_string_has_two_decimals() {
        assert_eq!(Amount::new(dec!(25)).unwrap().to_provider_string(), "25.00");
        assert_eq!(Amount::new(dec!(10.5)).unwrap().to_provider_string(), "10.50");
        assert_eq!(Amount::new(dec!(0.01)).unwrap().to_provider_string(), "0.01");
    }

    #[test]
    fn test_currency_normalizes_case() {
        assert_eq!(Currency::new("usd").unwrap().code(), "USD");
        assert_eq!(Currency::new(" eur ").unwrap().code(), "EUR");
        assert!(Currency::new("US").is_err());
        assert!(Currency::new("U5D").is_err());
    }

    #[test]
    fn test_request_deserialization_validates() {
        let ok: PaymentRequest =
            serde_json::from_str(r#"{"amount":"25.00","currency":"usd"}"#).unwrap();
        assert_eq!(ok.currency().code(), "USD");
        assert_eq!(ok.amount().value(), dec!(25.00));

        let bad = serde_json::from_str::<PaymentRequest>(r#"{"amount":"-1","currency":"USD"}"#);
        assert!(bad.is_err());
    }
}
