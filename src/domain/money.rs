use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A strictly positive monetary amount.
///
/// Wraps `rust_decimal::Decimal` so that a payment instruction can never carry
/// a zero or negative value past the mapping layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, &'static str> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err("amount must be positive")
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = &'static str;

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
        write!(f, "{:.2}", self.0)
    }
}

/// Three-letter ISO 4217 currency code, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, String> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(format!("{code:?} is not a three-letter currency code"))
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = String;

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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(0.01)).is_ok());
        assert!(Amount::new(dec!(0.0)).is_err());
        assert!(Amount::new(dec!(-1.0)).is_err());
    }

    #[test]
    fn test_amount_displays_two_decimals() {
        assert_eq!(Amount::new(dec!(10)).unwrap().to_string(), "10.00");
        assert_eq!(Amount::new(dec!(1000.5)).unwrap().to_string(), "1000.50");
    }

    #[test]
    fn test_currency_normalizes_case() {
        assert_eq!(Currency::new("eur").unwrap().code(), "EUR");
        assert!(Currency::new("EURO").is_err());
        assert!(Currency::new("E1R").is_err());
    }

    #[test]
    fn test_amount_rejects_non_positive_json() {
        assert!(serde_json::from_str::<Amount>("\"-5\"").is_err());
        let amount: Amount = serde_json::from_str("\"5.25\"").unwrap();
        assert_eq!(amount.value(), dec!(5.25));
    }
}
