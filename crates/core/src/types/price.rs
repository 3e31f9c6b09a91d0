//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CurrencyCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// The input is not exactly three characters long.
    #[error("currency code must be 3 letters (got {0:?})")]
    InvalidLength(String),
    /// The input contains characters other than ASCII letters.
    #[error("currency code must contain only ASCII letters (got {0:?})")]
    InvalidCharacters(String),
}

/// An ISO 4217 currency code, normalized to upper case (e.g. `EUR`).
///
/// Shopify reports currencies as free-form strings and stored budgets may be
/// typed by hand, so comparisons always go through this normalized form.
///
/// ```
/// use vitaguide_core::CurrencyCode;
///
/// let eur = CurrencyCode::parse("eur").unwrap();
/// assert_eq!(eur.as_str(), "EUR");
/// assert!(CurrencyCode::parse("euro").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse a currency code, normalizing it to upper case.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not three ASCII letters.
    pub fn parse(s: &str) -> Result<Self, CurrencyError> {
        let trimmed = s.trim();
        if trimmed.chars().count() != 3 {
            return Err(CurrencyError::InvalidLength(s.to_string()));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CurrencyError::InvalidCharacters(s.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Get the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self("EUR".to_string())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// A price with currency information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., euros, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Whether this price is expressed in the given currency.
    #[must_use]
    pub fn is_in(&self, currency: &CurrencyCode) -> bool {
        &self.currency_code == currency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_parse_normalizes_case() {
        let code = CurrencyCode::parse(" usd ").expect("valid code");
        assert_eq!(code.as_str(), "USD");
    }

    #[test]
    fn test_currency_parse_rejects_bad_input() {
        assert!(matches!(
            CurrencyCode::parse("EURO"),
            Err(CurrencyError::InvalidLength(_))
        ));
        assert!(matches!(
            CurrencyCode::parse("E1R"),
            Err(CurrencyError::InvalidCharacters(_))
        ));
    }

    #[test]
    fn test_currency_deserialize_validates() {
        let ok: Result<CurrencyCode, _> = serde_json::from_str("\"mad\"");
        assert_eq!(ok.expect("valid").as_str(), "MAD");

        let bad: Result<CurrencyCode, _> = serde_json::from_str("\"dirham\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_price_is_in() {
        let eur = CurrencyCode::parse("EUR").expect("valid");
        let usd = CurrencyCode::parse("USD").expect("valid");
        let price = Price::new(Decimal::new(1999, 2), eur.clone());
        assert!(price.is_in(&eur));
        assert!(!price.is_in(&usd));
    }
}
