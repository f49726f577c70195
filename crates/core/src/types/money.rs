//! Money amounts using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(10,2)` and carried as [`Decimal`] so that
//! subtotals never pick up binary floating point drift.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes the shop can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    MXN,
    USD,
}

impl CurrencyCode {
    /// Symbol shown before amounts.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::MXN | Self::USD => "$",
        }
    }

    /// The three-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MXN => "MXN",
            Self::USD => "USD",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MXN" => Ok(Self::MXN),
            "USD" => Ok(Self::USD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

/// An amount in a given currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (pesos, not centavos).
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl Money {
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Amount rounded half-up to two decimal places.
    #[must_use]
    pub fn rounded(&self) -> Decimal {
        self.amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl fmt::Display for Money {
    /// Formats as `$1,234.50 MXN`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.rounded();
        let sign = if rounded.is_sign_negative() { "-" } else { "" };
        let text = format!("{:.2}", rounded.abs());
        let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        write!(
            f,
            "{sign}{}{grouped}.{cents} {}",
            self.currency.symbol(),
            self.currency.code()
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_groups_thousands() {
        let money = Money::new(Decimal::new(123_450, 2), CurrencyCode::MXN);
        assert_eq!(money.to_string(), "$1,234.50 MXN");
    }

    #[test]
    fn display_small_amounts() {
        let money = Money::new(Decimal::new(99, 0), CurrencyCode::MXN);
        assert_eq!(money.to_string(), "$99.00 MXN");

        let zero = Money::new(Decimal::ZERO, CurrencyCode::USD);
        assert_eq!(zero.to_string(), "$0.00 USD");
    }

    #[test]
    fn display_rounds_half_up() {
        let money = Money::new(Decimal::new(10_005, 3), CurrencyCode::MXN);
        assert_eq!(money.to_string(), "$10.01 MXN");
    }

    #[test]
    fn currency_parses_case_insensitively() {
        assert_eq!("mxn".parse::<CurrencyCode>().unwrap(), CurrencyCode::MXN);
        assert!("EUR".parse::<CurrencyCode>().is_err());
    }
}
