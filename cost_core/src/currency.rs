//! Currency codes accepted on costing sheets and line items.
//!
//! The engine never converts between currencies. A line records the currency
//! it was entered in; totals are plain sums of the numbers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CostError;

/// ISO 4217 currency code for a sheet or line.
///
/// # Example
/// ```
/// use cost_core::currency::Currency;
///
/// let inr: Currency = "inr".parse().unwrap();
/// assert_eq!(inr.code(), "INR");
/// assert_eq!(inr.symbol(), "₹");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US dollar
    #[default]
    Usd,
    /// Euro
    Eur,
    /// Pound sterling
    Gbp,
    /// Indian rupee
    Inr,
    /// Chinese yuan renminbi
    Cny,
}

impl Currency {
    /// All supported currencies in display order
    pub const ALL: [Currency; 5] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Inr,
        Currency::Cny,
    ];

    /// Three-letter ISO code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Inr => "INR",
            Currency::Cny => "CNY",
        }
    }

    /// Symbol used when printing amounts
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
            Currency::Inr => "₹",
            Currency::Cny => "¥",
        }
    }

    /// Format an amount with this currency's symbol, two decimals
    pub fn format_amount(&self, amount: f64) -> String {
        format!("{}{:.2}", self.symbol(), amount)
    }
}

impl FromStr for Currency {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Currency::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                CostError::invalid_input("currency", s, "Expected one of USD, EUR, GBP, INR, CNY")
            })
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
