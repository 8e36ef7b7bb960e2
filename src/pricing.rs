//! Price representation and the price-resolution policy.
//!
//! All money is carried as integer cents so that budget comparisons and
//! tie-breaking stay exact. Catalog prices arrive as scraped strings
//! (`"$1,299.99"`, `"1,299 USD"`); anything that doesn't parse as a
//! positive amount is treated as absent and falls back to a per-category
//! estimate.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

/// A price in integer cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_cents(cents: u64) -> Self {
        Price(cents)
    }

    /// Convert whole dollars to a price. Rejects negative, NaN and
    /// infinite values.
    pub fn from_dollars(dollars: f64) -> Option<Self> {
        if !dollars.is_finite() || dollars < 0.0 {
            return None;
        }
        Some(Price((dollars * 100.0).round() as u64))
    }

    pub fn cents(&self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Price) -> Option<Price> {
        self.0.checked_add(other.0).map(Price)
    }

    pub fn saturating_sub(self, other: Price) -> Price {
        Price(self.0.saturating_sub(other.0))
    }

    /// Parse a scraped price string. Currency symbols, thousands
    /// separators and a trailing "USD" are tolerated. Returns `None`
    /// for malformed or non-positive values.
    pub fn parse(raw: &str) -> Option<Price> {
        match parse_cents(raw)? {
            0 => None,
            total => Some(Price(total)),
        }
    }

    /// Plain decimal form for CSV fields, e.g. `1299.99`.
    pub fn to_decimal_string(&self) -> String {
        format!("{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dollars = self.0 / 100;
        let cents = self.0 % 100;

        // group thousands
        let digits = dollars.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        write!(f, "${grouped}.{cents:02}")
    }
}

/// Where a candidate's price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    /// Parsed from the catalog record.
    Catalog,
    /// Category fallback estimate (catalog miss or unparseable price).
    Estimated,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Catalog => "catalog",
            PriceSource::Estimated => "estimated",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("no fallback price configured for category '{0}'")]
    MissingFallback(String),

    #[error("invalid budget '{0}'")]
    InvalidBudget(String),
}

/// Shared amount parser: cleans currency decoration and returns cents.
/// Zero is a legal amount here; `Price::parse` layers the positivity
/// requirement on top for catalog prices.
fn parse_cents(raw: &str) -> Option<u64> {
    let cleaned = raw
        .replace('$', "")
        .replace(',', "")
        .replace("USD", "")
        .trim()
        .to_string();

    if cleaned.is_empty() {
        return None;
    }

    let (dollars_part, cents_part) = match cleaned.split_once('.') {
        Some((d, c)) => (d, c),
        None => (cleaned.as_str(), ""),
    };

    let dollars: u64 = dollars_part.parse().ok()?;
    let cents: u64 = match cents_part.len() {
        0 => 0,
        1 => cents_part.parse::<u64>().ok()? * 10,
        2 => cents_part.parse::<u64>().ok()?,
        _ => return None,
    };

    dollars.checked_mul(100)?.checked_add(cents)
}

/// Parse a budget string. Unlike catalog prices, a zero budget is valid
/// input in any spelling ("0", "$0.00", "0.0"); negative or malformed
/// budgets are rejected before any enumeration happens.
pub fn parse_budget(raw: &str) -> Result<Price, PricingError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('-') {
        return Err(PricingError::InvalidBudget(raw.to_string()));
    }
    parse_cents(trimmed)
        .map(Price)
        .ok_or_else(|| PricingError::InvalidBudget(raw.to_string()))
}

/// Default per-category fallback estimates in whole dollars.
///
/// These are business policy, not an algorithmic requirement; override
/// them in `config.yaml`.
pub fn default_fallback_prices() -> BTreeMap<String, f64> {
    [
        ("sofa", 1650.0),
        ("chair", 500.0),
        ("table", 750.0),
        ("lamp", 250.0),
        ("rug", 500.0),
        ("bench", 650.0),
        ("nightstand", 375.0),
        ("lighting", 250.0),
    ]
    .into_iter()
    .map(|(category, dollars)| (category.to_string(), dollars))
    .collect()
}

/// Resolves a candidate's price against the catalog, falling back to
/// the category estimate on a miss.
pub struct PriceResolver<'a> {
    catalog: &'a Catalog,
    fallback: &'a BTreeMap<String, Price>,
}

impl<'a> PriceResolver<'a> {
    pub fn new(catalog: &'a Catalog, fallback: &'a BTreeMap<String, Price>) -> Self {
        Self { catalog, fallback }
    }

    /// Look up the item's catalog price; on any miss (item absent,
    /// price missing, malformed or non-positive) return the category
    /// fallback estimate marked `Estimated`.
    ///
    /// A category with no fallback entry is a configuration error and
    /// fails fast rather than producing a silent zero.
    pub fn resolve(
        &self,
        item_id: &str,
        category: &str,
    ) -> Result<(Price, PriceSource), PricingError> {
        if let Some(item) = self.catalog.get(item_id, category) {
            if let Some(price) = item.price.as_deref().and_then(Price::parse) {
                return Ok((price, PriceSource::Catalog));
            }
        }

        let key = category.to_lowercase();
        match self.fallback.get(&key) {
            Some(price) => Ok((*price, PriceSource::Estimated)),
            None => Err(PricingError::MissingFallback(key)),
        }
    }
}
