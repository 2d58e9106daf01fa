//! Unit and currency conversion
//!
//! Providers quote metals in USD per troy ounce; everything downstream works
//! in USD per gram. Currency conversion uses a static rate table plus an
//! optional regional premium and never fails: unknown currency codes are
//! treated as USD.

use crate::constants::{
    DEFAULT_EXCHANGE_RATES, GRAMS_PER_TROY_OUNCE, INR_PREMIUM_FACTOR, PREMIUM_CURRENCIES,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Converts a USD per troy ounce price to USD per gram
pub fn oz_to_gram(price_per_oz: f64) -> f64 {
    oz_to_gram_with(price_per_oz, GRAMS_PER_TROY_OUNCE)
}

/// Same as [`oz_to_gram`] with an explicit grams-per-ounce factor
pub fn oz_to_gram_with(price_per_oz: f64, grams_per_oz: f64) -> f64 {
    price_per_oz / grams_per_oz
}

/// Converts a USD per gram value using the default rate table
pub fn convert_currency(usd_per_gram: f64, currency_code: &str, premium: &PremiumPolicy) -> f64 {
    let rate = ExchangeRateTable::default().rate(currency_code);
    premium.apply(usd_per_gram * rate, currency_code)
}

/// Static mapping from currency code to USD multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct ExchangeRateTable(BTreeMap<String, f64>);

impl From<BTreeMap<String, f64>> for ExchangeRateTable {
    fn from(rates: BTreeMap<String, f64>) -> Self {
        Self::new(rates)
    }
}

impl From<ExchangeRateTable> for BTreeMap<String, f64> {
    fn from(table: ExchangeRateTable) -> Self {
        table.0
    }
}

impl ExchangeRateTable {
    /// Builds a table, normalizing codes to upper case
    pub fn new<I, S>(rates: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        Self(
            rates
                .into_iter()
                .map(|(code, rate)| (code.as_ref().to_ascii_uppercase(), rate))
                .collect(),
        )
    }

    /// Multiplier for a currency, 1.0 if the code is unknown
    pub fn rate(&self, currency_code: &str) -> f64 {
        self.get(currency_code).unwrap_or(1.0)
    }

    /// Multiplier for a currency if the table knows it
    pub fn get(&self, currency_code: &str) -> Option<f64> {
        self.0.get(&currency_code.to_ascii_uppercase()).copied()
    }

    /// Iterates over `(code, rate)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(code, rate)| (code.as_str(), *rate))
    }
}

impl Default for ExchangeRateTable {
    fn default() -> Self {
        Self::new(DEFAULT_EXCHANGE_RATES.iter().copied())
    }
}

/// Regional premium applied on top of the converted spot price
///
/// Spot prices exclude local duties and taxes. Where these are large enough to
/// matter for Nisab (India), the converted price is scaled by `factor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PremiumPolicy {
    pub enabled: bool,
    pub factor: f64,
    pub currencies: Vec<String>,
}

impl PremiumPolicy {
    /// A policy that never applies
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// True if the premium applies to this currency
    pub fn applies_to(&self, currency_code: &str) -> bool {
        self.enabled
            && self
                .currencies
                .iter()
                .any(|c| c.eq_ignore_ascii_case(currency_code))
    }

    /// Scales an already converted value when the premium applies
    pub fn apply(&self, converted: f64, currency_code: &str) -> f64 {
        if self.applies_to(currency_code) {
            converted * self.factor
        } else {
            converted
        }
    }
}

impl Default for PremiumPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            factor: INR_PREMIUM_FACTOR,
            currencies: PREMIUM_CURRENCIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Configured currency conversion, safe to call on every render
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrencyConverter {
    rates: ExchangeRateTable,
    premium: PremiumPolicy,
}

impl CurrencyConverter {
    pub fn new(rates: ExchangeRateTable, premium: PremiumPolicy) -> Self {
        Self { rates, premium }
    }

    /// Converts USD per gram into `currency_code` per gram
    pub fn convert(&self, usd_per_gram: f64, currency_code: &str) -> f64 {
        let converted = usd_per_gram * self.rates.rate(currency_code);
        self.premium.apply(converted, currency_code)
    }

    pub fn rates(&self) -> &ExchangeRateTable {
        &self.rates
    }

    pub fn premium(&self) -> &PremiumPolicy {
        &self.premium
    }
}
