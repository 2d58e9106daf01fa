//! Nisab threshold and Zakat computation
//!
//! Nisab is the wealth threshold expressed as a mass of gold (87.48 g) or
//! silver (612.36 g). When both metal prices are known the lower of the two
//! values is used. Zakat is 2.5% of net zakatable wealth once it reaches
//! Nisab.

use crate::{
    types::{Metal, PriceSnapshot},
    units::CurrencyConverter,
};
use serde::{Deserialize, Serialize};

/// Gold Nisab in grams
pub const NISAB_GOLD_GRAMS: f64 = 87.48;

/// Silver Nisab in grams
pub const NISAB_SILVER_GRAMS: f64 = 612.36;

/// Share of net wealth due as Zakat
pub const ZAKAT_RATE: f64 = 0.025;

/// Grams in one tola
pub const GRAMS_PER_TOLA: f64 = 11.664;

/// Unit for physical metal holdings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Gram,
    Tola,
}

impl WeightUnit {
    pub fn grams(&self) -> f64 {
        match self {
            WeightUnit::Gram => 1.0,
            WeightUnit::Tola => GRAMS_PER_TOLA,
        }
    }
}

/// Value of a metal holding; missing prices count as zero
pub fn holding_value(weight: f64, unit: WeightUnit, price_per_gram: Option<f64>) -> f64 {
    sanitize(weight) * unit.grams() * price_per_gram.unwrap_or(0.0)
}

/// Per-gram metal prices in a display currency
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LocalMetalPrices {
    pub gold_per_gram: Option<f64>,
    pub silver_per_gram: Option<f64>,
}

impl LocalMetalPrices {
    /// Converts a snapshot's USD prices; unresolved metals stay `None`
    pub fn from_snapshot(
        snapshot: &PriceSnapshot,
        converter: &CurrencyConverter,
        currency_code: &str,
    ) -> Self {
        let local = |metal| {
            snapshot
                .per_gram(metal)
                .map(|usd| converter.convert(usd, currency_code))
        };
        Self {
            gold_per_gram: local(Metal::Gold),
            silver_per_gram: local(Metal::Silver),
        }
    }
}

/// Nisab values by metal, in the display currency
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct NisabThreshold {
    pub gold: Option<f64>,
    pub silver: Option<f64>,
}

impl NisabThreshold {
    pub fn from_prices(prices: &LocalMetalPrices) -> Self {
        Self {
            gold: prices.gold_per_gram.map(|p| p * NISAB_GOLD_GRAMS),
            silver: prices.silver_per_gram.map(|p| p * NISAB_SILVER_GRAMS),
        }
    }

    /// The applicable threshold: the lower value when both are known
    pub fn threshold(&self) -> Option<f64> {
        match (self.gold, self.silver) {
            (Some(gold), Some(silver)) => Some(gold.min(silver)),
            (gold, silver) => silver.or(gold),
        }
    }
}

/// Zakatable assets by category, in the display currency
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZakatableAssets {
    /// Gold and silver jewellery and coins
    pub gold_silver: f64,
    /// Bank accounts and cash at home
    pub cash: f64,
    /// Stocks, funds and crypto
    pub investments: f64,
    /// Inventory and trade goods
    pub business: f64,
}

impl ZakatableAssets {
    pub fn total(&self) -> f64 {
        [self.gold_silver, self.cash, self.investments, self.business]
            .into_iter()
            .map(sanitize)
            .sum()
    }
}

/// User-entered figures
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZakatInputs {
    pub assets: ZakatableAssets,
    pub debts: f64,
}

/// Outcome of a Zakat assessment
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZakatAssessment {
    pub total_assets: f64,
    pub total_debts: f64,
    /// Assets minus debts, never negative
    pub net_wealth: f64,
    /// Applicable Nisab, `None` while no metal price is known
    pub nisab: Option<f64>,
    pub obligatory: bool,
    pub zakat_due: f64,
}

/// Assesses Zakat for `inputs` against `nisab`
///
/// Without a known Nisab nothing is considered due.
pub fn assess(inputs: &ZakatInputs, nisab: &NisabThreshold) -> ZakatAssessment {
    let total_assets = inputs.assets.total();
    let total_debts = sanitize(inputs.debts);
    let net_wealth = (total_assets - total_debts).max(0.0);
    let nisab = nisab.threshold();
    let obligatory = nisab.is_some_and(|threshold| net_wealth >= threshold);

    ZakatAssessment {
        total_assets,
        total_debts,
        net_wealth,
        nisab,
        obligatory,
        zakat_due: if obligatory {
            net_wealth * ZAKAT_RATE
        } else {
            0.0
        },
    }
}

/// Negative and non-finite entries count as zero
fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// A supported display currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Currency {
    pub code: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
}

pub const CURRENCIES: &[Currency] = &[
    Currency {
        code: "USD",
        symbol: "$",
        name: "US Dollar",
    },
    Currency {
        code: "INR",
        symbol: "₹",
        name: "Indian Rupee",
    },
    Currency {
        code: "SAR",
        symbol: "ر.س",
        name: "Saudi Riyal",
    },
    Currency {
        code: "GBP",
        symbol: "£",
        name: "British Pound",
    },
    Currency {
        code: "EUR",
        symbol: "€",
        name: "Euro",
    },
];

impl Currency {
    pub fn find(code: &str) -> Option<&'static Currency> {
        CURRENCIES.iter().find(|c| c.code.eq_ignore_ascii_case(code))
    }
}

/// Formats an amount as `{symbol}1,234.56`; zero and non-finite values are
/// shown as `{symbol}0`
pub fn format_amount(value: f64, symbol: &str) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{}0", symbol);
    }

    let formatted = format!("{:.2}", value.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}{}.{}", sign, symbol, grouped, fraction)
}
