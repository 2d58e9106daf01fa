//! Types for the metal price tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Precious metals tracked by the SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metal {
    /// Gold
    Gold,
    /// Silver
    Silver,
}

impl Metal {
    /// ISO 4217 metal code, as used by spot price APIs
    pub fn code(&self) -> &'static str {
        match self {
            Metal::Gold => "XAU",
            Metal::Silver => "XAG",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Metal::Gold => "Gold",
            Metal::Silver => "Silver",
        }
    }
}

/// How a quote's silver price was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SilverBasis {
    /// Reported by a provider
    Spot,
    /// Derived from gold through the configured gold/silver ratio
    GoldRatio,
}

/// Prices returned by a single provider, already normalized to USD per gram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Gold in USD per gram
    pub gold_per_gram: f64,

    /// Silver in USD per gram
    pub silver_per_gram: f64,

    /// When the provider observed these prices
    pub observed_at: DateTime<Utc>,

    /// Human-readable provider label
    pub source: String,

    /// Whether silver was quoted or derived
    pub silver_basis: SilverBasis,
}

impl PriceQuote {
    /// Create a quote where both metals were reported by the provider
    pub fn spot(
        gold_per_gram: f64,
        silver_per_gram: f64,
        observed_at: DateTime<Utc>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            gold_per_gram,
            silver_per_gram,
            observed_at,
            source: source.into(),
            silver_basis: SilverBasis::Spot,
        }
    }
}

/// The published price state
///
/// Exactly one snapshot is live at a time. Consumers read it through
/// [`PriceStore`](crate::store::PriceStore) or
/// [`MetalPriceTracker`](crate::tracker::MetalPriceTracker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Gold in USD per gram, 0 while unresolved
    pub gold_per_gram: f64,

    /// Silver in USD per gram, 0 while unresolved
    pub silver_per_gram: f64,

    /// When the data was observed
    pub last_updated: Option<DateTime<Utc>>,

    /// True until the first snapshot has been published
    pub is_loading: bool,

    /// Advisory set when live providers failed and a fallback was used
    pub error: Option<String>,

    /// Which provider produced the snapshot
    pub source: String,
}

impl PriceSnapshot {
    /// The state before the first refresh pass completes
    pub fn loading() -> Self {
        Self {
            gold_per_gram: 0.0,
            silver_per_gram: 0.0,
            last_updated: None,
            is_loading: true,
            error: None,
            source: String::new(),
        }
    }

    /// A successful snapshot built from a provider quote
    pub fn from_quote(quote: PriceQuote) -> Self {
        Self {
            gold_per_gram: quote.gold_per_gram,
            silver_per_gram: quote.silver_per_gram,
            last_updated: Some(quote.observed_at),
            is_loading: false,
            error: None,
            source: quote.source,
        }
    }

    /// Per-gram USD price of a metal, `None` while unresolved
    pub fn per_gram(&self, metal: Metal) -> Option<f64> {
        if self.is_loading {
            return None;
        }
        let price = match metal {
            Metal::Gold => self.gold_per_gram,
            Metal::Silver => self.silver_per_gram,
        };
        (price > 0.0).then_some(price)
    }

    /// True when gold or silver carries a usable value
    pub fn has_prices(&self) -> bool {
        self.gold_per_gram > 0.0 || self.silver_per_gram > 0.0
    }

    /// Age of the data, zero when unknown or in the future
    pub fn age(&self) -> std::time::Duration {
        match self.last_updated {
            Some(at) => {
                let secs = Utc::now().signed_duration_since(at).num_seconds();
                std::time::Duration::from_secs(secs.max(0) as u64)
            }
            None => std::time::Duration::ZERO,
        }
    }
}

impl Default for PriceSnapshot {
    fn default() -> Self {
        Self::loading()
    }
}

/// Overall health of the tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Live prices from a provider
    Healthy,
    /// Serving estimated or last-known prices
    Degraded,
    /// No prices published yet
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
