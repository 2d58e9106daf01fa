//! Constants for the metal price tracker
//!
//! These are the compile-time defaults behind [`PriceConfig::default`].
//! Every value here can be overridden at runtime through the `config` module.
//!
//! [`PriceConfig::default`]: crate::config::PriceConfig

/// How often to re-run the provider chain (in seconds)
pub const REFRESH_INTERVAL_SECS: u64 = 300;

/// HTTP request timeout when fetching prices (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Grams in one troy ounce
pub const GRAMS_PER_TROY_OUNCE: f64 = 31.1035;

/// Gold/silver price ratio used to derive silver when only gold is available
pub const GOLD_SILVER_RATIO: f64 = 86.0;

/// USD multipliers for the supported display currencies
pub const DEFAULT_EXCHANGE_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("INR", 83.5),
    ("SAR", 3.75),
    ("GBP", 0.79),
    ("EUR", 0.92),
];

/// Import duty, AIDC and GST on top of the international spot price in India
pub const INR_PREMIUM_FACTOR: f64 = 1.1869;

/// Currencies the regional premium applies to by default
pub const PREMIUM_CURRENCIES: &[&str] = &["INR"];

/// Last-resort gold estimate (USD per troy ounce)
pub const FALLBACK_GOLD_PER_OZ: f64 = 4980.0;

/// Last-resort silver estimate (USD per troy ounce)
pub const FALLBACK_SILVER_PER_OZ: f64 = 78.0;

/// When the fallback estimates were taken (RFC 3339)
pub const FALLBACK_AS_OF: &str = "2026-02-19T13:00:00Z";

/// Source label for the fallback snapshot
pub const ESTIMATED_SOURCE_LABEL: &str = "Estimated Rates";

/// Advisory shown when no live provider answered
pub const FALLBACK_ADVISORY: &str = "Live rates unavailable. Using estimated rates (Feb 2026).";

/// FreeGoldAPI latest gold series
pub const FREEGOLD_API_URL: &str = "https://freegoldapi.com/data/latest.json";

/// gold-api.com per-metal price endpoint (metal code is appended)
pub const GOLD_API_URL: &str = "https://api.gold-api.com/price";

/// goldprice.org combined USD rates
pub const GOLDPRICE_ORG_URL: &str = "https://data-asg.goldprice.org/dbXRates/USD";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "nisab-price-sdk/0.1.0";
