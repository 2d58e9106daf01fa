//! Runtime configuration for the metal price tracker
//!
//! Defaults come from [`constants`](crate::constants). A deployment can
//! override any of them with a JSON file and a handful of environment
//! variables, without a rebuild:
//!
//! | Variable | Effect |
//! |---|---|
//! | `NISAB_PRICE_CONFIG` | path to a JSON `PriceConfig` (missing fields keep defaults) |
//! | `NISAB_REFRESH_INTERVAL_SECS` | refresh period |
//! | `NISAB_REQUEST_TIMEOUT_SECS` | per-request HTTP timeout |
//! | `NISAB_PRICE_PROVIDERS` | provider order, e.g. `freegold,gold-api,goldprice` |
//! | `NISAB_PREMIUM_ENABLED` | `true`/`false` for the regional premium |

use crate::{
    constants::{
        FREEGOLD_API_URL, GOLDPRICE_ORG_URL, GOLD_API_URL, GOLD_SILVER_RATIO,
        GRAMS_PER_TROY_OUNCE, REFRESH_INTERVAL_SECS, REQUEST_TIMEOUT_SECS, USER_AGENT,
    },
    error::ConfigError,
    providers::fallback::{ExhaustionPolicy, StaticEstimate},
    units::{CurrencyConverter, ExchangeRateTable, PremiumPolicy},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "NISAB_PRICE_CONFIG";
pub const REFRESH_INTERVAL_ENV: &str = "NISAB_REFRESH_INTERVAL_SECS";
pub const REQUEST_TIMEOUT_ENV: &str = "NISAB_REQUEST_TIMEOUT_SECS";
pub const PROVIDERS_ENV: &str = "NISAB_PRICE_PROVIDERS";
pub const PREMIUM_ENABLED_ENV: &str = "NISAB_PREMIUM_ENABLED";

/// Built-in price providers, in the order they can be chained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// freegoldapi.com for gold, gold-api.com for silver
    #[serde(rename = "freegold")]
    FreeGold,
    /// gold-api.com, both metals fetched in parallel
    #[serde(rename = "gold-api")]
    GoldApi,
    /// goldprice.org, both metals in one response
    #[serde(rename = "goldprice")]
    GoldPriceOrg,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::FreeGold => "freegold",
            ProviderKind::GoldApi => "gold-api",
            ProviderKind::GoldPriceOrg => "goldprice",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "freegold" | "freegoldapi" => Ok(ProviderKind::FreeGold),
            "gold-api" | "goldapi" => Ok(ProviderKind::GoldApi),
            "goldprice" | "goldprice-org" => Ok(ProviderKind::GoldPriceOrg),
            other => Err(ConfigError::invalid(
                PROVIDERS_ENV,
                format!("unknown provider '{}'", other),
            )),
        }
    }
}

/// Provider endpoint URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub freegold: String,
    /// Base URL; the metal code is appended as a path segment
    pub gold_api: String,
    pub goldprice: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            freegold: FREEGOLD_API_URL.to_string(),
            gold_api: GOLD_API_URL.to_string(),
            goldprice: GOLDPRICE_ORG_URL.to_string(),
        }
    }
}

/// Everything the tracker needs that a deployment may want to change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub grams_per_troy_ounce: f64,
    pub gold_silver_ratio: f64,
    pub exchange_rates: ExchangeRateTable,
    pub premium: PremiumPolicy,
    pub fallback: StaticEstimate,
    pub exhaustion_policy: ExhaustionPolicy,
    pub providers: Vec<ProviderKind>,
    pub endpoints: Endpoints,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: REFRESH_INTERVAL_SECS,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            user_agent: USER_AGENT.to_string(),
            grams_per_troy_ounce: GRAMS_PER_TROY_OUNCE,
            gold_silver_ratio: GOLD_SILVER_RATIO,
            exchange_rates: ExchangeRateTable::default(),
            premium: PremiumPolicy::default(),
            fallback: StaticEstimate::default(),
            exhaustion_policy: ExhaustionPolicy::default(),
            providers: vec![
                ProviderKind::FreeGold,
                ProviderKind::GoldApi,
                ProviderKind::GoldPriceOrg,
            ],
            endpoints: Endpoints::default(),
        }
    }
}

impl PriceConfig {
    /// Parses a JSON document; absent fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Loads the config file named by `NISAB_PRICE_CONFIG` (if any), then
    /// applies the individual environment overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from any key/value source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(REFRESH_INTERVAL_ENV) {
            self.refresh_interval_secs = parse_value(REFRESH_INTERVAL_ENV, &value)?;
        }
        if let Some(value) = lookup(REQUEST_TIMEOUT_ENV) {
            self.request_timeout_secs = parse_value(REQUEST_TIMEOUT_ENV, &value)?;
        }
        if let Some(value) = lookup(PROVIDERS_ENV) {
            self.providers = value
                .split(',')
                .filter(|name| !name.trim().is_empty())
                .map(ProviderKind::from_str)
                .collect::<Result<_, _>>()?;
        }
        if let Some(value) = lookup(PREMIUM_ENABLED_ENV) {
            self.premium.enabled = parse_value(PREMIUM_ENABLED_ENV, &value)?;
        }
        Ok(())
    }

    /// Rejects values that would make prices meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "refresh_interval_secs",
                "must be greater than zero",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "request_timeout_secs",
                "must be greater than zero",
            ));
        }
        ensure_positive("grams_per_troy_ounce", self.grams_per_troy_ounce)?;
        ensure_positive("gold_silver_ratio", self.gold_silver_ratio)?;
        ensure_positive("premium.factor", self.premium.factor)?;
        ensure_positive("fallback.gold_per_oz", self.fallback.gold_per_oz)?;
        ensure_positive("fallback.silver_per_oz", self.fallback.silver_per_oz)?;
        for (code, rate) in self.exchange_rates.iter() {
            ensure_positive(&format!("exchange_rates.{}", code), rate)?;
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Currency conversion as configured
    pub fn converter(&self) -> CurrencyConverter {
        CurrencyConverter::new(self.exchange_rates.clone(), self.premium.clone())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("cannot parse '{}'", value)))
}

fn ensure_positive(key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, format!("{} is not positive", value)))
    }
}
