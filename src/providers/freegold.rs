//! FreeGoldAPI price provider implementation
//!
//! freegoldapi.com publishes a gold price series (USD per troy ounce) but no
//! silver. Silver is requested from gold-api.com; if that call fails, silver
//! is derived from gold through the configured gold/silver ratio and the quote
//! is still considered a success.

use crate::{
    config::PriceConfig,
    error::ProviderError,
    provider::MetalPriceProvider,
    providers::{ensure_price, get_text, gold_api},
    types::{Metal, PriceQuote, SilverBasis},
    units::oz_to_gram_with,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

const PROVIDER_NAME: &str = "freegold";

/// One record of the FreeGoldAPI series
#[derive(Debug, Deserialize)]
pub(crate) struct FreeGoldRecord {
    date: String,
    price: f64,
    #[serde(default)]
    source: String,
}

/// Parses the series and returns its most recent (last) record
pub(crate) fn parse_latest(body: &str) -> Result<FreeGoldRecord, ProviderError> {
    let records: Vec<FreeGoldRecord> = serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid(format!("Failed to parse FreeGoldAPI response: {}", e))
    })?;

    records
        .into_iter()
        .last()
        .ok_or_else(|| ProviderError::invalid("FreeGoldAPI returned an empty series"))
}

/// Display label, crediting the upstream feed when FreeGoldAPI names it
fn source_label(upstream: &str) -> &'static str {
    if upstream.contains("yahoo_finance") {
        "Yahoo Finance (via FreeGoldAPI)"
    } else {
        "FreeGoldAPI"
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` and bare dates (as UTC midnight)
fn parse_date(date: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.and_utc());
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// FreeGoldAPI provider with gold-api.com silver
pub struct FreeGoldApiProvider {
    client: Client,
    url: String,
    silver_base_url: String,
    grams_per_oz: f64,
    gold_silver_ratio: f64,
}

impl FreeGoldApiProvider {
    pub fn new(client: Client, config: &PriceConfig) -> Self {
        Self {
            client,
            url: config.endpoints.freegold.clone(),
            silver_base_url: config.endpoints.gold_api.clone(),
            grams_per_oz: config.grams_per_troy_ounce,
            gold_silver_ratio: config.gold_silver_ratio,
        }
    }

    /// Builds the quote from gold and the outcome of the silver request
    fn combine(
        &self,
        gold_per_gram: f64,
        silver_per_oz: Result<f64, ProviderError>,
        observed_at: DateTime<Utc>,
        source: &str,
    ) -> PriceQuote {
        let (silver_per_gram, silver_basis) = match silver_per_oz {
            Ok(price) => (oz_to_gram_with(price, self.grams_per_oz), SilverBasis::Spot),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    ratio = self.gold_silver_ratio,
                    "Silver request failed, deriving silver from gold"
                );
                (gold_per_gram / self.gold_silver_ratio, SilverBasis::GoldRatio)
            }
        };

        PriceQuote {
            gold_per_gram,
            silver_per_gram,
            observed_at,
            source: source.to_string(),
            silver_basis,
        }
    }
}

#[async_trait]
impl MetalPriceProvider for FreeGoldApiProvider {
    async fn fetch_quote(&self) -> Result<PriceQuote, ProviderError> {
        let body = get_text(&self.client, &self.url, PROVIDER_NAME).await?;
        let latest = parse_latest(&body)?;
        let gold_per_gram = oz_to_gram_with(ensure_price(latest.price, "gold")?, self.grams_per_oz);

        let observed_at = parse_date(&latest.date).unwrap_or_else(|| {
            tracing::debug!(date = %latest.date, "Unrecognized FreeGoldAPI date, using now");
            Utc::now()
        });

        let silver =
            gold_api::fetch_price_per_oz(&self.client, &self.silver_base_url, Metal::Silver).await;

        Ok(self.combine(
            gold_per_gram,
            silver,
            observed_at,
            source_label(&latest.source),
        ))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
