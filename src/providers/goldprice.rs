//! goldprice.org price provider implementation

use crate::{
    config::PriceConfig,
    error::ProviderError,
    provider::MetalPriceProvider,
    providers::{ensure_price, get_text},
    types::PriceQuote,
    units::oz_to_gram_with,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;

const PROVIDER_NAME: &str = "goldprice-org";
const SOURCE_LABEL: &str = "GoldPrice.org";

/// goldprice.org rates response
///
/// Both metals arrive in one item per quote currency, per troy ounce.
#[derive(Debug, Deserialize)]
struct RatesResponse {
    /// Epoch milliseconds
    ts: Option<i64>,
    items: Vec<RateItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateItem {
    #[serde(default)]
    curr: String,
    xau_price: f64,
    xag_price: f64,
}

/// Extracts `(gold_per_oz, silver_per_oz, observed_at)` from a response body
pub(crate) fn parse_rates(
    body: &str,
) -> Result<(f64, f64, Option<DateTime<Utc>>), ProviderError> {
    let response: RatesResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid(format!(
            "Failed to parse goldprice.org response: {}. Response: {}",
            e, body
        ))
    })?;

    let observed_at = response
        .ts
        .and_then(|ts| Utc.timestamp_millis_opt(ts).single());

    let item = response
        .items
        .iter()
        .find(|item| item.curr.eq_ignore_ascii_case("USD"))
        .or_else(|| response.items.first())
        .ok_or_else(|| ProviderError::invalid("No rates returned from goldprice.org"))?;

    Ok((
        ensure_price(item.xau_price, "gold")?,
        ensure_price(item.xag_price, "silver")?,
        observed_at,
    ))
}

/// goldprice.org provider: a single request yields gold and silver
pub struct GoldPriceOrgProvider {
    client: Client,
    url: String,
    grams_per_oz: f64,
}

impl GoldPriceOrgProvider {
    pub fn new(client: Client, config: &PriceConfig) -> Self {
        Self {
            client,
            url: config.endpoints.goldprice.clone(),
            grams_per_oz: config.grams_per_troy_ounce,
        }
    }
}

#[async_trait]
impl MetalPriceProvider for GoldPriceOrgProvider {
    async fn fetch_quote(&self) -> Result<PriceQuote, ProviderError> {
        let body = get_text(&self.client, &self.url, PROVIDER_NAME).await?;
        let (gold_per_oz, silver_per_oz, observed_at) = parse_rates(&body)?;

        Ok(PriceQuote::spot(
            oz_to_gram_with(gold_per_oz, self.grams_per_oz),
            oz_to_gram_with(silver_per_oz, self.grams_per_oz),
            observed_at.unwrap_or_else(Utc::now),
            SOURCE_LABEL,
        ))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        build_client,
        test_server::{serve, Route},
    };

    const RATES: &str = r#"{
        "ts": 1771505400000,
        "tsj": 1771505399000,
        "date": "Feb 19th 2026, 01:50:00 pm NY",
        "items": [{
            "curr": "USD",
            "xauPrice": 3110.35,
            "xagPrice": 62.207,
            "chgXau": 12.1,
            "chgXag": -0.2
        }]
    }"#;

    #[test]
    fn test_parse_rates() {
        let (gold, silver, observed_at) = parse_rates(RATES).unwrap();
        assert_eq!(gold, 3110.35);
        assert_eq!(silver, 62.207);
        assert_eq!(
            observed_at,
            Utc.timestamp_millis_opt(1_771_505_400_000).single()
        );
    }

    #[test]
    fn test_parse_rates_without_timestamp_or_items() {
        let (_, _, observed_at) =
            parse_rates(r#"{"items":[{"xauPrice":2000.0,"xagPrice":25.0}]}"#).unwrap();
        assert!(observed_at.is_none());

        assert!(parse_rates(r#"{"items":[]}"#).unwrap_err().is_parse());
        assert!(parse_rates(r#"{"items":[{"xauPrice":2000.0}]}"#)
            .unwrap_err()
            .is_parse());
    }

    #[tokio::test]
    async fn test_fetch_quote() {
        let base = serve(vec![Route::ok("/dbXRates/USD", RATES)]).await;
        let mut config = PriceConfig::default();
        config.endpoints.goldprice = format!("{}/dbXRates/USD", base);
        let provider = GoldPriceOrgProvider::new(build_client(&config).unwrap(), &config);

        let quote = provider.fetch_quote().await.unwrap();
        assert!((quote.gold_per_gram - 100.0).abs() < 1e-9);
        assert!((quote.silver_per_gram - 2.0).abs() < 1e-9);
        assert_eq!(quote.source, "GoldPrice.org");
    }
}
