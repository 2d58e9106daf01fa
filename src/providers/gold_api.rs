//! gold-api.com price provider implementation
//!
//! The API exposes one endpoint per metal code (`/price/XAU`, `/price/XAG`),
//! each returning `{ "price": <USD per troy ounce>, ... }`.

use crate::{
    config::PriceConfig,
    error::ProviderError,
    provider::MetalPriceProvider,
    providers::{ensure_price, get_text},
    types::{Metal, PriceQuote},
    units::oz_to_gram_with,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

const PROVIDER_NAME: &str = "gold-api";
const SOURCE_LABEL: &str = "api.gold-api.com";

/// gold-api.com response for a single metal
#[derive(Debug, Deserialize)]
struct MetalPriceResponse {
    price: f64,
}

/// Parses a `/price/{code}` body into USD per troy ounce
pub(crate) fn parse_price(body: &str, metal: Metal) -> Result<f64, ProviderError> {
    let response: MetalPriceResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid(format!(
            "Failed to parse gold-api {} response: {}. Response: {}",
            metal.code(),
            e,
            body
        ))
    })?;
    ensure_price(response.price, metal.name())
}

/// Fetches one metal's USD per troy ounce price
pub(crate) async fn fetch_price_per_oz(
    client: &Client,
    base_url: &str,
    metal: Metal,
) -> Result<f64, ProviderError> {
    let url = format!("{}/{}", base_url.trim_end_matches('/'), metal.code());
    let body = get_text(client, &url, PROVIDER_NAME).await?;
    parse_price(&body, metal)
}

/// gold-api.com provider
///
/// Gold and silver are requested concurrently and both must succeed.
pub struct GoldApiProvider {
    client: Client,
    base_url: String,
    grams_per_oz: f64,
}

impl GoldApiProvider {
    pub fn new(client: Client, config: &PriceConfig) -> Self {
        Self {
            client,
            base_url: config.endpoints.gold_api.clone(),
            grams_per_oz: config.grams_per_troy_ounce,
        }
    }
}

#[async_trait]
impl MetalPriceProvider for GoldApiProvider {
    async fn fetch_quote(&self) -> Result<PriceQuote, ProviderError> {
        let (gold, silver) = futures::future::join(
            fetch_price_per_oz(&self.client, &self.base_url, Metal::Gold),
            fetch_price_per_oz(&self.client, &self.base_url, Metal::Silver),
        )
        .await;

        let gold_per_gram = oz_to_gram_with(gold?, self.grams_per_oz);
        let silver_per_gram = oz_to_gram_with(silver?, self.grams_per_oz);

        tracing::debug!(gold_per_gram, silver_per_gram, "Fetched prices from gold-api");

        Ok(PriceQuote::spot(
            gold_per_gram,
            silver_per_gram,
            Utc::now(),
            SOURCE_LABEL,
        ))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
