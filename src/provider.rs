//! Provider abstraction for fetching metal prices from external APIs

use crate::{error::ProviderError, types::PriceQuote};
use async_trait::async_trait;

/// Trait for metal price providers
///
/// Implementations know how to query one external API and normalize its
/// response into a [`PriceQuote`] in USD per gram. Providers do not retry;
/// falling back is the job of
/// [`FallbackChain`](crate::providers::FallbackChain).
#[async_trait]
pub trait MetalPriceProvider: Send + Sync {
    /// Fetches current gold and silver prices
    ///
    /// # Returns
    /// A quote for both metals, or an error if the provider could not
    /// be reached or its response was unusable
    async fn fetch_quote(&self) -> Result<PriceQuote, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}
