//! Ordered provider fallback with a static last resort
//!
//! Providers are tried strictly in order and the first success wins. A
//! failure only moves on to the next provider; it is never shown to the
//! consumer once a later provider succeeds. When every provider fails the
//! chain falls back to fixed estimates (or, if configured, to the last
//! known prices) and attaches an advisory.

use crate::{
    config::PriceConfig,
    constants::{
        ESTIMATED_SOURCE_LABEL, FALLBACK_ADVISORY, FALLBACK_AS_OF, FALLBACK_GOLD_PER_OZ,
        FALLBACK_SILVER_PER_OZ,
    },
    error::ProviderError,
    metrics::{MetricsCollector, ProviderMetrics},
    provider::MetalPriceProvider,
    providers::{build_client, build_providers},
    types::{PriceQuote, PriceSnapshot},
    units::oz_to_gram_with,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Fixed prices published when no provider answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticEstimate {
    /// Gold in USD per troy ounce
    pub gold_per_oz: f64,
    /// Silver in USD per troy ounce
    pub silver_per_oz: f64,
    /// When the estimate was taken
    pub as_of: DateTime<Utc>,
    pub label: String,
    pub advisory: String,
}

impl StaticEstimate {
    /// The snapshot published on total provider failure
    pub fn snapshot(&self, grams_per_oz: f64) -> PriceSnapshot {
        PriceSnapshot {
            gold_per_gram: oz_to_gram_with(self.gold_per_oz, grams_per_oz),
            silver_per_gram: oz_to_gram_with(self.silver_per_oz, grams_per_oz),
            last_updated: Some(self.as_of),
            is_loading: false,
            error: Some(self.advisory.clone()),
            source: self.label.clone(),
        }
    }
}

impl Default for StaticEstimate {
    fn default() -> Self {
        Self {
            gold_per_oz: FALLBACK_GOLD_PER_OZ,
            silver_per_oz: FALLBACK_SILVER_PER_OZ,
            as_of: DateTime::parse_from_rfc3339(FALLBACK_AS_OF)
                .map(|at| at.with_timezone(&Utc))
                .unwrap_or_default(),
            label: ESTIMATED_SOURCE_LABEL.to_string(),
            advisory: FALLBACK_ADVISORY.to_string(),
        }
    }
}

/// What to publish when every provider fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Publish the static estimate
    #[default]
    StaticEstimate,
    /// Keep the previous prices if there are any, flagged with the advisory
    KeepLast,
}

/// Result of one pass through the chain
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotUpdate {
    /// Publish this snapshot
    Replace(PriceSnapshot),
    /// Keep the current prices and set this advisory
    KeepLast { advisory: String },
}

/// Provider chain: first success wins
pub struct FallbackChain {
    providers: Vec<(Arc<dyn MetalPriceProvider>, Arc<MetricsCollector>)>,
    estimate: StaticEstimate,
    policy: ExhaustionPolicy,
    grams_per_oz: f64,
}

impl FallbackChain {
    /// Creates a chain over `providers`, tried in the order given
    pub fn new(providers: Vec<Arc<dyn MetalPriceProvider>>, config: &PriceConfig) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| {
                let metrics = Arc::new(MetricsCollector::new(provider.provider_name()));
                (provider, metrics)
            })
            .collect();

        Self {
            providers,
            estimate: config.fallback.clone(),
            policy: config.exhaustion_policy,
            grams_per_oz: config.grams_per_troy_ounce,
        }
    }

    /// Creates the chain of built-in providers named in `config`
    pub fn from_config(config: &PriceConfig) -> Result<Self, ProviderError> {
        let client = build_client(config)?;
        Ok(Self::new(build_providers(config, &client), config))
    }

    /// Provider names in the order they are tried
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .map(|(provider, _)| provider.provider_name())
            .collect()
    }

    /// Runs the chain from the first provider and decides what to publish
    ///
    /// Never fails: total failure is turned into the configured fallback.
    pub async fn resolve(&self, previous: &PriceSnapshot) -> SnapshotUpdate {
        match self.fetch_quote().await {
            Ok(quote) => SnapshotUpdate::Replace(PriceSnapshot::from_quote(quote)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    providers = self.providers.len(),
                    policy = ?self.policy,
                    "All metal price providers failed"
                );
                match self.policy {
                    ExhaustionPolicy::KeepLast if previous.has_prices() => {
                        SnapshotUpdate::KeepLast {
                            advisory: self.estimate.advisory.clone(),
                        }
                    }
                    _ => SnapshotUpdate::Replace(self.estimate.snapshot(self.grams_per_oz)),
                }
            }
        }
    }

    /// Per-provider attempt metrics, in chain order
    pub async fn metrics(&self) -> Vec<ProviderMetrics> {
        let mut result = Vec::with_capacity(self.providers.len());
        for (_, metrics) in &self.providers {
            result.push(metrics.get_metrics().await);
        }
        result
    }
}

#[async_trait]
impl MetalPriceProvider for FallbackChain {
    async fn fetch_quote(&self) -> Result<PriceQuote, ProviderError> {
        let mut last_error = None;

        for (provider, metrics) in &self.providers {
            let start = Instant::now();
            match provider.fetch_quote().await {
                Ok(quote) => {
                    metrics.record_attempt(start.elapsed(), true).await;
                    tracing::debug!(
                        provider = provider.provider_name(),
                        source = %quote.source,
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Fetched metal prices"
                    );
                    return Ok(quote);
                }
                Err(e) => {
                    metrics.record_attempt(start.elapsed(), false).await;
                    tracing::warn!(
                        provider = provider.provider_name(),
                        error = %e,
                        "Provider failed, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ProviderError::invalid("No providers configured for fallback")))
    }

    fn provider_name(&self) -> &'static str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use chrono::TimeZone;

    fn chain(providers: Vec<Arc<MockProvider>>, config: &PriceConfig) -> FallbackChain {
        FallbackChain::new(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn MetalPriceProvider>)
                .collect(),
            config,
        )
    }

    fn expect_replace(update: SnapshotUpdate) -> PriceSnapshot {
        match update {
            SnapshotUpdate::Replace(snapshot) => snapshot,
            other => panic!("expected a replacement, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_the_rest() {
        let primary = Arc::new(MockProvider::succeeding("primary", 150.0, 1.8));
        let secondary = Arc::new(MockProvider::succeeding("secondary", 1.0, 1.0));
        let chain = chain(vec![primary.clone(), secondary.clone()], &PriceConfig::default());

        let snapshot = expect_replace(chain.resolve(&PriceSnapshot::loading()).await);
        assert_eq!(snapshot.source, "primary");
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_later_success_hides_earlier_failures() {
        let primary = Arc::new(MockProvider::failing("primary"));
        let secondary = Arc::new(MockProvider::failing("secondary"));
        let combined = Arc::new(MockProvider::succeeding("GoldPrice.org", 160.0, 2.0));
        let chain = chain(
            vec![primary.clone(), secondary.clone(), combined.clone()],
            &PriceConfig::default(),
        );

        let snapshot = expect_replace(chain.resolve(&PriceSnapshot::loading()).await);
        assert!(snapshot.error.is_none());
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.source, "GoldPrice.org");
        assert_eq!(snapshot.gold_per_gram, 160.0);
        assert_eq!(
            (primary.call_count(), secondary.call_count(), combined.call_count()),
            (1, 1, 1)
        );
    }

    #[tokio::test]
    async fn test_total_failure_publishes_estimate() {
        let chain = chain(
            vec![
                Arc::new(MockProvider::failing("primary")),
                Arc::new(MockProvider::failing("secondary")),
            ],
            &PriceConfig::default(),
        );

        let snapshot = expect_replace(chain.resolve(&PriceSnapshot::loading()).await);
        assert!((snapshot.gold_per_gram - 4980.0 / 31.1035).abs() < 1e-9);
        assert!((snapshot.silver_per_gram - 78.0 / 31.1035).abs() < 1e-9);
        assert_eq!(snapshot.source, "Estimated Rates");
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Live rates unavailable. Using estimated rates (Feb 2026).")
        );
        assert_eq!(
            snapshot.last_updated,
            Some(Utc.with_ymd_and_hms(2026, 2, 19, 13, 0, 0).unwrap())
        );
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_empty_chain_publishes_estimate() {
        let chain = chain(vec![], &PriceConfig::default());
        let snapshot = expect_replace(chain.resolve(&PriceSnapshot::loading()).await);
        assert_eq!(snapshot.source, "Estimated Rates");
        assert!(chain.fetch_quote().await.is_err());
    }

    #[tokio::test]
    async fn test_keep_last_policy() {
        let config = PriceConfig {
            exhaustion_policy: ExhaustionPolicy::KeepLast,
            ..PriceConfig::default()
        };
        let chain = chain(vec![Arc::new(MockProvider::failing("primary"))], &config);

        let previous = PriceSnapshot::from_quote(PriceQuote::spot(150.0, 1.8, Utc::now(), "x"));
        assert!(matches!(
            chain.resolve(&previous).await,
            SnapshotUpdate::KeepLast { .. }
        ));

        // Nothing to keep yet, so the estimate is used
        let snapshot = expect_replace(chain.resolve(&PriceSnapshot::loading()).await);
        assert_eq!(snapshot.source, "Estimated Rates");
    }

    #[tokio::test]
    async fn test_metrics_are_recorded_per_provider() {
        let chain = chain(
            vec![
                Arc::new(MockProvider::failing("primary")),
                Arc::new(MockProvider::succeeding("secondary", 1.0, 1.0)),
            ],
            &PriceConfig::default(),
        );
        chain.resolve(&PriceSnapshot::loading()).await;
        chain.resolve(&PriceSnapshot::loading()).await;

        let metrics = chain.metrics().await;
        assert_eq!(chain.provider_names(), vec!["primary", "secondary"]);
        assert_eq!(metrics[0].failed_attempts, 2);
        assert_eq!(metrics[0].success_rate, 0.0);
        assert_eq!(metrics[1].total_attempts, 2);
        assert_eq!(metrics[1].success_rate, 1.0);
    }
}
