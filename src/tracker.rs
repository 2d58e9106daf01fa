//! Metal price tracker service
//!
//! Owns the fallback chain and the published snapshot, and runs the periodic
//! refresh task.
//!
//! Refresh passes are serialized: the timer loop awaits each pass before it
//! waits for the next tick, ticks missed by a slow pass are skipped, and
//! [`MetalPriceTracker::refresh_now`] takes the same pass lock. Snapshots are
//! therefore published in the order their passes started.

use crate::{
    config::PriceConfig,
    error::{ConfigError, TrackerError},
    metrics::ProviderMetrics,
    provider::MetalPriceProvider,
    providers::{FallbackChain, SnapshotUpdate},
    store::PriceStore,
    types::{ComponentHealth, HealthStatus, PriceSnapshot},
    units::CurrencyConverter,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

/// Metal price tracker
///
/// # Example
/// ```no_run
/// use nisab_price_sdk::{MetalPriceTracker, PriceConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tracker = MetalPriceTracker::new(PriceConfig::from_env()?)?;
/// let mut updates = tracker.subscribe();
/// let _refresh = tracker.start();
///
/// let snapshot = updates.wait_for(|s| !s.is_loading).await?.clone();
/// println!(
///     "Gold: ₹{:.2}/g ({})",
///     tracker.convert_currency(snapshot.gold_per_gram, "INR"),
///     snapshot.source
/// );
/// # Ok(())
/// # }
/// ```
pub struct MetalPriceTracker {
    inner: Arc<Inner>,
}

struct Inner {
    chain: FallbackChain,
    store: PriceStore,
    converter: CurrencyConverter,
    refresh_interval: Duration,
    pass_lock: Mutex<()>,
}

impl MetalPriceTracker {
    /// Creates a tracker over the built-in providers named in `config`
    ///
    /// Fails if `config` does not pass [`PriceConfig::validate`].
    pub fn new(config: PriceConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        let chain = FallbackChain::from_config(&config)?;
        Ok(Self::with_chain(chain, &config))
    }

    /// Creates a tracker over custom providers, tried in the order given
    ///
    /// Fails if `config` does not pass [`PriceConfig::validate`].
    pub fn with_providers(
        providers: Vec<Arc<dyn MetalPriceProvider>>,
        config: &PriceConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_chain(FallbackChain::new(providers, config), config))
    }

    // `config` must already be validated: `interval` panics on a zero period
    fn with_chain(chain: FallbackChain, config: &PriceConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                chain,
                store: PriceStore::new(),
                converter: config.converter(),
                refresh_interval: config.refresh_interval(),
                pass_lock: Mutex::new(()),
            }),
        }
    }

    /// Starts the background refresh task
    ///
    /// The first pass runs immediately, then one per refresh interval. The
    /// task runs until the returned handle is stopped or dropped.
    pub fn start(&self) -> RefreshHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(Notify::new());

        let inner = self.inner.clone();
        let task_cancelled = cancelled.clone();
        let task_shutdown = shutdown.clone();

        let task = tokio::spawn(async move {
            tracing::info!(
                refresh_interval_secs = inner.refresh_interval.as_secs(),
                providers = ?inner.chain.provider_names(),
                "Starting metal price tracker background task"
            );

            let mut ticker = interval(inner.refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = task_shutdown.notified() => break,
                }
                if task_cancelled.load(Ordering::Acquire) {
                    break;
                }
                inner.run_pass(Some(&task_cancelled)).await;
            }

            tracing::info!("Metal price tracker background task stopped");
        });

        RefreshHandle {
            cancelled,
            shutdown,
            task: Some(task),
        }
    }

    /// Runs one pass through the provider chain right away
    ///
    /// Waits for any pass already in flight, then returns the snapshot it
    /// published.
    pub async fn refresh_now(&self) -> PriceSnapshot {
        self.inner.run_pass(None).await
    }

    /// Returns the live snapshot
    pub fn current(&self) -> PriceSnapshot {
        self.inner.store.current()
    }

    /// Subscribes to snapshot replacements
    pub fn subscribe(&self) -> watch::Receiver<PriceSnapshot> {
        self.inner.store.subscribe()
    }

    /// Converts a USD per gram value into `currency_code` per gram
    pub fn convert_currency(&self, usd_per_gram: f64, currency_code: &str) -> f64 {
        self.inner.converter.convert(usd_per_gram, currency_code)
    }

    /// The configured currency converter
    pub fn converter(&self) -> &CurrencyConverter {
        &self.inner.converter
    }

    /// Provider names in the order they are tried
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.inner.chain.provider_names()
    }

    /// Gets per-provider metrics including latency percentiles and success rates
    pub async fn provider_metrics(&self) -> Vec<ProviderMetrics> {
        self.inner.chain.metrics().await
    }

    /// Perform a health check on the metal price tracker
    pub async fn health_check(&self) -> ComponentHealth {
        let snapshot = self.current();
        let mut details = std::collections::HashMap::new();

        details.insert("source".to_string(), serde_json::json!(snapshot.source));
        details.insert(
            "gold_per_gram".to_string(),
            serde_json::json!(snapshot.gold_per_gram),
        );
        details.insert(
            "silver_per_gram".to_string(),
            serde_json::json!(snapshot.silver_per_gram),
        );
        details.insert(
            "age_secs".to_string(),
            serde_json::json!(snapshot.age().as_secs()),
        );
        details.insert(
            "providers".to_string(),
            serde_json::json!(self.provider_metrics().await),
        );

        let (status, message) = if snapshot.is_loading {
            (
                HealthStatus::Unhealthy,
                "Metal price tracker has not published prices yet".to_string(),
            )
        } else if let Some(advisory) = &snapshot.error {
            (HealthStatus::Degraded, advisory.clone())
        } else {
            (
                HealthStatus::Healthy,
                format!("Live prices from {}", snapshot.source),
            )
        };

        ComponentHealth {
            name: "metal_price_tracker".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }
}

impl Inner {
    /// Resolves the chain and publishes, unless `cancelled` was set meanwhile
    async fn run_pass(&self, cancelled: Option<&AtomicBool>) -> PriceSnapshot {
        let _pass = self.pass_lock.lock().await;
        let pass_id = Uuid::new_v4();

        tracing::debug!(%pass_id, "Refreshing metal prices");
        let update = self.chain.resolve(&self.store.current()).await;

        if cancelled.is_some_and(|flag| flag.load(Ordering::Acquire)) {
            tracing::debug!(%pass_id, "Tracker stopped during refresh, discarding result");
            return self.store.current();
        }

        match update {
            SnapshotUpdate::Replace(snapshot) => self.store.publish(snapshot),
            SnapshotUpdate::KeepLast { advisory } => self.store.degrade(advisory),
        }

        let snapshot = self.store.current();
        tracing::info!(
            %pass_id,
            source = %snapshot.source,
            gold_per_gram = snapshot.gold_per_gram,
            silver_per_gram = snapshot.silver_per_gram,
            degraded = snapshot.error.is_some(),
            "Metal prices refreshed"
        );
        snapshot
    }
}

/// Handle to the background refresh task
///
/// Stopping (or dropping) the handle abandons the pending timer. A pass that
/// is already fetching is left to finish, but its result is not published.
///
/// Only [`RefreshHandle::stop`] guarantees no further publish once it
/// returns. [`RefreshHandle::cancel`] and `Drop` only signal the task: on a
/// multi-threaded runtime a pass that has already passed its cancellation
/// check may still publish once.
pub struct RefreshHandle {
    cancelled: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Stops the refresh task and waits for it to exit
    pub async fn stop(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Metal price refresh task ended abnormally");
            }
        }
    }

    /// Signals the refresh task to stop without waiting for it
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.shutdown.notify_one();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use tokio::sync::Semaphore;

    fn tracker(providers: Vec<Arc<MockProvider>>) -> MetalPriceTracker {
        MetalPriceTracker::with_providers(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn MetalPriceProvider>)
                .collect(),
            &PriceConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_pass_runs_immediately() {
        let provider = Arc::new(MockProvider::succeeding("primary", 150.0, 1.8));
        let tracker = tracker(vec![provider.clone()]);
        assert!(tracker.current().is_loading);

        let mut rx = tracker.subscribe();
        let handle = tracker.start();
        let snapshot = rx.wait_for(|s| !s.is_loading).await.unwrap().clone();

        assert_eq!(snapshot.source, "primary");
        assert!(snapshot.error.is_none());
        assert_eq!(provider.call_count(), 1);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_tick_restarts_at_first_provider() {
        let primary = Arc::new(MockProvider::failing("primary"));
        let secondary = Arc::new(MockProvider::succeeding("secondary", 150.0, 1.8));
        let tracker = tracker(vec![primary.clone(), secondary.clone()]);

        let handle = tracker.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!((primary.call_count(), secondary.call_count()), (1, 1));
        assert_eq!(tracker.current().source, "secondary");

        primary.set_prices(160.0, 2.0);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!((primary.call_count(), secondary.call_count()), (2, 1));
        assert_eq!(tracker.current().source, "primary");

        primary.set_failing();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!((primary.call_count(), secondary.call_count()), (3, 2));
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_publish_after_stop() {
        let gate = Arc::new(Semaphore::new(1));
        let provider =
            Arc::new(MockProvider::succeeding("primary", 150.0, 1.8).with_gate(gate.clone()));
        let tracker = tracker(vec![provider.clone()]);

        let handle = tracker.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let before = tracker.current();
        assert_eq!(before.gold_per_gram, 150.0);

        // Second tick blocks inside the provider
        provider.set_prices(999.0, 9.0);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(provider.call_count(), 2);

        handle.cancel();
        gate.add_permits(1);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(tracker.current(), before);
        // The timer was abandoned too
        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_refresh() {
        let provider = Arc::new(MockProvider::succeeding("primary", 150.0, 1.8));
        let tracker = tracker(vec![provider.clone()]);

        drop(tracker.start());
        tokio::time::sleep(Duration::from_secs(1000)).await;
        assert!(provider.call_count() <= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_waits_for_in_flight_pass() {
        let gate = Arc::new(Semaphore::new(0));
        let provider =
            Arc::new(MockProvider::succeeding("primary", 150.0, 1.8).with_gate(gate.clone()));
        let tracker = tracker(vec![provider.clone()]);

        let handle = tracker.start();
        while provider.call_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let stopping = tokio::spawn(handle.stop());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!stopping.is_finished());

        gate.add_permits(1);
        stopping.await.unwrap();

        // The task has exited and its pass result was discarded
        assert!(tracker.current().is_loading);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(tracker.current().is_loading);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_now_publishes() {
        let provider = Arc::new(MockProvider::failing("primary"));
        let tracker = tracker(vec![provider.clone()]);

        let snapshot = tracker.refresh_now().await;
        assert_eq!(snapshot.source, "Estimated Rates");
        assert!(snapshot.error.is_some());
        assert_eq!(tracker.current(), snapshot);

        provider.set_prices(150.0, 1.8);
        let snapshot = tracker.refresh_now().await;
        assert_eq!(snapshot.source, "primary");
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_keep_last_preserves_prices() {
        let provider = Arc::new(MockProvider::succeeding("primary", 150.0, 1.8));
        let config = PriceConfig {
            exhaustion_policy: crate::providers::ExhaustionPolicy::KeepLast,
            ..PriceConfig::default()
        };
        let tracker = MetalPriceTracker::with_providers(
            vec![provider.clone() as Arc<dyn MetalPriceProvider>],
            &config,
        )
        .unwrap();

        tracker.refresh_now().await;
        provider.set_failing();
        let snapshot = tracker.refresh_now().await;

        assert_eq!(snapshot.gold_per_gram, 150.0);
        assert_eq!(snapshot.source, "primary");
        assert!(snapshot.error.is_some());
    }

    #[tokio::test]
    async fn test_convert_currency_uses_config() {
        let tracker = tracker(vec![]);
        assert!((tracker.convert_currency(100.0, "INR") - 100.0 * 83.5 * 1.1869).abs() < 1e-9);
        assert_eq!(tracker.convert_currency(100.0, "XYZ"), 100.0);
    }

    #[tokio::test]
    async fn test_health_check() {
        let provider = Arc::new(MockProvider::succeeding("primary", 150.0, 1.8));
        let tracker = tracker(vec![provider.clone()]);
        assert_eq!(tracker.health_check().await.status, HealthStatus::Unhealthy);

        tracker.refresh_now().await;
        let health = tracker.health_check().await;
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.details["source"], serde_json::json!("primary"));

        provider.set_failing();
        tracker.refresh_now().await;
        assert_eq!(tracker.health_check().await.status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_silver_derived_when_secondary_fails() {
        use crate::providers::{
            test_server::{serve, Route},
            FreeGoldApiProvider,
        };

        let base = serve(vec![
            Route::ok(
                "/data/latest.json",
                r#"[{"date":"2026-02-18","price":3110.35,"source":"lbma"}]"#,
            ),
            Route::status("/price/XAG", 500),
        ])
        .await;
        let mut config = PriceConfig::default();
        config.endpoints.freegold = format!("{}/data/latest.json", base);
        config.endpoints.gold_api = format!("{}/price", base);
        let client = crate::providers::build_client(&config).unwrap();
        let provider: Arc<dyn MetalPriceProvider> =
            Arc::new(FreeGoldApiProvider::new(client, &config));
        let tracker = MetalPriceTracker::with_providers(vec![provider], &config).unwrap();

        let snapshot = tracker.refresh_now().await;
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.source, "FreeGoldAPI");
        assert!((snapshot.silver_per_gram - snapshot.gold_per_gram / 86.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let zero_interval = PriceConfig {
            refresh_interval_secs: 0,
            ..PriceConfig::default()
        };
        let err = MetalPriceTracker::new(zero_interval.clone()).err().unwrap();
        assert!(matches!(
            err,
            TrackerError::Config(ConfigError::InvalidValue { ref key, .. }) if key == "refresh_interval_secs"
        ));

        let provider: Arc<dyn MetalPriceProvider> =
            Arc::new(MockProvider::succeeding("primary", 150.0, 1.8));
        assert!(MetalPriceTracker::with_providers(vec![provider.clone()], &zero_interval).is_err());

        let zero_timeout = PriceConfig {
            request_timeout_secs: 0,
            ..PriceConfig::default()
        };
        assert!(matches!(
            MetalPriceTracker::new(zero_timeout.clone()).err().unwrap(),
            TrackerError::Config(ConfigError::InvalidValue { ref key, .. }) if key == "request_timeout_secs"
        ));
        assert!(MetalPriceTracker::with_providers(vec![provider], &zero_timeout).is_err());
    }
}
