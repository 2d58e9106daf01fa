//! # Nisab Price SDK
//!
//! Live gold and silver spot prices for Nisab and Zakat calculations.
//!
//! Prices are fetched from public spot price APIs through an ordered fallback
//! chain, normalized to USD per gram, and published as a single
//! [`PriceSnapshot`]. If every provider fails, fixed estimates are published
//! with an advisory, so consumers always have numbers to work with.
//!
//! ## Usage
//!
//! ```no_run
//! use nisab_price_sdk::{
//!     zakat::{assess, LocalMetalPrices, NisabThreshold, ZakatInputs, ZakatableAssets},
//!     MetalPriceTracker, PriceConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = MetalPriceTracker::new(PriceConfig::from_env()?)?;
//! let mut updates = tracker.subscribe();
//! let refresh = tracker.start();
//!
//! let snapshot = updates.wait_for(|s| !s.is_loading).await?.clone();
//! if let Some(advisory) = &snapshot.error {
//!     println!("{}", advisory);
//! }
//!
//! let prices = LocalMetalPrices::from_snapshot(&snapshot, tracker.converter(), "INR");
//! let nisab = NisabThreshold::from_prices(&prices);
//! let inputs = ZakatInputs {
//!     assets: ZakatableAssets { cash: 900_000.0, ..Default::default() },
//!     debts: 50_000.0,
//! };
//! let assessment = assess(&inputs, &nisab);
//! println!("Zakat due: ₹{:.2}", assessment.zakat_due);
//!
//! refresh.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! MetalPriceTracker::start()
//!     ↓
//! Background task (immediately, then every 5 minutes)
//!     ↓
//! FallbackChain: FreeGoldAPI → gold-api.com → goldprice.org → estimates
//!     ↓
//! PriceStore (watch channel)
//!     ↓
//! Your code (current, subscribe, convert_currency)
//! ```
//!
//! ## Adding New Providers
//!
//! 1. Implement the `MetalPriceProvider` trait, returning USD per gram
//! 2. Pass it to `MetalPriceTracker::with_providers` in the desired position

pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod store;
pub mod tracker;
pub mod types;
pub mod units;
pub mod zakat;

// Re-export commonly used types
pub use config::{PriceConfig, ProviderKind};
pub use error::{ConfigError, ProviderError, TrackerError};
pub use metrics::ProviderMetrics;
pub use provider::MetalPriceProvider;
pub use tracker::{MetalPriceTracker, RefreshHandle};
pub use types::{ComponentHealth, HealthStatus, Metal, PriceQuote, PriceSnapshot};
pub use units::{convert_currency, oz_to_gram, CurrencyConverter, ExchangeRateTable, PremiumPolicy};
