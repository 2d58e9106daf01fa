//! Provider health metrics collection and reporting
//!
//! Every provider attempt made by the fallback chain is recorded here, so a
//! provider that keeps failing over to the next one is visible even though
//! consumers only ever see a successful snapshot.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples to keep for metrics calculation
const MAX_SAMPLES: usize = 100;

/// Metrics for a single provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderMetrics {
    /// Name of the provider
    pub provider_name: String,
    /// 50th percentile latency of successful attempts, in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency of successful attempts, in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0); 1.0 before the first attempt
    pub success_rate: f64,
    /// Total number of attempts
    pub total_attempts: u64,
    /// Number of failed attempts
    pub failed_attempts: u64,
}

#[derive(Debug, Default)]
struct Samples {
    window: VecDeque<(f64, bool)>,
    total: u64,
    failed: u64,
}

/// Collects attempt outcomes for one provider
pub struct MetricsCollector {
    provider_name: String,
    samples: RwLock<Samples>,
}

impl MetricsCollector {
    pub fn new(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            samples: RwLock::new(Samples {
                window: VecDeque::with_capacity(MAX_SAMPLES),
                ..Samples::default()
            }),
        }
    }

    /// Records an attempt with its duration and outcome
    pub async fn record_attempt(&self, duration: Duration, success: bool) {
        let mut samples = self.samples.write().await;
        samples.total += 1;
        if !success {
            samples.failed += 1;
        }
        if samples.window.len() >= MAX_SAMPLES {
            samples.window.pop_front();
        }
        samples
            .window
            .push_back((duration.as_secs_f64() * 1000.0, success));
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> ProviderMetrics {
        let samples = self.samples.read().await;

        let mut latencies: Vec<f64> = samples
            .window
            .iter()
            .filter(|(_, success)| *success)
            .map(|(ms, _)| *ms)
            .collect();
        latencies.sort_by(|a, b| a.total_cmp(b));

        let success_rate = if samples.total > 0 {
            (samples.total - samples.failed) as f64 / samples.total as f64
        } else {
            1.0
        };

        ProviderMetrics {
            provider_name: self.provider_name.clone(),
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_attempts: samples.total,
            failed_attempts: samples.failed,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
