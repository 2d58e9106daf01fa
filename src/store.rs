//! Latest-snapshot store with subscription
//!
//! Backed by a tokio watch channel: one writer (the refresh task), any number
//! of readers. Every publish replaces the whole snapshot.

use crate::types::PriceSnapshot;
use tokio::sync::watch;

/// In-memory holder of the live [`PriceSnapshot`]
pub struct PriceStore {
    tx: watch::Sender<PriceSnapshot>,
}

impl PriceStore {
    /// Creates a store holding the loading snapshot
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PriceSnapshot::loading());
        Self { tx }
    }

    /// Returns a copy of the live snapshot
    pub fn current(&self) -> PriceSnapshot {
        self.tx.borrow().clone()
    }

    /// Subscribes to snapshot replacements
    ///
    /// The receiver starts out holding the current snapshot.
    pub fn subscribe(&self) -> watch::Receiver<PriceSnapshot> {
        self.tx.subscribe()
    }

    /// Replaces the live snapshot
    pub fn publish(&self, snapshot: PriceSnapshot) {
        tracing::debug!(
            source = %snapshot.source,
            gold_per_gram = snapshot.gold_per_gram,
            silver_per_gram = snapshot.silver_per_gram,
            degraded = snapshot.error.is_some(),
            "Publishing price snapshot"
        );
        self.tx.send_replace(snapshot);
    }

    /// Keeps the current prices but marks them as no longer live
    pub fn degrade(&self, advisory: String) {
        tracing::debug!(advisory = %advisory, "Keeping last known prices");
        self.tx.send_modify(|snapshot| {
            snapshot.is_loading = false;
            snapshot.error = Some(advisory);
        });
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PriceStore {
    fn default() -> Self {
        Self::new()
    }
}
