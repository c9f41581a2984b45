// Lock-free engine counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by the engine as observable side effects.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    games_created: AtomicU64,
    games_closed: AtomicU64,
    games_cancelled: AtomicU64,
    rating_updates: AtomicU64,
    snapshots_flushed: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr_games_created(&self) {
        self.games_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_games_closed(&self) {
        self.games_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_games_cancelled(&self) {
        self.games_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_rating_updates(&self) {
        self.rating_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_snapshots_flushed(&self) {
        self.snapshots_flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn games_created(&self) -> u64 {
        self.games_created.load(Ordering::Relaxed)
    }

    pub fn games_closed(&self) -> u64 {
        self.games_closed.load(Ordering::Relaxed)
    }

    pub fn games_cancelled(&self) -> u64 {
        self.games_cancelled.load(Ordering::Relaxed)
    }

    pub fn rating_updates(&self) -> u64 {
        self.rating_updates.load(Ordering::Relaxed)
    }

    pub fn snapshots_flushed(&self) -> u64 {
        self.snapshots_flushed.load(Ordering::Relaxed)
    }
}
