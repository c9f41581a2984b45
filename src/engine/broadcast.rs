// Debounced fan-out of game snapshots to connected viewers

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, interval};

use crate::metrics::EngineMetrics;
use crate::models::GameInfoMessage;
use crate::ports::ClientGateway;

struct PendingSnapshot {
    first_marked: Instant,
    last_marked: Instant,
    min_delay: Duration,
    max_delay: Duration,
    snapshot: GameInfoMessage,
}

struct BroadcasterInner {
    pending: Mutex<HashMap<i32, PendingSnapshot>>,
    gateway: Arc<dyn ClientGateway>,
    metrics: Arc<EngineMetrics>,
}

/// Coalesces dirty marks per game id.
///
/// Marks arriving within the delay window aggregate last-write-wins; a
/// zero min and max delay bypasses the queue entirely. The flush task
/// stops by itself once the broadcaster is dropped.
pub struct GameBroadcaster {
    inner: Arc<BroadcasterInner>,
}

impl GameBroadcaster {
    pub fn start(
        gateway: Arc<dyn ClientGateway>,
        metrics: Arc<EngineMetrics>,
        flush_interval: Duration,
    ) -> Self {
        let inner = Arc::new(BroadcasterInner {
            pending: Mutex::new(HashMap::new()),
            gateway,
            metrics,
        });

        tokio::spawn(flush_loop(Arc::downgrade(&inner), flush_interval));

        Self { inner }
    }

    /// Record a dirty mark for the snapshot's game.
    ///
    /// The latest snapshot wins; the flush happens once the game has been
    /// quiet for `min_delay` or has been dirty for `max_delay` overall.
    pub async fn mark_dirty(
        &self,
        snapshot: GameInfoMessage,
        min_delay: Duration,
        max_delay: Duration,
    ) {
        if min_delay.is_zero() && max_delay.is_zero() {
            self.inner.pending.lock().await.remove(&snapshot.id);
            self.inner.gateway.broadcast_game_info(snapshot).await;
            self.inner.metrics.incr_snapshots_flushed();
            return;
        }

        let now = Instant::now();
        let mut pending = self.inner.pending.lock().await;
        pending
            .entry(snapshot.id)
            .and_modify(|entry| {
                entry.last_marked = now;
                entry.min_delay = min_delay;
                entry.max_delay = max_delay;
                entry.snapshot = snapshot.clone();
            })
            .or_insert_with(|| PendingSnapshot {
                first_marked: now,
                last_marked: now,
                min_delay,
                max_delay,
                snapshot,
            });
    }
}

async fn flush_loop(inner: Weak<BroadcasterInner>, flush_interval: Duration) {
    let mut ticker = interval(flush_interval);
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            return;
        };

        let now = Instant::now();
        let due: Vec<GameInfoMessage> = {
            let mut pending = inner.pending.lock().await;
            let due_ids: Vec<i32> = pending
                .iter()
                .filter(|(_, entry)| {
                    now.duration_since(entry.last_marked) >= entry.min_delay
                        || now.duration_since(entry.first_marked) >= entry.max_delay
                })
                .map(|(id, _)| *id)
                .collect();
            due_ids
                .into_iter()
                .filter_map(|id| pending.remove(&id))
                .map(|entry| entry.snapshot)
                .collect()
        };

        for snapshot in due {
            inner.gateway.broadcast_game_info(snapshot).await;
            inner.metrics.incr_snapshots_flushed();
        }
    }
}
