// Serializes rating updates across overlapping games

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::engine::registry::GameHandle;
use crate::metrics::EngineMetrics;
use crate::models::{Game, NO_TEAM_ID, RatingType, Validity};
use crate::ports::RatingService;

/// A finished game waiting for its rating update.
#[derive(Clone)]
pub(crate) struct PendingRating {
    pub handle: Arc<GameHandle>,
    pub game_id: i32,
    pub start_time: DateTime<Utc>,
    pub participants: HashSet<i32>,
}

impl PendingRating {
    pub fn for_game(handle: &Arc<GameHandle>, game: &Game) -> Self {
        Self {
            handle: handle.clone(),
            game_id: game.id,
            start_time: game.start_time.unwrap_or_else(Utc::now),
            participants: game.player_stats.keys().copied().collect(),
        }
    }
}

struct PlayingGame {
    start_time: DateTime<Utc>,
    participants: HashSet<i32>,
}

struct QueueState {
    pending: Vec<PendingRating>,
    playing: HashMap<i32, PlayingGame>,
}

/// Pending-rating queue plus an index of currently playing games.
///
/// A pending game stays queued while a rating-dependent predecessor — an
/// earlier-started game sharing a player that is still playing, or still
/// queued itself — exists. Retiring a game and enqueueing it is one
/// atomic step so a drain can never observe the gap between the two.
pub(crate) struct RatingQueue {
    state: Mutex<QueueState>,
}

impl RatingQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: Vec::new(),
                playing: HashMap::new(),
            }),
        }
    }

    /// Register a game that entered PLAYING.
    pub async fn mark_playing(
        &self,
        game_id: i32,
        start_time: DateTime<Utc>,
        participants: HashSet<i32>,
    ) {
        let mut state = self.state.lock().await;
        state.playing.insert(
            game_id,
            PlayingGame {
                start_time,
                participants,
            },
        );
    }

    /// Atomically retire `entry`'s game from the playing index, enqueue
    /// it, and drain every entry that became ready, in start-time order.
    pub async fn retire_and_enqueue(&self, entry: PendingRating) -> Vec<PendingRating> {
        let mut state = self.state.lock().await;
        state.playing.remove(&entry.game_id);
        if state.pending.iter().all(|e| e.game_id != entry.game_id) {
            state.pending.push(entry);
        }
        state.pending.sort_by_key(|e| e.start_time);

        let mut ready = Vec::new();
        loop {
            let Some(position) = state
                .pending
                .iter()
                .position(|e| !is_blocked(e, &state.pending, &state.playing))
            else {
                break;
            };
            ready.push(state.pending.remove(position));
        }
        ready
    }

    #[cfg(test)]
    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }
}

fn is_blocked(
    entry: &PendingRating,
    pending: &[PendingRating],
    playing: &HashMap<i32, PlayingGame>,
) -> bool {
    let playing_predecessor = playing.values().any(|p| {
        p.start_time < entry.start_time && !p.participants.is_disjoint(&entry.participants)
    });
    let queued_predecessor = pending.iter().any(|other| {
        other.game_id != entry.game_id
            && other.start_time < entry.start_time
            && !other.participants.is_disjoint(&entry.participants)
    });
    playing_predecessor || queued_predecessor
}

/// Apply the rating update of one finished game, honoring validity and
/// the enforced-rating override.
pub(crate) async fn apply_rating(
    game: &Game,
    rating_service: &Arc<dyn RatingService>,
    metrics: &Arc<EngineMetrics>,
) {
    if game.validity != Validity::Valid && !game.rating_enforced {
        debug!(
            game_id = game.id,
            validity = ?game.validity,
            "skipping rating update of non-rankable game"
        );
        return;
    }

    let rating_type = if game.featured_mod.ladder_1v1 {
        RatingType::Ladder1v1
    } else {
        RatingType::Global
    };
    let stats: Vec<_> = game.player_stats.values().cloned().collect();
    match rating_service
        .update_ratings(&stats, NO_TEAM_ID, rating_type)
        .await
    {
        Ok(()) => metrics.incr_rating_updates(),
        Err(e) => error!(game_id = game.id, "rating update failed: {}", e),
    }
}

/// Apply deferred rating updates on their own task, preserving order.
///
/// Entries other than the game currently holding its own lock are rated
/// here so lock acquisition stays single-game at a time.
pub(crate) fn spawn_deferred_ratings(
    entries: Vec<PendingRating>,
    rating_service: Arc<dyn RatingService>,
    metrics: Arc<EngineMetrics>,
) {
    if entries.is_empty() {
        return;
    }
    tokio::spawn(async move {
        for entry in entries {
            let game = entry.handle.game.lock().await;
            apply_rating(&game, &rating_service, &metrics).await;
        }
    });
}

/// Sanity guard: a drain may only hand back other games after the one
/// being retired, never before it.
pub(crate) fn split_ready(
    ready: Vec<PendingRating>,
    current_id: i32,
) -> (bool, Vec<PendingRating>) {
    let mut rate_current = false;
    let mut deferred = Vec::new();
    for entry in ready {
        if entry.game_id == current_id {
            rate_current = true;
        } else {
            if !rate_current && deferred.is_empty() {
                warn!(
                    game_id = entry.game_id,
                    "pending rating drained ahead of the retiring game"
                );
            }
            deferred.push(entry);
        }
    }
    (rate_current, deferred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::models::game::{FeaturedMod, NewGame};
    use crate::models::{GameVisibility, LobbyMode, Player};

    fn handle(id: i32) -> Arc<GameHandle> {
        let host = Arc::new(Player::new(1000 + id, format!("host{id}")));
        GameHandle::new(Game::new(NewGame {
            id,
            title: format!("game {id}"),
            password: None,
            visibility: GameVisibility::Public,
            featured_mod: FeaturedMod {
                id: 1,
                technical_name: "faf".to_string(),
                display_name: "FAF".to_string(),
                ranked: true,
                coop: false,
                ladder_1v1: false,
            },
            featured_mod_file_versions: HashMap::new(),
            map: None,
            map_folder_name: "scmp_001".to_string(),
            min_rating: None,
            max_rating: None,
            lobby_mode: LobbyMode::Default,
            host,
            preset_participants: None,
        }))
    }

    fn entry(id: i32, start_secs: i64, participants: &[i32]) -> PendingRating {
        PendingRating {
            handle: handle(id),
            game_id: id,
            start_time: Utc.timestamp_opt(start_secs, 0).unwrap(),
            participants: participants.iter().copied().collect(),
        }
    }

    #[tokio::test]
    async fn test_game_without_predecessor_drains_immediately() {
        let queue = RatingQueue::new();
        let ready = queue.retire_and_enqueue(entry(1, 100, &[1, 2])).await;
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].game_id, 1);
        assert_eq!(queue.pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_playing_predecessor_blocks_shared_player() {
        let queue = RatingQueue::new();
        queue
            .mark_playing(1, Utc.timestamp_opt(100, 0).unwrap(), [7, 8].into())
            .await;

        // game 2 started later and shares player 7 with playing game 1
        let ready = queue.retire_and_enqueue(entry(2, 200, &[7, 9])).await;
        assert!(ready.is_empty());
        assert_eq!(queue.pending_len().await, 1);

        // once game 1 retires, both drain in start-time order
        let ready = queue.retire_and_enqueue(entry(1, 100, &[7, 8])).await;
        let ids: Vec<i32> = ready.iter().map(|e| e.game_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_disjoint_games_never_block_each_other() {
        let queue = RatingQueue::new();
        queue
            .mark_playing(1, Utc.timestamp_opt(100, 0).unwrap(), [1, 2].into())
            .await;

        let ready = queue.retire_and_enqueue(entry(2, 200, &[3, 4])).await;
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].game_id, 2);
    }

    #[tokio::test]
    async fn test_chain_of_predecessors_drains_in_start_order() {
        let queue = RatingQueue::new();
        queue
            .mark_playing(1, Utc.timestamp_opt(100, 0).unwrap(), [1].into())
            .await;
        queue
            .mark_playing(2, Utc.timestamp_opt(200, 0).unwrap(), [1, 2].into())
            .await;

        assert!(
            queue
                .retire_and_enqueue(entry(3, 300, &[2]))
                .await
                .is_empty()
        );
        assert!(
            queue
                .retire_and_enqueue(entry(2, 200, &[1, 2]))
                .await
                .is_empty()
        );

        let ready = queue.retire_and_enqueue(entry(1, 100, &[1])).await;
        let ids: Vec<i32> = ready.iter().map(|e| e.game_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_split_ready_partitions_current_and_deferred() {
        let ready = vec![entry(1, 100, &[1]), entry(2, 200, &[1])];
        let (rate_current, deferred) = split_ready(ready, 1);
        assert!(rate_current);
        assert_eq!(deferred.len(), 1);
        assert_eq!(deferred[0].game_id, 2);
    }
}
