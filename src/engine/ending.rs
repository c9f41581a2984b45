// End-of-game processing: reconciliation, validity, ratings, persistence

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

use crate::engine::registry::GameHandle;
use crate::engine::validity::VoterContext;
use crate::engine::{GameService, rating, results, validity};
use crate::errors::GameError;
use crate::models::{
    Game, GameResultMessage, GameState, Outcome, Player, PlayerResult, Validity,
};

impl GameService {
    /// Record that a player saw the match end. End processing runs once
    /// every still-connected player has reported.
    pub async fn report_game_ended(&self, player: &Arc<Player>) -> Result<(), GameError> {
        let Some(handle) = self.current_game_handle(player).await else {
            warn!(player_id = player.id, "game end report without a game");
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        self.report_game_ended_internal(&handle, &mut game, player)
            .await
    }

    pub(crate) async fn report_game_ended_internal(
        &self,
        handle: &Arc<GameHandle>,
        game: &mut Game,
        player: &Arc<Player>,
    ) -> Result<(), GameError> {
        if game.state == GameState::Ended || game.state == GameState::Closed {
            trace!(game_id = game.id, player_id = player.id, "game already ended");
            return Ok(());
        }
        if !game.game_ended_reporters.insert(player.id) {
            trace!(
                game_id = game.id,
                player_id = player.id,
                "duplicate game end report"
            );
            return Ok(());
        }
        if game.all_connected_reported_end() {
            self.on_game_ended(handle, game).await?;
        }
        Ok(())
    }

    /// Run end processing. Idempotent: a game already in ENDED is left
    /// alone. Games that never launched only change state and deregister.
    pub(crate) async fn on_game_ended(
        &self,
        handle: &Arc<GameHandle>,
        game: &mut Game,
    ) -> Result<(), GameError> {
        if game.state == GameState::Ended {
            return Ok(());
        }
        let was_playing = game.state == GameState::Playing;
        game.end_time = Some(Utc::now());
        if let Err(e) = game.transition_to(GameState::Ended) {
            // must never prevent the game from winding down
            warn!(game_id = game.id, "forcing game into ENDED: {}", e);
            game.state = GameState::Ended;
        }

        if was_playing {
            self.process_ended_game(handle, game).await?;
        }

        if game.connected_players.is_empty() {
            self.close_game(handle, game).await;
        } else {
            self.mark_dirty_now(game).await;
        }
        Ok(())
    }

    async fn process_ended_game(
        &self,
        handle: &Arc<GameHandle>,
        game: &mut Game,
    ) -> Result<(), GameError> {
        let ctx = VoterContext {
            now: Utc::now(),
            ranked_min_time_per_player_secs: self.config.ranked_min_time_per_player_secs,
            coop_required_difficulty: self.config.coop_required_difficulty,
        };
        game.validity = validity::adjudicate(game, &ctx);
        info!(game_id = game.id, validity = ?game.validity, "game ended");

        // rating updates are ordered across overlapping games
        let entry = rating::PendingRating::for_game(handle, game);
        let ready = self.rating_queue.retire_and_enqueue(entry).await;
        let (rate_current, deferred) = rating::split_ready(ready, game.id);
        if rate_current {
            rating::apply_rating(game, &self.rating_service, &self.metrics).await;
        } else {
            debug!(
                game_id = game.id,
                "rating deferred behind an overlapping predecessor"
            );
        }
        rating::spawn_deferred_ratings(
            deferred,
            self.rating_service.clone(),
            self.metrics.clone(),
        );

        if let Some(map) = &game.map {
            self.map_service.increment_times_played(map.id).await?;
        }

        let truth = results::most_reported_results(game);
        let player_results = results::player_results(game, &truth);
        let draw = truth.values().any(|r| r.outcome == Outcome::Draw);
        let score_time = Utc::now();
        for result in &player_results {
            if let Some(stats) = game.player_stats.get_mut(&result.player_id) {
                stats.score = Some(result.score);
                stats.score_time = Some(score_time);
            }
        }
        self.gateway
            .broadcast_game_result(GameResultMessage {
                game_id: game.id,
                draw,
                player_results: player_results.clone(),
            })
            .await;
        self.post_division_result(game, &player_results).await;

        self.game_repository.update(game).await?;

        for player_id in game.player_stats.keys().copied().collect::<Vec<_>>() {
            let Some(player) = self.stats_player(game, player_id).await else {
                debug!(
                    game_id = game.id,
                    player_id, "skipping army statistics of offline player"
                );
                continue;
            };
            // isolated per player: a stats failure never blocks closure
            if let Err(e) = self.army_statistics_service.process(&player, game).await {
                error!(
                    game_id = game.id,
                    player_id, "army statistics processing failed: {}", e
                );
            }
        }
        Ok(())
    }

    /// Record the 1v1 division outcome when the game qualifies.
    async fn post_division_result(&self, game: &Game, player_results: &[PlayerResult]) {
        if !game.featured_mod.ladder_1v1 {
            return;
        }
        if game.validity != Validity::Valid && !game.rating_enforced {
            return;
        }
        let [one, two] = player_results else {
            debug!(
                game_id = game.id,
                "skipping division result without exactly two player results"
            );
            return;
        };
        let winner = match (one.outcome, two.outcome) {
            (Outcome::Victory, o) if o != Outcome::Victory => Some(one.player_id),
            (o, Outcome::Victory) if o != Outcome::Victory => Some(two.player_id),
            _ => None,
        };
        if let Err(e) = self
            .division_service
            .post_result(one.player_id, two.player_id, winner)
            .await
        {
            error!(game_id = game.id, "division result update failed: {}", e);
        }
    }

    async fn stats_player(&self, game: &Game, player_id: i32) -> Option<Arc<Player>> {
        if let Some(player) = game.connected_players.get(&player_id) {
            return Some(player.clone());
        }
        self.player_directory.get_online_player(player_id).await
    }
}
