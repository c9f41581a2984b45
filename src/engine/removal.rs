// Player removal, host abandonment, peer disconnects and mutual draw

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::GameService;
use crate::engine::registry::GameHandle;
use crate::errors::GameError;
use crate::models::{Game, GameState, OBSERVERS_TEAM_ID, Player, PlayerGameState};

impl GameService {
    /// Remove a player from its current game, cascading per §removal
    /// semantics: a host leaving an open lobby drains it, and an emptied
    /// game is cancelled, ended or closed depending on its state.
    pub async fn remove_player(&self, player: &Arc<Player>) -> Result<(), GameError> {
        let game_id = player
            .current_game_id()
            .await
            .ok_or(GameError::NotInAGame(player.id))?;
        let Some(handle) = self.registry.find(game_id).await else {
            // stale link to a game that already closed; release the player
            warn!(player_id = player.id, game_id, "clearing stale game link");
            let mut link = player.game_link.lock().await;
            if link.current_game == Some(game_id) {
                link.current_game = None;
                link.state = PlayerGameState::None;
                link.join_waiter = None;
            }
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        self.remove_player_from_game(&handle, &mut game, player).await
    }

    pub(crate) async fn remove_player_from_game(
        &self,
        handle: &Arc<GameHandle>,
        game: &mut Game,
        player: &Arc<Player>,
    ) -> Result<(), GameError> {
        self.detach_player(game, player).await;

        if game.state == GameState::Open && game.is_host(player.id) {
            // host left the lobby: drain everyone else as well
            let others: Vec<Arc<Player>> = game.connected_players.values().cloned().collect();
            for other in others {
                self.detach_player(game, &other).await;
            }
        }

        if game.connected_players.is_empty() {
            match game.state {
                GameState::Initializing | GameState::Open => self.cancel_game(handle, game).await,
                GameState::Playing => self.on_game_ended(handle, game).await?,
                GameState::Ended => self.close_game(handle, game).await,
                GameState::Closed => {}
            }
        } else if game.state == GameState::Playing && game.all_connected_reported_end() {
            // the leaver was the last holdout
            self.on_game_ended(handle, game).await?;
        } else {
            self.mark_dirty(game).await;
        }
        Ok(())
    }

    /// Clear the player's link, cancel a pending join future and tell the
    /// remaining peers to drop their connections to it.
    async fn detach_player(&self, game: &mut Game, player: &Arc<Player>) {
        {
            let mut link = player.game_link.lock().await;
            if link.current_game == Some(game.id) {
                link.current_game = None;
                link.state = PlayerGameState::None;
                // dropping the sender cancels a still-pending join future
                link.join_waiter = None;
            }
        }
        game.connected_players.remove(&player.id);
        let receivers: Vec<Arc<Player>> = game.connected_players.values().cloned().collect();
        if !receivers.is_empty() {
            self.gateway.disconnect_from_peer(player.id, &receivers).await;
        }
        debug!(player_id = player.id, game_id = game.id, "player removed from game");
    }

    /// Transport-level instruction: every other peer drops its connection
    /// to the target. The target stays in the game.
    pub async fn disconnect_player_from_game(
        &self,
        requester: &Arc<Player>,
        target_id: i32,
    ) -> Result<(), GameError> {
        let Some(handle) = self.current_game_handle(requester).await else {
            warn!(
                player_id = requester.id,
                target_id, "peer disconnect request without a game"
            );
            return Ok(());
        };
        let game = handle.game.lock().await;
        let receivers: Vec<Arc<Player>> = game
            .connected_players
            .values()
            .filter(|p| p.id != target_id)
            .cloned()
            .collect();
        self.gateway.disconnect_from_peer(target_id, &receivers).await;
        Ok(())
    }

    /// Accept a mutual draw. Once every connected combatant has accepted,
    /// the game is flagged as mutually drawn.
    pub async fn mutually_agree_draw(&self, player: &Arc<Player>) -> Result<(), GameError> {
        let handle = self.require_current_game(player).await?;
        let mut game = handle.game.lock().await;
        if game.state != GameState::Playing {
            return Err(GameError::InvalidGameState(game.state));
        }
        let team = game.player_stats.get(&player.id).map(|s| s.team);
        let Some(team) = team else {
            debug!(
                player_id = player.id,
                game_id = game.id,
                "draw agreement from player without stats ignored"
            );
            return Ok(());
        };
        if team == OBSERVERS_TEAM_ID {
            debug!(
                player_id = player.id,
                game_id = game.id,
                "draw agreement from observer ignored"
            );
            return Ok(());
        }

        game.mutual_draw_acceptors.insert(player.id);
        let all_accepted = game
            .connected_players
            .keys()
            .filter(|id| {
                game.player_stats
                    .get(id)
                    .is_some_and(|s| s.team != OBSERVERS_TEAM_ID)
            })
            .all(|id| game.mutual_draw_acceptors.contains(id));
        if all_accepted {
            game.mutually_agreed_draw = true;
            info!(game_id = game.id, "mutual draw agreed");
        }
        Ok(())
    }

    /// A never-launched game is cancelled: straight to CLOSED, no end
    /// processing, no rating.
    pub(crate) async fn cancel_game(&self, handle: &Arc<GameHandle>, game: &mut Game) {
        info!(game_id = game.id, state = ?game.state, "game cancelled");
        self.metrics.incr_games_cancelled();
        self.close_game(handle, game).await;
    }

    /// Close the game and drop it from the registry. A bug elsewhere must
    /// never keep a game alive, so an illegal transition is forced.
    pub(crate) async fn close_game(&self, handle: &Arc<GameHandle>, game: &mut Game) {
        if let Err(e) = game.transition_to(GameState::Closed) {
            warn!(game_id = game.id, "forcing game into CLOSED: {}", e);
            game.state = GameState::Closed;
        }
        self.registry.remove(handle.id).await;
        self.metrics.incr_games_closed();
        self.mark_dirty_now(game).await;
        info!(game_id = game.id, "game closed");
    }
}
