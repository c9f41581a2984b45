// Game creation, joining and the player-reported state transitions

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

use crate::engine::registry::GameHandle;
use crate::engine::{GameFuture, GameService};
use crate::errors::GameError;
use crate::models::{
    Game, GamePlayerStats, GameState, GameVisibility, LobbyMode, NO_TEAM_ID, NewGame, Player,
    PlayerGameState, Rating, options,
};

impl GameService {
    /// Open a new game with the caller as host.
    ///
    /// The returned future resolves once the host's client reaches the
    /// lobby and the game goes OPEN.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_game(
        &self,
        title: String,
        featured_mod_name: &str,
        map_folder_name: &str,
        password: Option<String>,
        visibility: GameVisibility,
        min_rating: Option<i32>,
        max_rating: Option<i32>,
        player: &Arc<Player>,
        lobby_mode: LobbyMode,
        preset_participants: Option<Vec<i32>>,
    ) -> Result<GameFuture, GameError> {
        self.release_orphaned_game(player).await?;

        let featured_mod = self
            .mod_service
            .get_featured_mod(featured_mod_name)
            .await?
            .ok_or_else(|| GameError::InvalidFeaturedMod(featured_mod_name.to_string()))?;
        let featured_mod_file_versions = self
            .mod_service
            .get_latest_file_versions(&featured_mod)
            .await?;
        let map = self.map_service.find_map(map_folder_name).await?;

        let id = self.registry.allocate_id();
        let game = Game::new(NewGame {
            id,
            title,
            password,
            visibility,
            featured_mod,
            featured_mod_file_versions,
            map,
            map_folder_name: map_folder_name.to_string(),
            min_rating,
            max_rating,
            lobby_mode,
            host: player.clone(),
            preset_participants,
        });
        let handle = GameHandle::new(game);
        self.registry.insert(handle.clone()).await;
        self.metrics.incr_games_created();
        info!(game_id = id, host_id = player.id, "game created");

        {
            let game = handle.game.lock().await;
            self.gateway.start_game_process(&game, player).await;
            self.mark_dirty_now(&game).await;
        }

        self.attach_pending(player, id).await
    }

    /// Join an open game. The returned future resolves once the joining
    /// player's client reaches the lobby.
    pub async fn join_game(
        &self,
        game_id: i32,
        password: Option<&str>,
        player: &Arc<Player>,
    ) -> Result<GameFuture, GameError> {
        if player.current_game_id().await.is_some() {
            return Err(GameError::AlreadyInGame(player.id));
        }
        let handle = self
            .registry
            .find(game_id)
            .await
            .ok_or(GameError::NoSuchGame(game_id))?;
        {
            let game = handle.game.lock().await;
            if game.state != GameState::Open {
                return Err(GameError::GameNotJoinable {
                    id: game_id,
                    state: game.state,
                });
            }
            if let Some(expected) = &game.password {
                if password != Some(expected.as_str()) {
                    return Err(GameError::InvalidPassword);
                }
            }
            self.gateway.start_game_process(&game, player).await;
        }

        self.attach_pending(player, game_id).await
    }

    /// Dispatch a player-reported game state.
    pub async fn update_player_game_state(
        &self,
        new_state: PlayerGameState,
        player: &Arc<Player>,
    ) -> Result<(), GameError> {
        if new_state == PlayerGameState::Idle {
            trace!(player_id = player.id, "ignoring idle game state report");
            return Ok(());
        }
        let game_id = player
            .current_game_id()
            .await
            .ok_or(GameError::NotInAGame(player.id))?;
        let Some(handle) = self.registry.find(game_id).await else {
            warn!(
                player_id = player.id,
                game_id, "game state report for a game no longer in the registry"
            );
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        self.transition_player(player, new_state).await?;
        debug!(player_id = player.id, game_id, state = ?new_state, "player game state updated");

        match new_state {
            PlayerGameState::Lobby => self.on_player_lobby(&handle, &mut game, player).await,
            PlayerGameState::Launching => self.on_player_launching(&mut game, player).await,
            PlayerGameState::Ended => {
                self.report_game_ended_internal(&handle, &mut game, player)
                    .await
            }
            PlayerGameState::Closed => {
                self.remove_player_from_game(&handle, &mut game, player).await
            }
            _ => Ok(()),
        }
    }

    /// Reattach a disconnected participant to its running game.
    pub async fn restore_game_session(
        &self,
        player: &Arc<Player>,
        game_id: i32,
    ) -> Result<Arc<GameHandle>, GameError> {
        if player.current_game_id().await.is_some() {
            return Err(GameError::AlreadyInGame(player.id));
        }
        let handle = self
            .registry
            .find(game_id)
            .await
            .ok_or(GameError::CantRestoreGameDoesntExist(game_id))?;
        let mut game = handle.game.lock().await;
        if game.state != GameState::Open && game.state != GameState::Playing {
            return Err(GameError::CantRestoreGameDoesntExist(game_id));
        }
        if game.state == GameState::Playing && !game.player_stats.contains_key(&player.id) {
            return Err(GameError::CantRestoreGameNotParticipant {
                game_id,
                player_id: player.id,
            });
        }

        {
            let mut link = player.game_link.lock().await;
            link.current_game = Some(game_id);
        }
        game.connected_players.insert(player.id, player.clone());

        self.transition_player(player, PlayerGameState::Initializing)
            .await?;
        self.transition_player(player, PlayerGameState::Lobby).await?;
        if game.state == GameState::Playing {
            self.transition_player(player, PlayerGameState::Launching)
                .await?;
        }
        info!(player_id = player.id, game_id, "game session restored");
        self.mark_dirty_now(&game).await;
        Ok(handle.clone())
    }

    /// The caller reached the lobby: wire the peer mesh and complete the
    /// pending join future.
    async fn on_player_lobby(
        &self,
        handle: &Arc<GameHandle>,
        game: &mut Game,
        player: &Arc<Player>,
    ) -> Result<(), GameError> {
        if game.is_host(player.id) {
            game.transition_to(GameState::Open)?;
            self.gateway.host_game(game, player).await;
        } else {
            self.gateway.connect_to_host(player, game).await;
            for peer in game.connected_players.values() {
                if peer.id == game.host.id || peer.id == player.id {
                    continue;
                }
                self.gateway.connect_to_peer(player, peer, true).await;
                self.gateway.connect_to_peer(peer, player, false).await;
            }
        }
        game.connected_players.insert(player.id, player.clone());

        if game.featured_mod.ladder_1v1 {
            self.rating_service.init_ladder1v1_rating(player).await;
        } else {
            self.rating_service.init_global_rating(player).await;
        }

        let waiter = player.game_link.lock().await.join_waiter.take();
        if let Some(waiter) = waiter {
            let _ = waiter.send(handle.clone());
        }
        self.mark_dirty_now(game).await;
        Ok(())
    }

    /// The host launched: the game goes PLAYING and is persisted.
    async fn on_player_launching(
        &self,
        game: &mut Game,
        player: &Arc<Player>,
    ) -> Result<(), GameError> {
        if !game.is_host(player.id) {
            return Ok(());
        }
        game.transition_to(GameState::Playing)?;
        let start_time = Utc::now();
        game.start_time = Some(start_time);
        self.build_player_stats(game).await;
        self.rating_queue
            .mark_playing(
                game.id,
                start_time,
                game.player_stats.keys().copied().collect(),
            )
            .await;
        self.game_repository.insert(game).await?;
        info!(game_id = game.id, "game launched");
        self.mark_dirty_now(game).await;
        Ok(())
    }

    /// Snapshot each connected player's options and rating into the
    /// per-game statistics records.
    async fn build_player_stats(&self, game: &mut Game) {
        let players: Vec<Arc<Player>> = game.connected_players.values().cloned().collect();
        for player in players {
            let read_option = |key: &str, default: i32| -> i32 {
                game.player_options
                    .get(&player.id)
                    .and_then(|opts| opts.get(key))
                    .and_then(options::as_i64)
                    .map(|v| v as i32)
                    .unwrap_or(default)
            };
            let team = read_option(options::TEAM, NO_TEAM_ID);
            let faction = read_option(options::FACTION, 0);
            let color = read_option(options::COLOR, 0);
            let start_spot = read_option(options::START_SPOT, 0);

            let ratings = player.ratings.lock().await;
            let rating = if game.featured_mod.ladder_1v1 {
                ratings.ladder1v1
            } else {
                ratings.global
            }
            .unwrap_or(Rating::default());
            drop(ratings);

            game.player_stats.insert(
                player.id,
                GamePlayerStats {
                    player_id: player.id,
                    team,
                    faction,
                    color,
                    start_spot,
                    mean: rating.mean,
                    deviation: rating.deviation,
                    score: None,
                    score_time: None,
                },
            );
        }
    }

    /// Point the player at `game_id` and hand back the join future.
    async fn attach_pending(
        &self,
        player: &Arc<Player>,
        game_id: i32,
    ) -> Result<GameFuture, GameError> {
        let mut link = player.game_link.lock().await;
        if !PlayerGameState::Initializing.can_follow(link.state) {
            return Err(GameError::InvalidPlayerGameStateTransition {
                from: link.state,
                to: PlayerGameState::Initializing,
            });
        }
        link.state = PlayerGameState::Initializing;
        link.current_game = Some(game_id);
        let (sender, receiver) = oneshot::channel();
        link.join_waiter = Some(sender);
        Ok(receiver)
    }

    /// `create_game` treats a current game stuck in INITIALIZING as an
    /// orphaned prior attempt and releases the caller from it first.
    async fn release_orphaned_game(&self, player: &Arc<Player>) -> Result<(), GameError> {
        let Some(game_id) = player.current_game_id().await else {
            return Ok(());
        };
        let Some(handle) = self.registry.find(game_id).await else {
            // stale link to an already closed game
            let mut link = player.game_link.lock().await;
            if link.current_game == Some(game_id) {
                link.current_game = None;
                link.state = PlayerGameState::None;
                link.join_waiter = None;
            }
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        if game.state != GameState::Initializing {
            return Err(GameError::AlreadyInGame(player.id));
        }
        warn!(
            player_id = player.id,
            game_id, "releasing player from orphaned initializing game"
        );
        self.remove_player_from_game(&handle, &mut game, player).await
    }
}
