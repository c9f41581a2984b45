// Host-guarded option mutation, sim-mod updates and the desync counter

use serde_json::Value;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::engine::GameService;
use crate::errors::GameError;
use crate::models::{GameState, Player, VictoryCondition, options};

impl GameService {
    /// Store a global game option. Recognized keys have side effects;
    /// everything else is kept verbatim for the voters and for replays.
    pub async fn update_game_option(
        &self,
        player: &Arc<Player>,
        key: &str,
        value: Value,
    ) -> Result<(), GameError> {
        let Some(handle) = self.current_game_handle(player).await else {
            trace!(player_id = player.id, key, "game option report without a game");
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        Self::require_host(&game, player)?;

        if key == self.config.victory_condition_key {
            match VictoryCondition::parse(&value) {
                Some(condition) => game.victory_condition = condition,
                None => warn!(game_id = game.id, ?value, "unparseable victory condition"),
            }
        } else if key == options::SLOTS {
            match options::as_i64(&value) {
                Some(slots) if slots > 0 => game.max_players = slots as u32,
                _ => warn!(game_id = game.id, ?value, "unparseable slot count"),
            }
        } else if key == options::SCENARIO_FILE {
            match value.as_str().and_then(options::scenario_file_folder) {
                Some(folder) => game.map_folder_name = folder,
                None => warn!(game_id = game.id, ?value, "rejecting malformed scenario file path"),
            }
        } else if key == options::TITLE {
            if let Some(title) = value.as_str() {
                game.title = title.to_string();
            }
        }

        game.options.insert(key.to_string(), value);
        self.mark_dirty(&game).await;
        Ok(())
    }

    /// Store an option of one player's lobby slot.
    pub async fn update_player_option(
        &self,
        player: &Arc<Player>,
        target_player_id: i32,
        key: &str,
        value: Value,
    ) -> Result<(), GameError> {
        let Some(handle) = self.current_game_handle(player).await else {
            trace!(player_id = player.id, key, "player option report without a game");
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        Self::require_host(&game, player)?;
        if game.state != GameState::Open {
            return Err(GameError::InvalidGameState(game.state));
        }
        if !game.connected_players.contains_key(&target_player_id) {
            warn!(
                game_id = game.id,
                target_player_id, key, "dropping option for unknown player"
            );
            return Ok(());
        }
        game.player_options
            .entry(target_player_id)
            .or_default()
            .insert(key.to_string(), value);
        self.mark_dirty(&game).await;
        Ok(())
    }

    /// Store an option of an AI slot. Only the `Army` key survives: the
    /// other keys arrive before the AI's final name is known.
    pub async fn update_ai_option(
        &self,
        player: &Arc<Player>,
        ai_name: &str,
        key: &str,
        value: Value,
    ) -> Result<(), GameError> {
        let Some(handle) = self.current_game_handle(player).await else {
            trace!(player_id = player.id, key, "ai option report without a game");
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        Self::require_host(&game, player)?;
        if game.state != GameState::Open {
            return Err(GameError::InvalidGameState(game.state));
        }
        if key != options::ARMY {
            trace!(game_id = game.id, ai_name, key, "dropping non-army ai option");
            return Ok(());
        }
        game.ai_options
            .entry(ai_name.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.mark_dirty(&game).await;
        Ok(())
    }

    /// Clear a lobby slot: every player option bound to this start spot is
    /// dropped. AI entries are keyed by name, not slot, and stay put.
    pub async fn clear_slot(&self, player: &Arc<Player>, slot_id: i32) -> Result<(), GameError> {
        let Some(handle) = self.current_game_handle(player).await else {
            trace!(player_id = player.id, slot_id, "slot clear without a game");
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        Self::require_host(&game, player)?;
        if game.state != GameState::Open {
            return Err(GameError::InvalidGameState(game.state));
        }
        game.player_options.retain(|_, opts| {
            opts.get(options::START_SPOT)
                .and_then(options::as_i64)
                .map(|spot| spot as i32)
                != Some(slot_id)
        });
        self.mark_dirty(&game).await;
        Ok(())
    }

    /// Count a desync reported by a client.
    pub async fn report_desync(&self, player: &Arc<Player>) -> Result<(), GameError> {
        let Some(handle) = self.current_game_handle(player).await else {
            trace!(player_id = player.id, "desync report without a game");
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        game.desync_count += 1;
        trace!(game_id = game.id, desyncs = game.desync_count, "desync reported");
        Ok(())
    }

    /// Replace the sim-mod list, resolving display names on the way.
    pub async fn update_game_mods(
        &self,
        player: &Arc<Player>,
        mod_uids: Vec<String>,
    ) -> Result<(), GameError> {
        let Some(handle) = self.current_game_handle(player).await else {
            trace!(player_id = player.id, "sim mod report without a game");
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        Self::require_host(&game, player)?;
        let versions = self.mod_service.find_mod_versions_by_uids(&mod_uids).await?;
        game.sim_mods = versions;
        self.mark_dirty(&game).await;
        Ok(())
    }

    /// Clients announce the upcoming sim-mod count; zero clears the list.
    pub async fn update_game_mods_count(
        &self,
        player: &Arc<Player>,
        count: u32,
    ) -> Result<(), GameError> {
        let Some(handle) = self.current_game_handle(player).await else {
            trace!(player_id = player.id, "sim mod count report without a game");
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        Self::require_host(&game, player)?;
        if count == 0 && !game.sim_mods.is_empty() {
            game.sim_mods.clear();
            self.mark_dirty(&game).await;
        }
        Ok(())
    }

    /// Force rating updates for this game regardless of its validity.
    pub async fn enforce_rating(&self, player: &Arc<Player>) -> Result<(), GameError> {
        let handle = self.require_current_game(player).await?;
        let mut game = handle.game.lock().await;
        game.rating_enforced = true;
        warn!(game_id = game.id, player_id = player.id, "rating enforced");
        Ok(())
    }
}
