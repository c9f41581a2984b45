// Outbound messages built by the engine for the client channel

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::army_result::Outcome;
use crate::models::enums::{GameVisibility, NO_TEAM_ID};
use crate::models::game::{Game, GameState, SimModVersion};
use crate::models::options;

/// Snapshot of one game as shown in lobby browsers.
///
/// Carries a password-presence flag, never the password itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfoMessage {
    pub id: i32,
    pub title: String,
    pub visibility: GameVisibility,
    pub password_protected: bool,
    pub state: GameState,
    pub featured_mod: String,
    pub featured_mod_file_versions: HashMap<String, i32>,
    pub sim_mods: Vec<SimModVersion>,
    pub map_folder_name: String,
    pub host: String,
    pub players: Vec<GameInfoPlayer>,
    pub max_players: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub min_rating: Option<i32>,
    pub max_rating: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfoPlayer {
    pub id: i32,
    pub login: String,
    pub team: i32,
}

impl GameInfoMessage {
    pub fn from_game(game: &Game) -> Self {
        let players = game
            .connected_players
            .values()
            .map(|player| GameInfoPlayer {
                id: player.id,
                login: player.login.clone(),
                team: game
                    .player_options
                    .get(&player.id)
                    .and_then(|opts| opts.get(options::TEAM))
                    .and_then(options::as_i64)
                    .map(|t| t as i32)
                    .or_else(|| game.player_stats.get(&player.id).map(|s| s.team))
                    .unwrap_or(NO_TEAM_ID),
            })
            .collect();

        Self {
            id: game.id,
            title: game.title.clone(),
            visibility: game.visibility,
            password_protected: game.password.is_some(),
            state: game.state,
            featured_mod: game.featured_mod.technical_name.clone(),
            featured_mod_file_versions: game.featured_mod_file_versions.clone(),
            sim_mods: game.sim_mods.clone(),
            map_folder_name: game.map_folder_name.clone(),
            host: game.host.login.clone(),
            players,
            max_players: game.max_players,
            start_time: game.start_time,
            min_rating: game.min_rating,
            max_rating: game.max_rating,
        }
    }
}

/// Result of one player, derived from the most-reported army results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResult {
    pub player_id: i32,
    pub outcome: Outcome,
    pub score: i32,
}

/// Final verdict of a finished game, broadcast to all viewers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResultMessage {
    pub game_id: i32,
    /// True iff any surviving army result was a draw.
    pub draw: bool,
    pub player_results: Vec<PlayerResult>,
}
