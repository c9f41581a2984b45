// Game aggregate and its lifecycle state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::errors::GameError;
use crate::models::army_result::ArmyResult;
use crate::models::enums::{GameVisibility, LobbyMode, Validity, VictoryCondition};
use crate::models::options;
use crate::models::player::Player;
use crate::models::stats::GamePlayerStats;

/// Lifecycle state of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
    /// Created; the host was told to start its game process.
    Initializing,
    /// The host reached the lobby; the game is joinable.
    Open,
    /// Launched.
    Playing,
    /// All participants reported the end of the match.
    Ended,
    /// Removed from the active registry. Terminal.
    Closed,
}

impl GameState {
    /// Whether this state may directly transition into `next`.
    pub fn can_transition_to(self, next: GameState) -> bool {
        use GameState::*;
        matches!(
            (self, next),
            (Initializing, Open)
                | (Open, Playing)
                | (Playing, Ended)
                | (Ended, Closed)
                | (Initializing, Closed)
                | (Open, Closed)
        )
    }
}

/// Featured mod record resolved at game creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedMod {
    pub id: i32,
    pub technical_name: String,
    pub display_name: String,
    /// Results of this mod may feed ratings.
    pub ranked: bool,
    pub coop: bool,
    pub ladder_1v1: bool,
}

/// Map version record resolved at game creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapVersion {
    pub id: i32,
    pub folder_name: String,
    pub ranked: bool,
}

/// One entry of the sim-mod list advertised to lobby browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimModVersion {
    pub uid: String,
    pub display_name: String,
}

/// One active match.
///
/// Mutated only under the serialization token of its [`GameHandle`]
/// (`crate::engine::registry`); every field is therefore plain data.
#[derive(Debug)]
pub struct Game {
    pub id: i32,
    pub title: String,
    pub password: Option<String>,
    pub visibility: GameVisibility,
    pub featured_mod: FeaturedMod,
    pub featured_mod_file_versions: HashMap<String, i32>,
    pub map: Option<MapVersion>,
    pub map_folder_name: String,
    pub min_rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub max_players: u32,
    pub lobby_mode: LobbyMode,
    pub victory_condition: VictoryCondition,
    pub host: Arc<Player>,
    pub state: GameState,
    pub validity: Validity,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub desync_count: u32,
    pub rating_enforced: bool,
    pub mutually_agreed_draw: bool,
    pub preset_participants: Option<Vec<i32>>,

    pub options: HashMap<String, Value>,
    pub player_options: HashMap<i32, HashMap<String, Value>>,
    pub ai_options: HashMap<String, HashMap<String, Value>>,
    pub sim_mods: Vec<SimModVersion>,
    pub connected_players: HashMap<i32, Arc<Player>>,
    pub player_stats: HashMap<i32, GamePlayerStats>,
    pub reported_army_results: HashMap<i32, HashMap<i32, ArmyResult>>,
    /// Reporter ids in first-report order; fixes most-reported tie-breaks.
    pub reporter_order: Vec<i32>,
    pub mutual_draw_acceptors: HashSet<i32>,
    pub game_ended_reporters: HashSet<i32>,
    /// Raw army statistics blob last uploaded by a client, consumed by
    /// the army statistics collaborator during end processing.
    pub army_statistics: Option<Value>,
}

pub struct NewGame {
    pub id: i32,
    pub title: String,
    pub password: Option<String>,
    pub visibility: GameVisibility,
    pub featured_mod: FeaturedMod,
    pub featured_mod_file_versions: HashMap<String, i32>,
    pub map: Option<MapVersion>,
    pub map_folder_name: String,
    pub min_rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub lobby_mode: LobbyMode,
    pub host: Arc<Player>,
    pub preset_participants: Option<Vec<i32>>,
}

impl Game {
    pub fn new(params: NewGame) -> Self {
        Self {
            id: params.id,
            title: params.title,
            password: params.password,
            visibility: params.visibility,
            featured_mod: params.featured_mod,
            featured_mod_file_versions: params.featured_mod_file_versions,
            map: params.map,
            map_folder_name: params.map_folder_name,
            min_rating: params.min_rating,
            max_rating: params.max_rating,
            max_players: 12,
            lobby_mode: params.lobby_mode,
            victory_condition: VictoryCondition::Demoralization,
            host: params.host,
            state: GameState::Initializing,
            validity: Validity::Valid,
            start_time: None,
            end_time: None,
            desync_count: 0,
            rating_enforced: false,
            mutually_agreed_draw: false,
            preset_participants: params.preset_participants,
            options: HashMap::new(),
            player_options: HashMap::new(),
            ai_options: HashMap::new(),
            sim_mods: Vec::new(),
            connected_players: HashMap::new(),
            player_stats: HashMap::new(),
            reported_army_results: HashMap::new(),
            reporter_order: Vec::new(),
            mutual_draw_acceptors: HashSet::new(),
            game_ended_reporters: HashSet::new(),
            army_statistics: None,
        }
    }

    /// Move the game into `next`, rejecting transitions outside the
    /// documented lifecycle.
    pub fn transition_to(&mut self, next: GameState) -> Result<(), GameError> {
        if !self.state.can_transition_to(next) {
            return Err(GameError::InvalidGameState(self.state));
        }
        self.state = next;
        Ok(())
    }

    pub fn is_host(&self, player_id: i32) -> bool {
        self.host.id == player_id
    }

    /// The army a player occupies, from its `Army` player option.
    pub fn army_of(&self, player_id: i32) -> Option<i32> {
        self.player_options
            .get(&player_id)
            .and_then(|opts| opts.get(options::ARMY))
            .and_then(options::as_i64)
            .map(|a| a as i32)
    }

    /// An army id is known iff some player or AI occupies it.
    pub fn is_known_army(&self, army: i32) -> bool {
        let player_armies = self
            .player_options
            .values()
            .filter_map(|opts| opts.get(options::ARMY))
            .filter_map(options::as_i64);
        let ai_armies = self
            .ai_options
            .values()
            .filter_map(|opts| opts.get(options::ARMY))
            .filter_map(options::as_i64);
        player_armies.chain(ai_armies).any(|a| a as i32 == army)
    }

    /// Whether every currently connected player has reported game end.
    pub fn all_connected_reported_end(&self) -> bool {
        !self.connected_players.is_empty()
            && self
                .connected_players
                .keys()
                .all(|id| self.game_ended_reporters.contains(id))
    }
}
