//! Contracts the engine consumes from the rest of the service.
//!
//! Transport, storage, identity, rating math and statistics processing
//! all live behind these seams; the engine only drives them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::GameError;
use crate::models::{
    FeaturedMod, Game, GameInfoMessage, GamePlayerStats, GameResultMessage, MapVersion, Player,
    RatingType, SimModVersion, Validity,
};

/// Commands sent to connected game clients.
///
/// Dispatch failures are the gateway's problem; the engine fires and
/// forgets.
#[async_trait]
pub trait ClientGateway: Send + Sync {
    /// Tell a client to start its local game process for `game`.
    async fn start_game_process(&self, game: &Game, player: &Player);

    /// Tell the host's client to open its lobby listening port.
    async fn host_game(&self, game: &Game, host: &Player);

    /// Tell a joining client to connect to the game's host.
    async fn connect_to_host(&self, player: &Player, game: &Game);

    /// Tell `from` to establish a peer connection to `to`. The offerer
    /// side initiates; the other side accepts.
    async fn connect_to_peer(&self, from: &Player, to: &Player, offerer: bool);

    /// Tell every receiver to drop its peer connection to `target_id`.
    async fn disconnect_from_peer(&self, target_id: i32, receivers: &[Arc<Player>]);

    /// Push a full game list to one recipient.
    async fn send_game_list(&self, games: Vec<GameInfoMessage>, recipient: &Player);

    /// Announce the reconciled result of a finished game.
    async fn broadcast_game_result(&self, message: GameResultMessage);

    /// Fan a coalesced game snapshot out to all viewers.
    async fn broadcast_game_info(&self, snapshot: GameInfoMessage);
}

/// Durable game storage.
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Largest game id ever persisted; seeds the id counter at startup.
    async fn find_max_id(&self) -> Result<i32, GameError>;

    /// Persist a newly launched game (the id is already assigned).
    async fn insert(&self, game: &Game) -> Result<(), GameError>;

    /// Update a persisted game after end processing.
    async fn update(&self, game: &Game) -> Result<(), GameError>;

    /// Mark games left unfinished by a previous process with `validity`.
    async fn update_unfinished_games_validity(&self, validity: Validity)
    -> Result<(), GameError>;
}

/// Map metadata lookup.
#[async_trait]
pub trait MapService: Send + Sync {
    async fn find_map(&self, folder_name: &str) -> Result<Option<MapVersion>, GameError>;

    async fn increment_times_played(&self, map_id: i32) -> Result<(), GameError>;
}

/// Featured-mod and sim-mod metadata lookup.
#[async_trait]
pub trait ModService: Send + Sync {
    async fn get_featured_mod(
        &self,
        technical_name: &str,
    ) -> Result<Option<FeaturedMod>, GameError>;

    async fn find_mod_versions_by_uids(
        &self,
        uids: &[String],
    ) -> Result<Vec<SimModVersion>, GameError>;

    async fn get_latest_file_versions(
        &self,
        featured_mod: &FeaturedMod,
    ) -> Result<HashMap<String, i32>, GameError>;
}

/// Rating math. The engine decides *when* and *in which order* ratings
/// are applied; the collaborator owns the math.
#[async_trait]
pub trait RatingService: Send + Sync {
    async fn update_ratings(
        &self,
        stats: &[GamePlayerStats],
        no_team_id: i32,
        rating_type: RatingType,
    ) -> Result<(), GameError>;

    /// Ensure the player's global rating bucket is initialized.
    async fn init_global_rating(&self, player: &Player);

    /// Ensure the player's ladder-1v1 rating bucket is initialized.
    async fn init_ladder1v1_rating(&self, player: &Player);
}

/// Post-game per-army statistics processing.
#[async_trait]
pub trait ArmyStatisticsService: Send + Sync {
    async fn process(&self, player: &Player, game: &Game) -> Result<(), GameError>;
}

/// Division/ladder scoring bookkeeping.
#[async_trait]
pub trait DivisionService: Send + Sync {
    /// Record a 1v1 outcome; `winner` is `None` for a draw.
    async fn post_result(
        &self,
        player_one: i32,
        player_two: i32,
        winner: Option<i32>,
    ) -> Result<(), GameError>;
}

/// Directory of currently online players.
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    async fn get_online_player(&self, id: i32) -> Option<Arc<Player>>;
}
