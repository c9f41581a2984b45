//! The game session engine.
//!
//! One [`GameService`] exists per process. It owns the active-game
//! registry, the rating-pending queue and the snapshot broadcaster, and
//! drives every collaborator behind the `ports` seams. Per-game mutation
//! is serialized by the game handle's mutex, held for the full duration
//! of each public operation.

pub mod broadcast;
pub mod registry;

pub(crate) mod validity;

mod ending;
mod lifecycle;
mod options;
mod rating;
mod removal;
mod results;

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::GameServiceConfig;
use crate::errors::GameError;
use crate::metrics::EngineMetrics;
use crate::models::{Game, GameInfoMessage, Player, PlayerGameState, Validity};
use crate::ports::{
    ArmyStatisticsService, ClientGateway, DivisionService, GameRepository, MapService, ModService,
    PlayerDirectory, RatingService,
};
use broadcast::GameBroadcaster;
use rating::RatingQueue;
use registry::{ActiveGameRegistry, GameHandle};

/// Future returned by `create_game`/`join_game`.
///
/// Resolves with the game handle once the caller reaches the lobby.
/// Consumers must apply their own timeout: the engine never times out an
/// in-progress join, and a crashed client simply leaves the receiver to
/// be cancelled on removal.
pub type GameFuture = oneshot::Receiver<Arc<GameHandle>>;

/// Everything the engine consumes from the rest of the service.
pub struct Collaborators {
    pub gateway: Arc<dyn ClientGateway>,
    pub game_repository: Arc<dyn GameRepository>,
    pub map_service: Arc<dyn MapService>,
    pub mod_service: Arc<dyn ModService>,
    pub rating_service: Arc<dyn RatingService>,
    pub army_statistics_service: Arc<dyn ArmyStatisticsService>,
    pub division_service: Arc<dyn DivisionService>,
    pub player_directory: Arc<dyn PlayerDirectory>,
}

/// Process-wide game session coordinator.
pub struct GameService {
    pub(crate) config: GameServiceConfig,
    pub(crate) registry: ActiveGameRegistry,
    pub(crate) rating_queue: RatingQueue,
    pub(crate) broadcaster: GameBroadcaster,
    pub(crate) metrics: Arc<EngineMetrics>,
    pub(crate) gateway: Arc<dyn ClientGateway>,
    pub(crate) game_repository: Arc<dyn GameRepository>,
    pub(crate) map_service: Arc<dyn MapService>,
    pub(crate) mod_service: Arc<dyn ModService>,
    pub(crate) rating_service: Arc<dyn RatingService>,
    pub(crate) army_statistics_service: Arc<dyn ArmyStatisticsService>,
    pub(crate) division_service: Arc<dyn DivisionService>,
    pub(crate) player_directory: Arc<dyn PlayerDirectory>,
}

impl GameService {
    pub fn new(config: GameServiceConfig, collaborators: Collaborators) -> Self {
        let metrics = Arc::new(EngineMetrics::new());
        let broadcaster = GameBroadcaster::start(
            collaborators.gateway.clone(),
            metrics.clone(),
            Duration::from_millis(config.broadcast_flush_interval_ms),
        );
        Self {
            config,
            registry: ActiveGameRegistry::new(),
            rating_queue: RatingQueue::new(),
            broadcaster,
            metrics,
            gateway: collaborators.gateway,
            game_repository: collaborators.game_repository,
            map_service: collaborators.map_service,
            mod_service: collaborators.mod_service,
            rating_service: collaborators.rating_service,
            army_statistics_service: collaborators.army_statistics_service,
            division_service: collaborators.division_service,
            player_directory: collaborators.player_directory,
        }
    }

    /// Startup hook: seed the id counter from persistence and sweep games
    /// a previous process left unfinished.
    pub async fn initialize(&self) -> Result<(), GameError> {
        let max_id = self.game_repository.find_max_id().await?;
        self.registry.seed_next_id(max_id);
        info!(max_id, "game id counter seeded");
        self.update_unfinished_games_validity().await
    }

    /// Mark games left unfinished by a previous process as unrankable.
    pub async fn update_unfinished_games_validity(&self) -> Result<(), GameError> {
        self.game_repository
            .update_unfinished_games_validity(Validity::ServerShutdown)
            .await
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub async fn find_game(&self, id: i32) -> Option<Arc<GameHandle>> {
        self.registry.find(id).await
    }

    /// Number of games currently in the registry.
    pub async fn active_game_count(&self) -> usize {
        self.registry.len().await
    }

    /// Push the current game list to one recipient.
    pub async fn send_game_list(&self, recipient: &Arc<Player>) {
        let handles = self.registry.snapshot().await;
        let list = join_all(handles.iter().map(|handle| async move {
            let game = handle.game.lock().await;
            GameInfoMessage::from_game(&game)
        }))
        .await;
        self.gateway.send_game_list(list, recipient).await;
    }

    pub(crate) async fn current_game_handle(&self, player: &Player) -> Option<Arc<GameHandle>> {
        let game_id = player.current_game_id().await?;
        let handle = self.registry.find(game_id).await;
        if handle.is_none() {
            warn!(
                player_id = player.id,
                game_id, "player references a game no longer in the registry"
            );
        }
        handle
    }

    pub(crate) async fn require_current_game(
        &self,
        player: &Player,
    ) -> Result<Arc<GameHandle>, GameError> {
        self.current_game_handle(player)
            .await
            .ok_or(GameError::NotInAGame(player.id))
    }

    pub(crate) fn require_host(game: &Game, player: &Player) -> Result<(), GameError> {
        if game.is_host(player.id) {
            Ok(())
        } else {
            Err(GameError::HostOnlyOption)
        }
    }

    /// Queue a coalesced snapshot broadcast with the configured delays.
    pub(crate) async fn mark_dirty(&self, game: &Game) {
        self.broadcaster
            .mark_dirty(
                GameInfoMessage::from_game(game),
                Duration::from_millis(self.config.broadcast_min_delay_ms),
                Duration::from_millis(self.config.broadcast_max_delay_ms),
            )
            .await;
    }

    /// Broadcast a snapshot immediately; used on state-machine transitions.
    pub(crate) async fn mark_dirty_now(&self, game: &Game) {
        self.broadcaster
            .mark_dirty(GameInfoMessage::from_game(game), Duration::ZERO, Duration::ZERO)
            .await;
    }

    /// Apply a client-reported player state transition, rejecting moves
    /// outside the transition table.
    pub(crate) async fn transition_player(
        &self,
        player: &Player,
        to: PlayerGameState,
    ) -> Result<(), GameError> {
        let mut link = player.game_link.lock().await;
        if !to.can_follow(link.state) {
            return Err(GameError::InvalidPlayerGameStateTransition {
                from: link.state,
                to,
            });
        }
        link.state = to;
        Ok(())
    }
}
