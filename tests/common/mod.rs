// Test harness wiring the engine to in-memory fake collaborators

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use game_coordinator::engine::Collaborators;
use game_coordinator::models::{
    FeaturedMod, Game, GameInfoMessage, GamePlayerStats, GameResultMessage, MapVersion, Player,
    PlayerRatings, Rating, RatingType, SimModVersion, Validity,
};
use game_coordinator::ports::{
    ArmyStatisticsService, ClientGateway, DivisionService, GameRepository, MapService, ModService,
    PlayerDirectory, RatingService,
};
use game_coordinator::{GameError, GameService, GameServiceConfig};

#[derive(Default)]
pub struct FakeGateway {
    pub started_processes: Mutex<Vec<(i32, i32)>>,
    pub hosted: Mutex<Vec<(i32, i32)>>,
    pub host_connections: Mutex<Vec<(i32, i32)>>,
    pub peer_connections: Mutex<Vec<(i32, i32, bool)>>,
    pub peer_disconnects: Mutex<Vec<(i32, Vec<i32>)>>,
    pub game_lists: Mutex<Vec<(i32, usize)>>,
    pub game_results: Mutex<Vec<GameResultMessage>>,
    pub snapshots: Mutex<Vec<GameInfoMessage>>,
}

#[async_trait]
impl ClientGateway for FakeGateway {
    async fn start_game_process(&self, game: &Game, player: &Player) {
        self.started_processes
            .lock()
            .unwrap()
            .push((game.id, player.id));
    }

    async fn host_game(&self, game: &Game, host: &Player) {
        self.hosted.lock().unwrap().push((game.id, host.id));
    }

    async fn connect_to_host(&self, player: &Player, game: &Game) {
        self.host_connections
            .lock()
            .unwrap()
            .push((player.id, game.id));
    }

    async fn connect_to_peer(&self, from: &Player, to: &Player, offerer: bool) {
        self.peer_connections
            .lock()
            .unwrap()
            .push((from.id, to.id, offerer));
    }

    async fn disconnect_from_peer(&self, target_id: i32, receivers: &[Arc<Player>]) {
        let mut receiver_ids: Vec<i32> = receivers.iter().map(|p| p.id).collect();
        receiver_ids.sort_unstable();
        self.peer_disconnects
            .lock()
            .unwrap()
            .push((target_id, receiver_ids));
    }

    async fn send_game_list(&self, games: Vec<GameInfoMessage>, recipient: &Player) {
        self.game_lists
            .lock()
            .unwrap()
            .push((recipient.id, games.len()));
    }

    async fn broadcast_game_result(&self, message: GameResultMessage) {
        self.game_results.lock().unwrap().push(message);
    }

    async fn broadcast_game_info(&self, snapshot: GameInfoMessage) {
        self.snapshots.lock().unwrap().push(snapshot);
    }
}

pub struct FakeGameRepository {
    pub max_id: i32,
    pub inserted: Mutex<Vec<i32>>,
    pub updated: Mutex<Vec<(i32, Validity)>>,
    pub unfinished_sweeps: Mutex<Vec<Validity>>,
}

impl FakeGameRepository {
    pub fn with_max_id(max_id: i32) -> Self {
        Self {
            max_id,
            inserted: Mutex::new(vec![]),
            updated: Mutex::new(vec![]),
            unfinished_sweeps: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl GameRepository for FakeGameRepository {
    async fn find_max_id(&self) -> Result<i32, GameError> {
        Ok(self.max_id)
    }

    async fn insert(&self, game: &Game) -> Result<(), GameError> {
        self.inserted.lock().unwrap().push(game.id);
        Ok(())
    }

    async fn update(&self, game: &Game) -> Result<(), GameError> {
        self.updated.lock().unwrap().push((game.id, game.validity));
        Ok(())
    }

    async fn update_unfinished_games_validity(
        &self,
        validity: Validity,
    ) -> Result<(), GameError> {
        self.unfinished_sweeps.lock().unwrap().push(validity);
        Ok(())
    }
}

pub struct FakeMapService {
    pub maps: Mutex<HashMap<String, MapVersion>>,
    pub times_played: Mutex<Vec<i32>>,
}

impl FakeMapService {
    pub fn with_ranked_map(folder_name: &str) -> Self {
        let mut maps = HashMap::new();
        maps.insert(
            folder_name.to_string(),
            MapVersion {
                id: 100,
                folder_name: folder_name.to_string(),
                ranked: true,
            },
        );
        Self {
            maps: Mutex::new(maps),
            times_played: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl MapService for FakeMapService {
    async fn find_map(&self, folder_name: &str) -> Result<Option<MapVersion>, GameError> {
        Ok(self.maps.lock().unwrap().get(folder_name).cloned())
    }

    async fn increment_times_played(&self, map_id: i32) -> Result<(), GameError> {
        self.times_played.lock().unwrap().push(map_id);
        Ok(())
    }
}

pub struct FakeModService {
    pub mods: HashMap<String, FeaturedMod>,
}

impl Default for FakeModService {
    fn default() -> Self {
        let mut mods = HashMap::new();
        mods.insert(
            "faf".to_string(),
            FeaturedMod {
                id: 1,
                technical_name: "faf".to_string(),
                display_name: "Forged Alliance Forever".to_string(),
                ranked: true,
                coop: false,
                ladder_1v1: false,
            },
        );
        mods.insert(
            "ladder1v1".to_string(),
            FeaturedMod {
                id: 2,
                technical_name: "ladder1v1".to_string(),
                display_name: "Ladder 1v1".to_string(),
                ranked: true,
                coop: false,
                ladder_1v1: true,
            },
        );
        mods.insert(
            "sandbox".to_string(),
            FeaturedMod {
                id: 3,
                technical_name: "sandbox".to_string(),
                display_name: "Sandbox".to_string(),
                ranked: false,
                coop: false,
                ladder_1v1: false,
            },
        );
        Self { mods }
    }
}

#[async_trait]
impl ModService for FakeModService {
    async fn get_featured_mod(
        &self,
        technical_name: &str,
    ) -> Result<Option<FeaturedMod>, GameError> {
        Ok(self.mods.get(technical_name).cloned())
    }

    async fn find_mod_versions_by_uids(
        &self,
        uids: &[String],
    ) -> Result<Vec<SimModVersion>, GameError> {
        Ok(uids
            .iter()
            .map(|uid| SimModVersion {
                uid: uid.clone(),
                display_name: format!("Mod {uid}"),
            })
            .collect())
    }

    async fn get_latest_file_versions(
        &self,
        _featured_mod: &FeaturedMod,
    ) -> Result<HashMap<String, i32>, GameError> {
        Ok(HashMap::from([("ForgedAlliance.exe".to_string(), 3774)]))
    }
}

#[derive(Default)]
pub struct FakeRatingService {
    /// (sorted player ids, rating type) per applied update.
    pub updates: Mutex<Vec<(Vec<i32>, RatingType)>>,
}

#[async_trait]
impl RatingService for FakeRatingService {
    async fn update_ratings(
        &self,
        stats: &[GamePlayerStats],
        _no_team_id: i32,
        rating_type: RatingType,
    ) -> Result<(), GameError> {
        let mut player_ids: Vec<i32> = stats.iter().map(|s| s.player_id).collect();
        player_ids.sort_unstable();
        self.updates.lock().unwrap().push((player_ids, rating_type));
        Ok(())
    }

    async fn init_global_rating(&self, player: &Player) {
        let mut ratings = player.ratings.lock().await;
        if ratings.global.is_none() {
            *ratings = PlayerRatings {
                global: Some(Rating::default()),
                ..*ratings
            };
        }
    }

    async fn init_ladder1v1_rating(&self, player: &Player) {
        let mut ratings = player.ratings.lock().await;
        if ratings.ladder1v1.is_none() {
            *ratings = PlayerRatings {
                ladder1v1: Some(Rating::default()),
                ..*ratings
            };
        }
    }
}

#[derive(Default)]
pub struct FakeArmyStatisticsService {
    pub processed: Mutex<Vec<(i32, i32)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl ArmyStatisticsService for FakeArmyStatisticsService {
    async fn process(&self, player: &Player, game: &Game) -> Result<(), GameError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GameError::Storage("stats backend down".to_string()));
        }
        self.processed.lock().unwrap().push((player.id, game.id));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDivisionService {
    pub results: Mutex<Vec<(i32, i32, Option<i32>)>>,
}

#[async_trait]
impl DivisionService for FakeDivisionService {
    async fn post_result(
        &self,
        player_one: i32,
        player_two: i32,
        winner: Option<i32>,
    ) -> Result<(), GameError> {
        self.results
            .lock()
            .unwrap()
            .push((player_one, player_two, winner));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePlayerDirectory {
    pub players: Mutex<HashMap<i32, Arc<Player>>>,
}

#[async_trait]
impl PlayerDirectory for FakePlayerDirectory {
    async fn get_online_player(&self, id: i32) -> Option<Arc<Player>> {
        self.players.lock().unwrap().get(&id).cloned()
    }
}

/// Bundles the engine with its fakes, mirroring a running service.
pub struct TestHarness {
    pub service: GameService,
    pub gateway: Arc<FakeGateway>,
    pub repository: Arc<FakeGameRepository>,
    pub maps: Arc<FakeMapService>,
    pub rating: Arc<FakeRatingService>,
    pub statistics: Arc<FakeArmyStatisticsService>,
    pub division: Arc<FakeDivisionService>,
    pub directory: Arc<FakePlayerDirectory>,
}

impl TestHarness {
    pub async fn new() -> Self {
        // short games are fine in tests; voters still see a start time
        let mut config = GameServiceConfig::default();
        config.ranked_min_time_per_player_secs = 0;
        Self::with_config(config).await
    }

    pub async fn with_config(config: GameServiceConfig) -> Self {
        game_coordinator::init_telemetry();

        let gateway = Arc::new(FakeGateway::default());
        let repository = Arc::new(FakeGameRepository::with_max_id(0));
        let maps = Arc::new(FakeMapService::with_ranked_map("SCMP_001"));
        let mod_service = Arc::new(FakeModService::default());
        let rating = Arc::new(FakeRatingService::default());
        let statistics = Arc::new(FakeArmyStatisticsService::default());
        let division = Arc::new(FakeDivisionService::default());
        let directory = Arc::new(FakePlayerDirectory::default());

        let service = GameService::new(
            config,
            Collaborators {
                gateway: gateway.clone(),
                game_repository: repository.clone(),
                map_service: maps.clone(),
                mod_service,
                rating_service: rating.clone(),
                army_statistics_service: statistics.clone(),
                division_service: division.clone(),
                player_directory: directory.clone(),
            },
        );
        service.initialize().await.expect("engine initialization");

        Self {
            service,
            gateway,
            repository,
            maps,
            rating,
            statistics,
            division,
            directory,
        }
    }

    /// Register an online player with the directory and hand it out.
    pub fn player(&self, id: i32, login: &str) -> Arc<Player> {
        let player = Arc::new(Player::new(id, login));
        self.directory
            .players
            .lock()
            .unwrap()
            .insert(id, player.clone());
        player
    }
}
