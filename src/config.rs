// Service configuration resolved once at startup

/// Tunables for the game session engine.
///
/// `from_env` reads `.env` and process environment; `Default` is used by tests.
#[derive(Debug, Clone)]
pub struct GameServiceConfig {
    /// Seconds a ranked game must last, per participating player.
    pub ranked_min_time_per_player_secs: i64,

    /// Quiet period before a coalesced game snapshot is flushed.
    pub broadcast_min_delay_ms: u64,

    /// Upper bound on how long a dirty game may go unannounced.
    pub broadcast_max_delay_ms: u64,

    /// Poll interval of the broadcast flush task.
    pub broadcast_flush_interval_ms: u64,

    /// Game option key carrying the victory condition.
    pub victory_condition_key: String,

    /// Minimum difficulty for a coop game to stay rankable.
    pub coop_required_difficulty: i64,
}

impl Default for GameServiceConfig {
    fn default() -> Self {
        Self {
            ranked_min_time_per_player_secs: 60,
            broadcast_min_delay_ms: 1_000,
            broadcast_max_delay_ms: 5_000,
            broadcast_flush_interval_ms: 100,
            victory_condition_key: "Victory".to_string(),
            coop_required_difficulty: 3,
        }
    }
}

impl GameServiceConfig {
    /// Build a configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            ranked_min_time_per_player_secs: env_parse(
                "RANKED_MIN_TIME_PER_PLAYER_SECS",
                defaults.ranked_min_time_per_player_secs,
            ),
            broadcast_min_delay_ms: env_parse(
                "BROADCAST_MIN_DELAY_MS",
                defaults.broadcast_min_delay_ms,
            ),
            broadcast_max_delay_ms: env_parse(
                "BROADCAST_MAX_DELAY_MS",
                defaults.broadcast_max_delay_ms,
            ),
            broadcast_flush_interval_ms: env_parse(
                "BROADCAST_FLUSH_INTERVAL_MS",
                defaults.broadcast_flush_interval_ms,
            ),
            victory_condition_key: std::env::var("VICTORY_CONDITION_OPTION_KEY")
                .unwrap_or(defaults.victory_condition_key),
            coop_required_difficulty: env_parse(
                "COOP_REQUIRED_DIFFICULTY",
                defaults.coop_required_difficulty,
            ),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}
