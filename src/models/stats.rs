// Per-game player statistics and rating snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One rating bucket of a player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub mean: f64,
    pub deviation: f64,
}

impl Default for Rating {
    fn default() -> Self {
        Self {
            mean: 1500.0,
            deviation: 500.0,
        }
    }
}

/// The rating buckets known for a player. Buckets are lazily initialized
/// by the rating collaborator the first time a player enters a lobby of
/// the corresponding kind.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerRatings {
    pub global: Option<Rating>,
    pub ladder1v1: Option<Rating>,
}

/// Statistics record of one player in one launched game.
///
/// Built from the player options when the host launches; `score` and
/// `score_time` are settled during end processing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePlayerStats {
    pub player_id: i32,
    pub team: i32,
    pub faction: i32,
    pub color: i32,
    pub start_spot: i32,
    pub mean: f64,
    pub deviation: f64,
    pub score: Option<i32>,
    pub score_time: Option<DateTime<Utc>>,
}
