// Core enumerations shared across the engine

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Team id of players that belong to no team (free-for-all slot).
pub const NO_TEAM_ID: i32 = 1;

/// Team id of observers; excluded from results, validity and draw logic.
pub const OBSERVERS_TEAM_ID: i32 = -1;

/// Who can see a lobby in the game list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameVisibility {
    Public,
    Friends,
}

/// How the lobby was put together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LobbyMode {
    Default,
    AutoMatch,
}

/// Victory condition of a match, parsed from the corresponding game option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VictoryCondition {
    Demoralization,
    Domination,
    Eradication,
    Sandbox,
}

impl VictoryCondition {
    /// Parse a client-supplied option value. Clients send either the
    /// lowercase name or the numeric index.
    pub fn parse(value: &Value) -> Option<Self> {
        if let Some(s) = value.as_str() {
            return match s.to_lowercase().as_str() {
                "demoralization" => Some(VictoryCondition::Demoralization),
                "domination" => Some(VictoryCondition::Domination),
                "eradication" => Some(VictoryCondition::Eradication),
                "sandbox" => Some(VictoryCondition::Sandbox),
                _ => None,
            };
        }
        match value.as_i64() {
            Some(0) => Some(VictoryCondition::Demoralization),
            Some(1) => Some(VictoryCondition::Domination),
            Some(2) => Some(VictoryCondition::Eradication),
            Some(3) => Some(VictoryCondition::Sandbox),
            _ => None,
        }
    }
}

/// Which rating bucket a finished game feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatingType {
    Global,
    Ladder1v1,
}

/// Verdict deciding whether a finished game may affect ratings.
///
/// `Valid` until adjudicated; the first dissenting voter fixes the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Validity {
    Valid,
    BadMod,
    WrongVictoryCondition,
    FreeForAll,
    UnevenTeamsNotRanked,
    NoFogOfWar,
    CheatsEnabled,
    PrebuiltEnabled,
    NoRushEnabled,
    BadUnitRestrictions,
    BadMap,
    TooManyDesyncs,
    MutualDraw,
    SinglePlayer,
    UnknownResult,
    TooShort,
    HasAi,
    TeamsUnlocked,
    BadTeamSpawn,
    CiviliansRevealed,
    WrongDifficulty,
    ExpansionDisabled,
    /// Applied in bulk to games left unfinished by a previous process.
    ServerShutdown,
}
