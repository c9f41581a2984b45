// Wire-visible option keys and tolerant readers for client-supplied values

use serde_json::Value;

pub const FOG_OF_WAR: &str = "FogOfWar";
pub const CHEATS_ENABLED: &str = "CheatsEnabled";
pub const PREBUILT_UNITS: &str = "PrebuiltUnits";
pub const NO_RUSH: &str = "NoRushOption";
pub const RESTRICTED_CATEGORIES: &str = "RestrictedCategories";
pub const SLOTS: &str = "Slots";
pub const SCENARIO_FILE: &str = "ScenarioFile";
pub const TITLE: &str = "Title";
pub const TEAM: &str = "Team";
pub const TEAM_LOCK: &str = "TeamLock";
pub const TEAM_SPAWN: &str = "TeamSpawn";
pub const REVEALED_CIVILIANS: &str = "RevealedCivilians";
pub const DIFFICULTY: &str = "Difficulty";
pub const EXPANSION: &str = "Expansion";
pub const START_SPOT: &str = "StartSpot";
pub const FACTION: &str = "Faction";
pub const COLOR: &str = "Color";
pub const ARMY: &str = "Army";

/// Read an option value as an integer. Clients are inconsistent about
/// sending numbers versus numeric strings.
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// True when the option value is the given string.
pub fn is_str(value: &Value, expected: &str) -> bool {
    value.as_str() == Some(expected)
}

/// Derive the map folder name from a `ScenarioFile` option value.
///
/// The folder is the third `/`-delimited segment after normalizing
/// backslashes and doubled slashes, e.g.
/// `/maps/scmp_001/SCMP_001_scenario.lua` -> `scmp_001`.
/// Paths with fewer than three segments are rejected.
pub fn scenario_file_folder(path: &str) -> Option<String> {
    let normalized = path.replace('\\', "/");
    let mut normalized = normalized;
    while normalized.contains("//") {
        normalized = normalized.replace("//", "/");
    }
    normalized
        .split('/')
        .nth(2)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
