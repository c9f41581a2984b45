// Composable voters deciding whether a finished game may be ranked

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::models::{Game, NO_TEAM_ID, OBSERVERS_TEAM_ID, Validity, VictoryCondition, options};

/// Facts a voter may need beyond the game itself.
pub(crate) struct VoterContext {
    pub now: DateTime<Utc>,
    /// Seconds a ranked game must last, per player.
    pub ranked_min_time_per_player_secs: i64,
    /// Minimum difficulty for coop games.
    pub coop_required_difficulty: i64,
}

type Voter = fn(&Game, &VoterContext) -> Validity;

/// Ordered voter list; the first non-VALID vote decides.
static VOTERS: &[(&str, Voter)] = &[
    ("rankedMod", ranked_mod),
    ("victoryCondition", victory_condition),
    ("freeForAll", free_for_all),
    ("evenTeams", even_teams),
    ("fogOfWar", fog_of_war),
    ("cheatsEnabled", cheats_enabled),
    ("prebuiltUnits", prebuilt_units),
    ("noRush", no_rush),
    ("restrictedCategories", restricted_categories),
    ("rankedMap", ranked_map),
    ("desyncs", desyncs),
    ("mutualDraw", mutual_draw),
    ("singlePlayer", single_player),
    ("unknownResult", unknown_result),
    ("tooShort", too_short),
    ("hasAi", has_ai),
    ("teamsUnlocked", teams_unlocked),
    ("teamSpawn", team_spawn),
    ("revealedCivilians", revealed_civilians),
    ("difficulty", difficulty),
    ("expansion", expansion),
];

/// Run every voter in order and return the first dissenting verdict.
pub(crate) fn adjudicate(game: &Game, ctx: &VoterContext) -> Validity {
    for (name, voter) in VOTERS {
        let vote = voter(game, ctx);
        if vote != Validity::Valid {
            debug!(game_id = game.id, voter = name, verdict = ?vote, "game voted non-rankable");
            return vote;
        }
    }
    Validity::Valid
}

fn ranked_mod(game: &Game, _ctx: &VoterContext) -> Validity {
    if game.featured_mod.ranked {
        Validity::Valid
    } else {
        Validity::BadMod
    }
}

fn victory_condition(game: &Game, _ctx: &VoterContext) -> Validity {
    if game.featured_mod.coop || game.victory_condition == VictoryCondition::Demoralization {
        Validity::Valid
    } else {
        Validity::WrongVictoryCondition
    }
}

fn combatant_teams(game: &Game) -> Vec<i32> {
    game.player_stats
        .values()
        .map(|s| s.team)
        .filter(|&t| t != OBSERVERS_TEAM_ID)
        .collect()
}

fn free_for_all(game: &Game, _ctx: &VoterContext) -> Validity {
    let teams = combatant_teams(game);
    if teams.len() < 3 {
        return Validity::Valid;
    }
    let distinct: std::collections::HashSet<i32> = teams.iter().copied().collect();
    if teams.iter().all(|&t| t > 0) && distinct.len() == teams.len() {
        Validity::FreeForAll
    } else {
        Validity::Valid
    }
}

fn even_teams(game: &Game, _ctx: &VoterContext) -> Validity {
    let mut sizes: HashMap<i32, usize> = HashMap::new();
    for team in combatant_teams(game) {
        *sizes.entry(team).or_default() += 1;
    }
    if sizes.contains_key(&NO_TEAM_ID) {
        // players without a team fight alone; everyone else must too
        if sizes.iter().any(|(&t, &n)| t != NO_TEAM_ID && n != 1) {
            return Validity::UnevenTeamsNotRanked;
        }
        return Validity::Valid;
    }
    let distinct_sizes: std::collections::HashSet<usize> = sizes.values().copied().collect();
    if distinct_sizes.len() > 1 {
        Validity::UnevenTeamsNotRanked
    } else {
        Validity::Valid
    }
}

fn option_violates(game: &Game, key: &str, allowed: &str) -> bool {
    game.options
        .get(key)
        .is_some_and(|v| !options::is_str(v, allowed))
}

fn fog_of_war(game: &Game, _ctx: &VoterContext) -> Validity {
    if option_violates(game, options::FOG_OF_WAR, "explored") {
        Validity::NoFogOfWar
    } else {
        Validity::Valid
    }
}

fn cheats_enabled(game: &Game, _ctx: &VoterContext) -> Validity {
    if option_violates(game, options::CHEATS_ENABLED, "false") {
        Validity::CheatsEnabled
    } else {
        Validity::Valid
    }
}

fn prebuilt_units(game: &Game, _ctx: &VoterContext) -> Validity {
    if option_violates(game, options::PREBUILT_UNITS, "Off") {
        Validity::PrebuiltEnabled
    } else {
        Validity::Valid
    }
}

fn no_rush(game: &Game, _ctx: &VoterContext) -> Validity {
    if option_violates(game, options::NO_RUSH, "Off") {
        Validity::NoRushEnabled
    } else {
        Validity::Valid
    }
}

fn restricted_categories(game: &Game, _ctx: &VoterContext) -> Validity {
    match game.options.get(options::RESTRICTED_CATEGORIES) {
        None => Validity::Valid,
        Some(v) if options::as_i64(v) == Some(0) => Validity::Valid,
        Some(_) => Validity::BadUnitRestrictions,
    }
}

fn ranked_map(game: &Game, _ctx: &VoterContext) -> Validity {
    match &game.map {
        Some(map) if map.ranked => Validity::Valid,
        _ => Validity::BadMap,
    }
}

fn desyncs(game: &Game, _ctx: &VoterContext) -> Validity {
    if game.desync_count as usize > game.player_stats.len() {
        Validity::TooManyDesyncs
    } else {
        Validity::Valid
    }
}

fn mutual_draw(game: &Game, _ctx: &VoterContext) -> Validity {
    if game.mutually_agreed_draw {
        Validity::MutualDraw
    } else {
        Validity::Valid
    }
}

fn single_player(game: &Game, _ctx: &VoterContext) -> Validity {
    if game.player_stats.len() < 2 {
        Validity::SinglePlayer
    } else {
        Validity::Valid
    }
}

fn unknown_result(game: &Game, _ctx: &VoterContext) -> Validity {
    if game.reported_army_results.values().all(|r| r.is_empty()) {
        Validity::UnknownResult
    } else {
        Validity::Valid
    }
}

fn too_short(game: &Game, ctx: &VoterContext) -> Validity {
    let Some(start) = game.start_time else {
        return Validity::TooShort;
    };
    let elapsed = game.end_time.unwrap_or(ctx.now) - start;
    let required = game.player_stats.len() as i64 * ctx.ranked_min_time_per_player_secs;
    if elapsed.num_seconds() < required {
        Validity::TooShort
    } else {
        Validity::Valid
    }
}

fn has_ai(game: &Game, _ctx: &VoterContext) -> Validity {
    if game.ai_options.is_empty() {
        Validity::Valid
    } else {
        Validity::HasAi
    }
}

fn teams_unlocked(game: &Game, _ctx: &VoterContext) -> Validity {
    if option_violates(game, options::TEAM_LOCK, "locked") {
        Validity::TeamsUnlocked
    } else {
        Validity::Valid
    }
}

fn team_spawn(game: &Game, _ctx: &VoterContext) -> Validity {
    if option_violates(game, options::TEAM_SPAWN, "fixed") {
        Validity::BadTeamSpawn
    } else {
        Validity::Valid
    }
}

fn revealed_civilians(game: &Game, _ctx: &VoterContext) -> Validity {
    if option_violates(game, options::REVEALED_CIVILIANS, "No") {
        Validity::CiviliansRevealed
    } else {
        Validity::Valid
    }
}

fn difficulty(game: &Game, ctx: &VoterContext) -> Validity {
    if !game.featured_mod.coop {
        return Validity::Valid;
    }
    match game.options.get(options::DIFFICULTY).map(options::as_i64) {
        Some(Some(d)) if d < ctx.coop_required_difficulty => Validity::WrongDifficulty,
        Some(None) => Validity::WrongDifficulty,
        _ => Validity::Valid,
    }
}

fn expansion(game: &Game, _ctx: &VoterContext) -> Validity {
    if !game.featured_mod.coop {
        return Validity::Valid;
    }
    match game.options.get(options::EXPANSION) {
        None => Validity::Valid,
        Some(v) if options::is_str(v, "true") || options::as_i64(v) == Some(1) => Validity::Valid,
        Some(_) => Validity::ExpansionDisabled,
    }
}
