// Army result reports and the most-reported reconciliation

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::engine::GameService;
use crate::errors::GameError;
use crate::models::{ArmyResult, Game, Outcome, Player, PlayerResult};

impl GameService {
    /// Record a score-only report. An existing outcome for the army is
    /// preserved; otherwise the result stays an incomplete placeholder.
    pub async fn report_army_score(
        &self,
        player: &Arc<Player>,
        army_id: i32,
        score: i32,
    ) -> Result<(), GameError> {
        let Some(handle) = self.current_game_handle(player).await else {
            trace!(player_id = player.id, "army score report without a game");
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        if !game.is_known_army(army_id) {
            warn!(
                game_id = game.id,
                player_id = player.id,
                army_id,
                "dropping score report for unknown army"
            );
            return Ok(());
        }
        let outcome = game
            .reported_army_results
            .get(&player.id)
            .and_then(|reports| reports.get(&army_id))
            .map(|r| r.outcome)
            .unwrap_or(Outcome::Unknown);
        record_report(&mut game, player.id, ArmyResult::new(army_id, outcome, score));
        Ok(())
    }

    /// Record a full outcome report, replacing any previous result this
    /// reporter filed for the army.
    pub async fn report_army_outcome(
        &self,
        player: &Arc<Player>,
        army_id: i32,
        outcome: Outcome,
        score: i32,
    ) -> Result<(), GameError> {
        let Some(handle) = self.current_game_handle(player).await else {
            trace!(player_id = player.id, "army outcome report without a game");
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        if !game.is_known_army(army_id) {
            warn!(
                game_id = game.id,
                player_id = player.id,
                army_id,
                "dropping outcome report for unknown army"
            );
            return Ok(());
        }
        record_report(&mut game, player.id, ArmyResult::new(army_id, outcome, score));
        Ok(())
    }

    /// Store the latest army statistics blob for end processing.
    pub async fn report_army_statistics(
        &self,
        player: &Arc<Player>,
        statistics: Value,
    ) -> Result<(), GameError> {
        let Some(handle) = self.current_game_handle(player).await else {
            trace!(player_id = player.id, "army statistics report without a game");
            return Ok(());
        };
        let mut game = handle.game.lock().await;
        game.army_statistics = Some(statistics);
        Ok(())
    }
}

fn record_report(game: &mut Game, reporter_id: i32, result: ArmyResult) {
    if !game.reporter_order.contains(&reporter_id) {
        game.reporter_order.push(reporter_id);
    }
    game.reported_army_results
        .entry(reporter_id)
        .or_default()
        .insert(result.army, result);
}

/// The per-army truth: for each army, the result value most often filed
/// by still-connected reporters. Only complete results vote; ties go to
/// the value that reached the maximum first, in report insertion order.
pub(crate) fn most_reported_results(game: &Game) -> HashMap<i32, ArmyResult> {
    let mut armies: Vec<i32> = Vec::new();
    for reporter_id in &game.reporter_order {
        if !game.connected_players.contains_key(reporter_id) {
            continue;
        }
        let Some(reports) = game.reported_army_results.get(reporter_id) else {
            continue;
        };
        for result in reports.values() {
            if result.is_complete() && !armies.contains(&result.army) {
                armies.push(result.army);
            }
        }
    }

    let mut truth = HashMap::new();
    for army in armies {
        let mut counts: Vec<(ArmyResult, usize)> = Vec::new();
        let mut best: Option<(ArmyResult, usize)> = None;
        for reporter_id in &game.reporter_order {
            if !game.connected_players.contains_key(reporter_id) {
                continue;
            }
            let Some(result) = game
                .reported_army_results
                .get(reporter_id)
                .and_then(|reports| reports.get(&army))
            else {
                continue;
            };
            if !result.is_complete() {
                continue;
            }
            let count = match counts.iter_mut().find(|(value, _)| value == result) {
                Some((_, count)) => {
                    *count += 1;
                    *count
                }
                None => {
                    counts.push((*result, 1));
                    1
                }
            };
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((*result, count));
            }
        }
        if let Some((result, _)) = best {
            truth.insert(army, result);
        }
    }
    truth
}

/// Attribute the per-army truth to players through their `Army` option.
/// Players without an army are omitted.
pub(crate) fn player_results(
    game: &Game,
    army_results: &HashMap<i32, ArmyResult>,
) -> Vec<PlayerResult> {
    let mut results: Vec<PlayerResult> = game
        .player_stats
        .keys()
        .filter_map(|&player_id| {
            let army = game.army_of(player_id)?;
            let result = army_results.get(&army)?;
            Some(PlayerResult {
                player_id,
                outcome: result.outcome,
                score: result.score,
            })
        })
        .collect();
    results.sort_by_key(|r| r.player_id);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    use crate::models::game::{FeaturedMod, NewGame};
    use crate::models::{GameVisibility, LobbyMode, options};

    fn game_with_players(player_ids: &[i32]) -> Game {
        let host = Arc::new(Player::new(player_ids[0], "host"));
        let mut game = Game::new(NewGame {
            id: 1,
            title: "test".to_string(),
            password: None,
            visibility: GameVisibility::Public,
            featured_mod: FeaturedMod {
                id: 1,
                technical_name: "faf".to_string(),
                display_name: "FAF".to_string(),
                ranked: true,
                coop: false,
                ladder_1v1: false,
            },
            featured_mod_file_versions: HashMap::new(),
            map: None,
            map_folder_name: "scmp_001".to_string(),
            min_rating: None,
            max_rating: None,
            lobby_mode: LobbyMode::Default,
            host,
            preset_participants: None,
        });
        for &id in player_ids {
            game.connected_players
                .insert(id, Arc::new(Player::new(id, format!("p{id}"))));
        }
        game
    }

    #[test]
    fn test_unanimous_report_wins() {
        let mut game = game_with_players(&[1, 2]);
        record_report(&mut game, 1, ArmyResult::new(0, Outcome::Victory, 10));
        record_report(&mut game, 2, ArmyResult::new(0, Outcome::Victory, 10));

        let truth = most_reported_results(&game);
        assert_eq!(truth[&0], ArmyResult::new(0, Outcome::Victory, 10));
    }

    #[test]
    fn test_majority_beats_minority() {
        let mut game = game_with_players(&[1, 2, 3]);
        record_report(&mut game, 1, ArmyResult::new(7, Outcome::Victory, 10));
        record_report(&mut game, 2, ArmyResult::new(7, Outcome::Victory, 10));
        record_report(&mut game, 3, ArmyResult::new(7, Outcome::Defeat, 0));

        let truth = most_reported_results(&game);
        assert_eq!(truth[&7], ArmyResult::new(7, Outcome::Victory, 10));
    }

    #[test]
    fn test_disconnected_reporters_do_not_vote() {
        let mut game = game_with_players(&[1, 2, 3]);
        record_report(&mut game, 1, ArmyResult::new(7, Outcome::Defeat, 0));
        record_report(&mut game, 2, ArmyResult::new(7, Outcome::Victory, 10));
        record_report(&mut game, 3, ArmyResult::new(7, Outcome::Victory, 10));
        // players 2 and 3 leave before end processing
        game.connected_players.remove(&2);
        game.connected_players.remove(&3);

        let truth = most_reported_results(&game);
        assert_eq!(truth[&7], ArmyResult::new(7, Outcome::Defeat, 0));
    }

    #[test]
    fn test_ties_break_in_insertion_order() {
        let mut game = game_with_players(&[1, 2]);
        record_report(&mut game, 1, ArmyResult::new(0, Outcome::Victory, 10));
        record_report(&mut game, 2, ArmyResult::new(0, Outcome::Defeat, 0));

        let truth = most_reported_results(&game);
        // 1-1 tie: the first value to reach the maximum wins
        assert_eq!(truth[&0], ArmyResult::new(0, Outcome::Victory, 10));
    }

    #[test]
    fn test_score_only_placeholders_do_not_vote() {
        let mut game = game_with_players(&[1, 2, 3]);
        record_report(&mut game, 1, ArmyResult::new(0, Outcome::Unknown, 99));
        record_report(&mut game, 2, ArmyResult::new(0, Outcome::Unknown, 99));
        record_report(&mut game, 3, ArmyResult::new(0, Outcome::Defeat, 0));

        let truth = most_reported_results(&game);
        assert_eq!(truth[&0], ArmyResult::new(0, Outcome::Defeat, 0));
    }

    #[test]
    fn test_armies_are_reconciled_independently() {
        let mut game = game_with_players(&[1, 2]);
        record_report(&mut game, 1, ArmyResult::new(0, Outcome::Victory, 10));
        record_report(&mut game, 1, ArmyResult::new(1, Outcome::Defeat, 0));
        record_report(&mut game, 2, ArmyResult::new(1, Outcome::Defeat, 0));

        let truth = most_reported_results(&game);
        assert_eq!(truth.len(), 2);
        assert_eq!(truth[&0].outcome, Outcome::Victory);
        assert_eq!(truth[&1].outcome, Outcome::Defeat);
    }

    #[test]
    fn test_player_results_follow_army_options() {
        let mut game = game_with_players(&[1, 2]);
        game.player_options
            .entry(1)
            .or_default()
            .insert(options::ARMY.to_string(), json!(0));
        game.player_options
            .entry(2)
            .or_default()
            .insert(options::ARMY.to_string(), json!(1));
        game.player_stats.insert(
            1,
            crate::models::GamePlayerStats {
                player_id: 1,
                team: 2,
                faction: 1,
                color: 1,
                start_spot: 1,
                mean: 1500.0,
                deviation: 500.0,
                score: None,
                score_time: None,
            },
        );

        let mut truth = HashMap::new();
        truth.insert(0, ArmyResult::new(0, Outcome::Victory, 10));
        truth.insert(1, ArmyResult::new(1, Outcome::Defeat, 0));

        // only player 1 has a stats entry; player 2 never launched
        let results = player_results(&game, &truth);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].player_id, 1);
        assert_eq!(results[0].outcome, Outcome::Victory);
        assert_eq!(results[0].score, 10);
    }
}
