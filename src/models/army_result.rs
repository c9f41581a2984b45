// Per-army result reports as filed by individual clients

use serde::{Deserialize, Serialize};

/// Outcome a client reported for one army.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Victory,
    Defeat,
    Draw,
    /// Placeholder outcome of a score-only report; never counts as a
    /// complete result.
    Unknown,
}

/// One reporter's view of one army.
///
/// Equality covers every field: identical views from different reporters
/// collapse into one bucket when the most-reported result is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmyResult {
    pub army: i32,
    pub outcome: Outcome,
    pub score: i32,
}

impl ArmyResult {
    pub fn new(army: i32, outcome: Outcome, score: i32) -> Self {
        Self {
            army,
            outcome,
            score,
        }
    }

    /// A result is complete once it carries a real outcome; score-only
    /// placeholders stay incomplete until the outcome arrives.
    pub fn is_complete(&self) -> bool {
        self.outcome != Outcome::Unknown
    }
}
