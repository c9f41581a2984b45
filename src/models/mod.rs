pub mod army_result;
pub mod enums;
pub mod game;
pub mod messages;
pub mod options;
pub mod player;
pub mod stats;

pub use army_result::{ArmyResult, Outcome};
pub use enums::{
    GameVisibility, LobbyMode, NO_TEAM_ID, OBSERVERS_TEAM_ID, RatingType, Validity,
    VictoryCondition,
};
pub use game::{FeaturedMod, Game, GameState, MapVersion, NewGame, SimModVersion};
pub use messages::{GameInfoMessage, GameInfoPlayer, GameResultMessage, PlayerResult};
pub use player::{Player, PlayerGameState};
pub use stats::{GamePlayerStats, PlayerRatings, Rating};
