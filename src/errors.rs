use thiserror::Error;

use crate::models::{GameState, PlayerGameState};

/// Crate-wide error type.
///
/// Request-plane failures carry a wire-visible error code (see [`GameError::code`]);
/// `Storage` wraps failures propagated from persistence collaborators.
#[derive(Error, Debug)]
pub enum GameError {
    #[error("player {0} is already in a game")]
    AlreadyInGame(i32),

    #[error("player {0} is not in a game")]
    NotInAGame(i32),

    #[error("no such game: {0}")]
    NoSuchGame(i32),

    #[error("game {id} is not joinable in state {state:?}")]
    GameNotJoinable { id: i32, state: GameState },

    #[error("invalid password")]
    InvalidPassword,

    #[error("only the host may change options")]
    HostOnlyOption,

    #[error("operation not permitted in game state {0:?}")]
    InvalidGameState(GameState),

    #[error("illegal player game state transition {from:?} -> {to:?}")]
    InvalidPlayerGameStateTransition {
        from: PlayerGameState,
        to: PlayerGameState,
    },

    #[error("unknown featured mod: {0}")]
    InvalidFeaturedMod(String),

    #[error("cannot restore game session: game {0} does not exist")]
    CantRestoreGameDoesntExist(i32),

    #[error("cannot restore game session: player {player_id} is not a participant of game {game_id}")]
    CantRestoreGameNotParticipant { game_id: i32, player_id: i32 },

    #[error("storage error: {0}")]
    Storage(String),
}

impl GameError {
    /// The structured error code sent back to clients.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::AlreadyInGame(_) => "ALREADY_IN_GAME",
            GameError::NotInAGame(_) => "NOT_IN_A_GAME",
            GameError::NoSuchGame(_) => "NO_SUCH_GAME",
            GameError::GameNotJoinable { .. } => "GAME_NOT_JOINABLE",
            GameError::InvalidPassword => "INVALID_PASSWORD",
            GameError::HostOnlyOption => "HOST_ONLY_OPTION",
            GameError::InvalidGameState(_) => "INVALID_GAME_STATE",
            GameError::InvalidPlayerGameStateTransition { .. } => {
                "INVALID_PLAYER_GAME_STATE_TRANSITION"
            }
            GameError::InvalidFeaturedMod(_) => "INVALID_FEATURED_MOD",
            GameError::CantRestoreGameDoesntExist(_) => "CANT_RESTORE_GAME_DOESNT_EXIST",
            GameError::CantRestoreGameNotParticipant { .. } => "CANT_RESTORE_GAME_NOT_PARTICIPANT",
            GameError::Storage(_) => "STORAGE",
        }
    }
}
