// Player aggregate and the per-player game state machine

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};

use crate::engine::registry::GameHandle;
use crate::models::stats::PlayerRatings;

/// One player's view of its current game, reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerGameState {
    /// Not attached to any game.
    #[default]
    None,
    /// Reported by idling clients; the engine ignores it.
    Idle,
    /// Game process is being started.
    Initializing,
    /// The game process reached the lobby screen.
    Lobby,
    /// The game process is launching the match.
    Launching,
    /// The client reported the match as finished.
    Ended,
    /// The game process exited.
    Closed,
}

static LEGAL_PREDECESSORS: Lazy<HashMap<PlayerGameState, &'static [PlayerGameState]>> =
    Lazy::new(|| {
        use PlayerGameState::*;
        HashMap::from([
            (Initializing, &[None][..]),
            (Lobby, &[Initializing][..]),
            (Launching, &[Lobby][..]),
            (Ended, &[Launching][..]),
            (Closed, &[Initializing, Lobby, Launching, Ended][..]),
        ])
    });

impl PlayerGameState {
    /// Whether a client-reported transition from `from` into `self` is legal.
    pub fn can_follow(self, from: PlayerGameState) -> bool {
        LEGAL_PREDECESSORS
            .get(&self)
            .is_some_and(|preds| preds.contains(&from))
    }
}

/// Link between a player and its current game.
///
/// At most one game is referenced at any moment; the join waiter is the
/// sending half of the future returned by create/join and is resolved on
/// the LOBBY transition or dropped (cancelled) on removal.
#[derive(Debug, Default)]
pub struct GameLink {
    pub state: PlayerGameState,
    pub current_game: Option<i32>,
    pub(crate) join_waiter: Option<oneshot::Sender<Arc<GameHandle>>>,
}

/// An online player, owned by the player directory and shared with the
/// engine. Games reference players through this handle; the player side
/// of the edge is the numeric game id inside [`GameLink`].
#[derive(Debug)]
pub struct Player {
    pub id: i32,
    pub login: String,
    pub ratings: Mutex<PlayerRatings>,
    pub(crate) game_link: Mutex<GameLink>,
}

impl Player {
    pub fn new(id: i32, login: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
            ratings: Mutex::new(PlayerRatings::default()),
            game_link: Mutex::new(GameLink::default()),
        }
    }

    /// Id of the game this player is currently attached to, if any.
    pub async fn current_game_id(&self) -> Option<i32> {
        self.game_link.lock().await.current_game
    }

    /// The player's current game state as last reported or assigned.
    pub async fn game_state(&self) -> PlayerGameState {
        self.game_link.lock().await.state
    }
}
