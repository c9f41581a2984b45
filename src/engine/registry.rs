// Active-game registry with atomic id allocation

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use tokio::sync::Mutex;

use crate::models::Game;

/// Shared handle of one active game.
///
/// The inner mutex is the game's serialization token: every public
/// operation that mutates the game holds it for its full duration.
#[derive(Debug)]
pub struct GameHandle {
    pub id: i32,
    pub game: Mutex<Game>,
}

impl GameHandle {
    pub fn new(game: Game) -> Arc<Self> {
        Arc::new(Self {
            id: game.id,
            game: Mutex::new(game),
        })
    }
}

/// In-memory index of active games by id.
///
/// Ids are unique for the lifetime of the process and strictly
/// increasing; the counter is seeded from persistence at startup.
#[derive(Debug)]
pub struct ActiveGameRegistry {
    games: Mutex<HashMap<i32, Arc<GameHandle>>>,
    next_id: AtomicI32,
}

impl ActiveGameRegistry {
    pub fn new() -> Self {
        Self {
            games: Mutex::new(HashMap::new()),
            next_id: AtomicI32::new(1),
        }
    }

    /// Seed the id counter so the next allocated id is `max_persisted + 1`.
    pub fn seed_next_id(&self, max_persisted: i32) {
        self.next_id.store(max_persisted + 1, Ordering::SeqCst);
    }

    pub fn allocate_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub async fn insert(&self, handle: Arc<GameHandle>) {
        self.games.lock().await.insert(handle.id, handle);
    }

    pub async fn find(&self, id: i32) -> Option<Arc<GameHandle>> {
        self.games.lock().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: i32) -> Option<Arc<GameHandle>> {
        self.games.lock().await.remove(&id)
    }

    /// Handles of all active games, in no particular order.
    pub async fn snapshot(&self) -> Vec<Arc<GameHandle>> {
        self.games.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.games.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.games.lock().await.is_empty()
    }
}
