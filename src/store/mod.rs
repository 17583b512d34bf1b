//! Collaborators the turn engine persists through.
//!
//! [`SessionStore`] stands in for the shared, real-time document store every
//! device of a room watches. [`local::LocalStore`] is the device-local
//! key-value store and is treated as the durable copy.

pub mod local;
pub mod memory;

use crate::error::StoreResult;
use crate::types::*;
use async_trait::async_trait;
use tokio::sync::broadcast;

pub use local::{FileLocalStore, LocalStore, MemoryLocalStore, StorageKey};
pub use memory::MemorySessionStore;

/// Pushed to subscribers after every write to a session document
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub session: GameSession,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: GameSession) -> StoreResult<()>;

    async fn get_session(&self, session_id: &str) -> StoreResult<Option<GameSession>>;

    async fn find_by_room_code(&self, room_code: &str) -> StoreResult<Option<GameSession>>;

    async fn update_session(&self, session_id: &str, patch: SessionPatch) -> StoreResult<()>;

    async fn update_game_turn(&self, session_id: &str, turn: TurnUpdate) -> StoreResult<()>;

    async fn update_player_score(
        &self,
        session_id: &str,
        player_id: &str,
        score: u32,
    ) -> StoreResult<()>;

    /// Decrement one action counter; saturates at zero
    async fn decrement_player_attribute(
        &self,
        session_id: &str,
        player_id: &str,
        attribute: PlayerAttribute,
    ) -> StoreResult<()>;

    async fn save_game_history(&self, record: HistoryRecord) -> StoreResult<()>;

    /// Mark a finished session as archived; it is never deleted
    async fn archive_game_session(&self, session_id: &str) -> StoreResult<()>;

    /// Real-time feed of updated session documents (all sessions; filter by id)
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}
