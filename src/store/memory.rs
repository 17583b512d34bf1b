use super::{SessionEvent, SessionStore};
use crate::error::{StoreError, StoreResult};
use crate::types::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// In-process session store with a broadcast feed.
///
/// `set_offline(true)` makes every call fail with
/// [`StoreError::Unavailable`], which is how the best-effort paths of the
/// controller get exercised.
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, GameSession>>>,
    history: Arc<RwLock<Vec<HistoryRecord>>>,
    events: broadcast::Sender<SessionEvent>,
    offline: Arc<AtomicBool>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            history: Arc::new(RwLock::new(Vec::new())),
            events: tx,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn history(&self) -> Vec<HistoryRecord> {
        self.history.read().await.clone()
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("session store is offline".to_string()));
        }
        Ok(())
    }

    /// Apply `f` to a stored session and notify subscribers
    async fn mutate<F>(&self, session_id: &str, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut GameSession) -> StoreResult<()>,
    {
        self.check_online()?;
        let updated = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;
            f(session)?;
            session.clone()
        };

        // Ignore send errors (no subscribers is fine)
        let _ = self.events.send(SessionEvent { session: updated });
        Ok(())
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: GameSession) -> StoreResult<()> {
        self.check_online()?;
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        let _ = self.events.send(SessionEvent { session });
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> StoreResult<Option<GameSession>> {
        self.check_online()?;
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn find_by_room_code(&self, room_code: &str) -> StoreResult<Option<GameSession>> {
        self.check_online()?;
        let code = room_code.trim().to_uppercase();
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| !s.archived)
            .find(|s| s.room_code == code)
            .cloned())
    }

    async fn update_session(&self, session_id: &str, patch: SessionPatch) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            if let Some(status) = patch.status {
                session.status = status;
            }
            if let Some(players) = patch.players {
                session.players = players;
            }
            if let Some(used) = patch.used_dare_ids {
                session.used_dare_ids = used;
            }
            Ok(())
        })
        .await
    }

    async fn update_game_turn(&self, session_id: &str, turn: TurnUpdate) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            if let Some(dare) = &turn.current_dare {
                if !session.used_dare_ids.contains(&dare.id) {
                    session.used_dare_ids.push(dare.id.clone());
                }
            }
            session.apply_turn_update(turn);
            Ok(())
        })
        .await
    }

    async fn update_player_score(
        &self,
        session_id: &str,
        player_id: &str,
        score: u32,
    ) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            let player = session
                .player_mut(player_id)
                .ok_or_else(|| StoreError::NotFound(player_id.to_string()))?;
            player.score = score;
            Ok(())
        })
        .await
    }

    async fn decrement_player_attribute(
        &self,
        session_id: &str,
        player_id: &str,
        attribute: PlayerAttribute,
    ) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            let player = session
                .player_mut(player_id)
                .ok_or_else(|| StoreError::NotFound(player_id.to_string()))?;
            let counter = player.attribute_mut(attribute);
            *counter = counter.saturating_sub(1);
            Ok(())
        })
        .await
    }

    async fn save_game_history(&self, record: HistoryRecord) -> StoreResult<()> {
        self.check_online()?;
        self.history.write().await.push(record);
        Ok(())
    }

    async fn archive_game_session(&self, session_id: &str) -> StoreResult<()> {
        self.mutate(session_id, |session| {
            session.archived = true;
            Ok(())
        })
        .await
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
