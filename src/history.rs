//! End-of-game history.
//!
//! The record is written to the local store first, then offered to the
//! session store. A remote failure is logged and never undoes the local
//! write or blocks the end screen.

use crate::engine::final_ranking;
use crate::error::{GameError, GameResult, StoreResult};
use crate::store::local::{load_json, save_json};
use crate::store::{LocalStore, SessionStore, StorageKey};
use crate::types::*;
use std::sync::Arc;

/// Local history keeps the most recent games only
pub const MAX_HISTORY_RECORDS: usize = 50;

#[derive(Clone)]
pub struct HistoryRecorder {
    local: Arc<dyn LocalStore>,
    store: Arc<dyn SessionStore>,
}

impl HistoryRecorder {
    pub fn new(local: Arc<dyn LocalStore>, store: Arc<dyn SessionStore>) -> Self {
        Self { local, store }
    }

    /// Derive the podium for a session
    pub fn build_record(session: &GameSession) -> GameResult<HistoryRecord> {
        let ranking = final_ranking(&session.players);
        let winner = ranking
            .winner()
            .cloned()
            .ok_or_else(|| GameError::validation("Cannot rank a game without players"))?;

        Ok(HistoryRecord {
            id: ulid::Ulid::new().to_string(),
            session_id: session.id.clone(),
            room_code: session.room_code.clone(),
            winner,
            loser: ranking.loser().cloned(),
            others: ranking.others().to_vec(),
            adventurers: ranking.adventurers.clone(),
            rounds_total: session.rounds_total,
            rounds_completed: session.rounds_completed,
            difficulty: session.settings.difficulty,
            categories: session.settings.categories.clone(),
            alcohol_mode: session.settings.alcohol_mode,
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub async fn record(&self, session: &GameSession) -> GameResult<HistoryRecord> {
        let record = Self::build_record(session)?;

        if let Err(e) = self.append_local(&record).await {
            tracing::error!("Failed to write history locally for {}: {}", session.id, e);
        }

        if let Err(e) = self.store.save_game_history(record.clone()).await {
            tracing::warn!(
                "Failed to save history remotely for {}: {} (kept locally)",
                session.id,
                e
            );
        }

        tracing::info!(
            "Recorded game {}: winner {} with {} points",
            session.id,
            record.winner.name,
            record.winner.score
        );
        Ok(record)
    }

    async fn append_local(&self, record: &HistoryRecord) -> StoreResult<()> {
        let mut records = load_history(self.local.as_ref()).await?;
        records.insert(0, record.clone());
        records.truncate(MAX_HISTORY_RECORDS);
        save_json(self.local.as_ref(), StorageKey::History, &records).await
    }
}

/// Locally recorded games, newest first
pub async fn load_history(local: &dyn LocalStore) -> StoreResult<Vec<HistoryRecord>> {
    Ok(load_json(local, StorageKey::History)
        .await?
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryLocalStore, MemorySessionStore};

    fn session(scores: &[(&str, u32, bool)]) -> GameSession {
        let players = scores
            .iter()
            .map(|(name, score, paused)| {
                let mut p = Player::new(name.to_string(), None, &ActionAllowance::default());
                p.id = name.to_string();
                p.score = *score;
                p.has_been_paused = *paused;
                p.is_paused = *paused;
                p
            })
            .collect();
        GameSession {
            id: "s1".to_string(),
            room_code: "ABCDE".to_string(),
            status: SessionStatus::Finished,
            settings: GameSettings::default(),
            players,
            current_turn_player_id: None,
            current_dare: None,
            rounds_total: 2,
            rounds_completed: 2,
            players_played_this_round: 0,
            progressive: false,
            turn_counter: 6,
            swap_used_by_player_ids: Vec::new(),
            used_dare_ids: Vec::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
            started_at: None,
            archived: false,
        }
    }

    fn recorder() -> (HistoryRecorder, Arc<MemoryLocalStore>, Arc<MemorySessionStore>) {
        let local = Arc::new(MemoryLocalStore::new());
        let store = Arc::new(MemorySessionStore::new());
        let recorder = HistoryRecorder::new(local.clone(), store.clone());
        (recorder, local, store)
    }

    #[test]
    fn test_build_record_podium() {
        let s = session(&[("a", 2, false), ("b", 5, false), ("c", 1, false), ("p", 9, true)]);
        let record = HistoryRecorder::build_record(&s).unwrap();

        assert_eq!(record.winner.player_id, "b");
        assert_eq!(record.loser.as_ref().unwrap().player_id, "c");
        assert_eq!(record.others.len(), 1);
        assert_eq!(record.others[0].player_id, "a");
        assert_eq!(record.adventurers.len(), 1);
        assert_eq!(record.adventurers[0].player_id, "p");
    }

    #[test]
    fn test_build_record_without_players_fails() {
        assert!(HistoryRecorder::build_record(&session(&[])).is_err());
    }

    #[tokio::test]
    async fn test_record_writes_local_and_remote() {
        let (recorder, local, store) = recorder();
        let record = recorder.record(&session(&[("a", 1, false)])).await.unwrap();

        assert!(record.loser.is_none());
        let local_history = load_history(local.as_ref()).await.unwrap();
        assert_eq!(local_history, vec![record.clone()]);
        assert_eq!(store.history().await, vec![record]);
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_local_record() {
        let (recorder, local, store) = recorder();
        store.set_offline(true);

        let record = recorder
            .record(&session(&[("a", 1, false), ("b", 0, false)]))
            .await
            .unwrap();

        assert_eq!(load_history(local.as_ref()).await.unwrap(), vec![record]);
        store.set_offline(false);
        assert!(store.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_local_history_is_capped_newest_first() {
        let (recorder, local, _store) = recorder();
        let mut last = None;
        for _ in 0..MAX_HISTORY_RECORDS + 3 {
            last = Some(recorder.record(&session(&[("a", 1, false)])).await.unwrap());
        }

        let history = load_history(local.as_ref()).await.unwrap();
        assert_eq!(history.len(), MAX_HISTORY_RECORDS);
        assert_eq!(history[0].id, last.unwrap().id);
    }
}
