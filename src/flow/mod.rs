//! Turn Flow Controller.
//!
//! One [`TurnFlow`] drives one running session: it owns the per-turn view
//! (card face-down/revealed, timer, popups), applies the engine rules when a
//! turn ends, and writes the new turn to the local store first and then,
//! best effort, to the session store.
//!
//! ```text
//! IDLE --start_turn--> PLAYING --validate------------------------+
//!                         |                                      |
//!                         +--confirm_abandon / timer--> PENALTY  |
//!                                                   |            |
//!                                        sentence_next           |
//!                                                   v            v
//!                                   advance: IDLE (next player) or GAME_OVER
//! ```

mod actions;
pub mod sync;
pub mod timer;

pub use actions::PlayerAction;

use crate::dares::DarePool;
use crate::engine::{advance_round, first_player, is_game_over, next_player, penalty_for, pick_dare};
use crate::error::{GameError, GameResult, StoreResult};
use crate::history::HistoryRecorder;
use crate::random::RandomSource;
use crate::snapshot::SavedGame;
use crate::store::local::save_json;
use crate::store::{LocalStore, SessionStore, StorageKey};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use sync::{reconcile, Reconcile};
use timer::{Countdown, TimerExpired};
use tokio::sync::mpsc;

/// Timers only run for dares at or above this difficulty
pub const TIMED_DIFFICULTY: u8 = 2;

/// Points for a validated dare (and for an accompanist)
pub const POINTS_PER_VALIDATION: u32 = 1;

/// Collaborators handed to a controller
pub struct FlowDeps {
    pub store: Arc<dyn SessionStore>,
    pub local: Arc<dyn LocalStore>,
    pub dares: Arc<DarePool>,
    pub rng: Box<dyn RandomSource>,
    pub timer_events: mpsc::UnboundedSender<TimerExpired>,
    pub flip_delay: Duration,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnPhase {
    /// Card face-down, waiting for the turn-holder
    Idle,
    /// Card revealed, timer possibly running
    Playing,
    /// Penalty popup shown, waiting for `sentence_next`
    Penalty,
    GameOver,
}

/// Transient per-turn UI state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnView {
    pub phase: TurnPhase,
    pub card_visible: bool,
    pub card_revealed: bool,
    pub timer_active: bool,
    pub abandon_prompt_open: bool,
    pub penalty: Option<String>,
    pub accompanist_id: Option<PlayerId>,
}

impl TurnView {
    fn idle(card_visible: bool) -> Self {
        Self {
            phase: TurnPhase::Idle,
            card_visible,
            card_revealed: false,
            timer_active: false,
            abandon_prompt_open: false,
            penalty: None,
            accompanist_id: None,
        }
    }

    fn game_over() -> Self {
        Self {
            phase: TurnPhase::GameOver,
            ..Self::idle(false)
        }
    }
}

/// How a turn ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    Validated,
    Abandoned,
    Skipped,
    Jokered,
}

/// Result of ending a turn
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    NextTurn {
        player_id: PlayerId,
        turn_counter: u64,
    },
    GameOver(HistoryRecord),
}

pub struct TurnFlow {
    session: GameSession,
    view: TurnView,
    store: Arc<dyn SessionStore>,
    local: Arc<dyn LocalStore>,
    dares: Arc<DarePool>,
    rng: Box<dyn RandomSource>,
    timer_events: mpsc::UnboundedSender<TimerExpired>,
    flip_delay: Duration,
    timer: Option<Countdown>,
    history: HistoryRecorder,
    /// A session store write failed and has not been resynced yet
    remote_behind: bool,
}

impl TurnFlow {
    pub fn new(session: GameSession, deps: FlowDeps) -> Self {
        let view = if session.status == SessionStatus::Finished {
            TurnView::game_over()
        } else {
            TurnView::idle(session.current_dare.is_some())
        };
        let history = HistoryRecorder::new(deps.local.clone(), deps.store.clone());

        Self {
            session,
            view,
            store: deps.store,
            local: deps.local,
            dares: deps.dares,
            rng: deps.rng,
            timer_events: deps.timer_events,
            flip_delay: deps.flip_delay,
            timer: None,
            history,
            remote_behind: false,
        }
    }

    /// Rebuild a controller from a local snapshot; the card starts face-down
    pub fn resume(saved: SavedGame, deps: FlowDeps) -> GameResult<Self> {
        saved.validate().map_err(GameError::Validation)?;
        tracing::info!(
            "Resuming session {} at turn {} ({} of {} rounds)",
            saved.session.id,
            saved.session.turn_counter,
            saved.session.rounds_completed,
            saved.session.rounds_total
        );
        Ok(Self::new(saved.session, deps))
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn view(&self) -> &TurnView {
        &self.view
    }

    pub fn session_id(&self) -> &str {
        &self.session.id
    }

    /// Remaining share of the running countdown, if any
    pub fn timer_progress(&self) -> Option<f32> {
        self.timer.as_ref().map(Countdown::progress)
    }

    fn current_player_id(&self) -> GameResult<PlayerId> {
        self.session
            .current_turn_player_id
            .clone()
            .ok_or_else(|| GameError::InvalidTurnState("No turn-holder".to_string()))
    }

    fn require_phase(&self, expected: TurnPhase, action: &str) -> GameResult<()> {
        if self.session.status != SessionStatus::Active {
            return Err(GameError::InvalidTurnState(format!(
                "Cannot {} while the session is {:?}",
                action, self.session.status
            )));
        }
        if self.view.phase != expected {
            return Err(GameError::InvalidTurnState(format!(
                "Cannot {} in {:?} (expected {:?})",
                action, self.view.phase, expected
            )));
        }
        Ok(())
    }

    /// Draw the first card: WAITING -> ACTIVE
    pub async fn start_game(&mut self) -> GameResult<()> {
        if !self.session.status.can_transition_to(SessionStatus::Active) {
            return Err(GameError::InvalidTransition {
                from: self.session.status,
                to: SessionStatus::Active,
            });
        }
        let first_id = first_player(&self.session.players)
            .map(|p| p.id.clone())
            .ok_or_else(|| GameError::validation("At least one player is required"))?;

        let dare = self.draw_for(&first_id, None)?;
        self.session.status = SessionStatus::Active;
        // Sitting out from the first turn counts as having paused
        for player in self.session.players.iter_mut().filter(|p| p.is_paused) {
            player.has_been_paused = true;
        }
        self.set_turn(first_id, dare);
        self.view = TurnView::idle(true);

        tracing::info!(
            "Session {} started with {} players for {} rounds",
            self.session.id,
            self.session.players.len(),
            self.session.rounds_total
        );

        self.save_local().await;
        let patch = SessionPatch {
            status: Some(SessionStatus::Active),
            players: Some(self.session.players.clone()),
            ..SessionPatch::default()
        };
        let result = self.store.update_session(&self.session.id, patch).await;
        self.note_remote(result, "update_session");
        self.persist_turn().await;
        Ok(())
    }

    /// IDLE -> PLAYING: reveal the card, arm the timer for difficulty 2+
    pub async fn start_turn(&mut self) -> GameResult<()> {
        self.require_phase(TurnPhase::Idle, "start a turn")?;
        let difficulty = self
            .session
            .current_dare
            .as_ref()
            .map(|d| d.difficulty)
            .ok_or_else(|| GameError::InvalidTurnState("No dare drawn".to_string()))?;

        self.view.phase = TurnPhase::Playing;
        self.view.card_visible = true;
        self.view.card_revealed = true;

        let seconds = self.session.settings.timer_seconds;
        if difficulty >= TIMED_DIFFICULTY && seconds > 0 {
            let expiry = TimerExpired {
                session_id: self.session.id.clone(),
                turn_counter: self.session.turn_counter,
            };
            self.timer = Some(Countdown::start(
                expiry,
                Duration::from_secs(seconds as u64),
                self.flip_delay,
                self.timer_events.clone(),
            ));
            self.view.timer_active = true;
        }

        tracing::debug!(
            "Turn {} started in session {} (timer: {})",
            self.session.turn_counter,
            self.session.id,
            self.view.timer_active
        );
        Ok(())
    }

    /// Dare done: one point for the turn-holder (and accompanist), then advance
    pub async fn handle_validate_challenge(&mut self) -> GameResult<Advance> {
        self.require_phase(TurnPhase::Playing, "validate a challenge")?;
        let player_id = self.current_player_id()?;

        self.award_point(&player_id).await?;
        if let Some(partner_id) = self.view.accompanist_id.clone() {
            self.award_point(&partner_id).await?;
        }

        self.advance(TurnOutcome::Validated).await
    }

    /// Ask for confirmation before giving up
    pub fn handle_abandon(&mut self) -> GameResult<()> {
        self.require_phase(TurnPhase::Playing, "abandon")?;
        self.view.abandon_prompt_open = true;
        Ok(())
    }

    pub fn cancel_abandon(&mut self) -> GameResult<()> {
        self.require_phase(TurnPhase::Playing, "cancel abandon")?;
        self.view.abandon_prompt_open = false;
        Ok(())
    }

    pub fn confirm_abandon(&mut self) -> GameResult<()> {
        self.require_phase(TurnPhase::Playing, "abandon")?;
        self.show_penalty();
        Ok(())
    }

    /// Countdown reached zero. Returns false for an expiry that belongs to a
    /// card no longer being played.
    pub fn handle_timer_complete(&mut self, turn_counter: u64) -> bool {
        if turn_counter != self.session.turn_counter
            || self.view.phase != TurnPhase::Playing
            || self.session.status != SessionStatus::Active
        {
            tracing::debug!(
                "Ignoring stale timer for turn {} (current turn {})",
                turn_counter,
                self.session.turn_counter
            );
            return false;
        }
        self.show_penalty();
        true
    }

    /// Penalty accepted: the turn ends without a point
    pub async fn handle_sentence_next(&mut self) -> GameResult<Advance> {
        self.require_phase(TurnPhase::Penalty, "continue after a penalty")?;
        self.advance(TurnOutcome::Abandoned).await
    }

    fn show_penalty(&mut self) {
        self.cancel_timer();
        let penalty = match &self.session.current_dare {
            Some(dare) => penalty_for(dare, self.session.settings.alcohol_mode, self.rng.as_mut()),
            None => String::new(),
        };
        self.view.phase = TurnPhase::Penalty;
        self.view.abandon_prompt_open = false;
        self.view.penalty = Some(penalty);
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.view.timer_active = false;
    }

    /// Pause or unpause a player. Pausing the turn-holder ends their turn as
    /// skipped.
    pub async fn toggle_pause(&mut self, player_id: &str) -> GameResult<Option<Advance>> {
        if self.session.status == SessionStatus::Finished {
            return Err(GameError::InvalidTurnState(
                "Cannot pause players in a finished game".to_string(),
            ));
        }
        let player = self
            .session
            .player_mut(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        player.is_paused = !player.is_paused;
        if player.is_paused {
            player.has_been_paused = true;
        }
        let paused = player.is_paused;

        tracing::info!(
            "Player {} {} in session {}",
            player_id,
            if paused { "paused" } else { "resumed" },
            self.session.id
        );

        if paused && self.view.accompanist_id.as_deref() == Some(player_id) {
            self.view.accompanist_id = None;
        }
        self.persist_players().await;

        let holds_turn = self.session.current_turn_player_id.as_deref() == Some(player_id);
        if paused && holds_turn && self.session.status == SessionStatus::Active {
            return self.advance(TurnOutcome::Skipped).await.map(Some);
        }
        Ok(None)
    }

    /// Merge a document pushed by the session store
    pub fn apply_remote(&mut self, remote: GameSession) -> Reconcile {
        let decision = reconcile(&self.session, &remote);
        match decision {
            Reconcile::KeepLocal => {
                tracing::debug!(
                    "Dropping stale session document (turn {} < {})",
                    remote.turn_counter,
                    self.session.turn_counter
                );
            }
            Reconcile::AdoptRemote { turn_changed } => {
                self.session = remote;
                if self.session.status == SessionStatus::Finished {
                    self.cancel_timer();
                    self.view = TurnView::game_over();
                } else if turn_changed {
                    self.cancel_timer();
                    self.view = TurnView::idle(self.session.current_dare.is_some());
                }
            }
        }
        decision
    }

    /// Feed a document from the store's real-time feed. Ignored while a
    /// local write is still missing remotely, and once the game is over.
    pub async fn sync_remote(&mut self, remote: GameSession) -> Option<Reconcile> {
        if self.remote_behind || self.session.status == SessionStatus::Finished {
            return None;
        }
        let changed = self.session != remote;
        let decision = self.apply_remote(remote);
        if changed && matches!(decision, Reconcile::AdoptRemote { .. }) {
            self.save_local().await;
        }
        Some(decision)
    }

    /// Shared end-path of every turn
    async fn advance(&mut self, outcome: TurnOutcome) -> GameResult<Advance> {
        self.cancel_timer();

        let progress = advance_round(
            self.session.players_played_this_round,
            self.session.rounds_completed,
            self.session.active_player_count(),
        );
        self.session.players_played_this_round = progress.players_played_this_round;
        self.session.rounds_completed = progress.rounds_completed;

        tracing::debug!(
            "Turn {} ended ({:?}) in session {}: {}/{} rounds, {} played this round",
            self.session.turn_counter,
            outcome,
            self.session.id,
            self.session.rounds_completed,
            self.session.rounds_total,
            self.session.players_played_this_round
        );

        if is_game_over(self.session.rounds_completed, self.session.rounds_total) {
            let record = self.finish_game().await?;
            return Ok(Advance::GameOver(record));
        }

        let current = self.session.current_turn_player_id.clone();
        let next_id = next_player(&self.session.players, current.as_deref())
            .map(|p| p.id.clone())
            .ok_or_else(|| GameError::InvalidTurnState("No players left".to_string()))?;
        let dare = self.draw_for(&next_id, None)?;

        self.set_turn(next_id.clone(), dare);
        self.session.swap_used_by_player_ids.clear();
        self.view = TurnView::idle(true);
        self.persist_turn().await;

        Ok(Advance::NextTurn {
            player_id: next_id,
            turn_counter: self.session.turn_counter,
        })
    }

    /// ACTIVE -> FINISHED, exactly once
    async fn finish_game(&mut self) -> GameResult<HistoryRecord> {
        if !self.session.status.can_transition_to(SessionStatus::Finished) {
            return Err(GameError::InvalidTransition {
                from: self.session.status,
                to: SessionStatus::Finished,
            });
        }
        self.session.status = SessionStatus::Finished;
        self.session.current_turn_player_id = None;
        self.session.current_dare = None;
        self.view = TurnView::game_over();

        let record = self.history.record(&self.session).await?;

        let patch = SessionPatch {
            status: Some(SessionStatus::Finished),
            players: Some(self.session.players.clone()),
            ..SessionPatch::default()
        };
        let result = self.store.update_session(&self.session.id, patch).await;
        self.note_remote(result, "update_session");
        let result = self.store.archive_game_session(&self.session.id).await;
        self.note_remote(result, "archive_game_session");
        self.session.archived = true;

        if let Err(e) = self.local.delete(StorageKey::SavedGame).await {
            tracing::error!("Failed to clear saved game {}: {}", self.session.id, e);
        }

        tracing::info!(
            "Session {} finished after {} rounds",
            self.session.id,
            self.session.rounds_completed
        );
        Ok(record)
    }

    async fn award_point(&mut self, player_id: &str) -> GameResult<()> {
        let player = self
            .session
            .player_mut(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        player.score += POINTS_PER_VALIDATION;
        let score = player.score;

        self.save_local().await;
        let result = self
            .store
            .update_player_score(&self.session.id, player_id, score)
            .await;
        self.note_remote(result, "update_player_score");
        Ok(())
    }

    fn draw_for(&mut self, player_id: &str, exclude: Option<&str>) -> GameResult<Dare> {
        let preferences = self
            .session
            .player(player_id)
            .map(|p| p.preferences.clone())
            .unwrap_or_default();
        pick_dare(
            self.dares.dares(),
            &self.session,
            &preferences,
            exclude,
            self.rng.as_mut(),
        )
        .ok_or(GameError::EmptyDarePool)
    }

    /// New card on screen: bumps the turn counter
    fn set_turn(&mut self, player_id: PlayerId, dare: Dare) {
        if !self.session.used_dare_ids.contains(&dare.id) {
            self.session.used_dare_ids.push(dare.id.clone());
        }
        self.session.current_turn_player_id = Some(player_id);
        self.session.current_dare = Some(dare);
        self.session.turn_counter += 1;
        self.session.started_at = Some(chrono::Utc::now().to_rfc3339());
    }

    async fn save_local(&self) {
        let saved = SavedGame::new(self.session.clone());
        if let Err(e) = save_json(self.local.as_ref(), StorageKey::SavedGame, &saved).await {
            tracing::error!("Failed to save game {} locally: {}", self.session.id, e);
        }
    }

    /// Local snapshot first, then the turn tuple to the session store
    async fn persist_turn(&mut self) {
        self.save_local().await;
        if self.remote_behind {
            self.resync_remote().await;
            return;
        }
        let result = self
            .store
            .update_game_turn(&self.session.id, self.session.turn_update())
            .await;
        self.note_remote(result, "update_game_turn");
    }

    async fn persist_players(&mut self) {
        self.save_local().await;
        let patch = SessionPatch {
            players: Some(self.session.players.clone()),
            ..SessionPatch::default()
        };
        let result = self.store.update_session(&self.session.id, patch).await;
        self.note_remote(result, "update_session");
    }

    /// Push the whole document after a missed write. Players go first so
    /// the turn write is the first complete echo.
    async fn resync_remote(&mut self) {
        let patch = SessionPatch {
            status: Some(self.session.status),
            players: Some(self.session.players.clone()),
            used_dare_ids: Some(self.session.used_dare_ids.clone()),
        };
        let result = match self.store.update_session(&self.session.id, patch).await {
            Ok(()) => {
                self.store
                    .update_game_turn(&self.session.id, self.session.turn_update())
                    .await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                self.remote_behind = false;
                tracing::info!("Session store caught up with {}", self.session.id);
            }
            Err(e) => tracing::warn!(
                "Session store resync failed for {}: {} (continuing with local state)",
                self.session.id,
                e
            ),
        }
    }

    /// Remote writes are best effort: log and carry on
    fn note_remote(&mut self, result: StoreResult<()>, operation: &str) {
        if let Err(e) = result {
            self.remote_behind = true;
            tracing::warn!(
                "Session store {} failed for {}: {} (continuing with local state)",
                operation,
                self.session.id,
                e
            );
        }
    }
}
