use super::AppState;
use crate::error::{GameError, GameResult};
use crate::flow::sync::Reconcile;
use crate::flow::timer::TimerExpired;
use crate::flow::{Advance, TurnFlow};
use crate::protocol::{ServerMessage, PROTOCOL_VERSION};
use crate::snapshot::SavedGame;
use crate::store::local::load_json;
use crate::store::{SessionEvent, StorageKey};
use crate::types::*;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;

/// Everything a client needs to draw the game screen
pub fn turn_message(flow: &TurnFlow) -> ServerMessage {
    ServerMessage::Turn {
        session: flow.session().clone(),
        view: flow.view().clone(),
        actions: flow.available_actions(),
        swap_targets: flow.swap_targets(),
    }
}

pub fn advance_message(flow: &TurnFlow, advance: Advance) -> ServerMessage {
    match advance {
        Advance::GameOver(record) => ServerMessage::GameOver {
            session: flow.session().clone(),
            record,
        },
        Advance::NextTurn { .. } => turn_message(flow),
    }
}

impl AppState {
    /// Controller of a game that has started
    pub async fn running_flow(&self, room_code: &str) -> GameResult<Arc<Mutex<TurnFlow>>> {
        let session_id = self.session_id_for(room_code).await?;
        self.flow(&session_id).await.ok_or_else(|| {
            GameError::InvalidTurnState("The game has not started yet".to_string())
        })
    }

    /// First message on a fresh socket
    pub async fn welcome(&self, room_code: &str) -> GameResult<ServerMessage> {
        let session_id = self.session_id_for(room_code).await?;
        let (session, view, actions) = match self.flow(&session_id).await {
            Some(flow) => {
                let flow = flow.lock().await;
                (
                    flow.session().clone(),
                    Some(flow.view().clone()),
                    flow.available_actions(),
                )
            }
            None => (self.get_session_by_code(room_code).await?, None, Vec::new()),
        };

        Ok(ServerMessage::Welcome {
            protocol: PROTOCOL_VERSION.to_string(),
            session,
            view,
            actions,
            server_now: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Pause or resume a player, in the lobby or mid-game
    pub async fn toggle_pause(&self, room_code: &str, player_id: &str) -> GameResult<ServerMessage> {
        let session_id = self.session_id_for(room_code).await?;
        match self.flow(&session_id).await {
            Some(flow) => {
                let mut flow = flow.lock().await;
                match flow.toggle_pause(player_id).await? {
                    Some(advance) => Ok(advance_message(&flow, advance)),
                    None => Ok(turn_message(&flow)),
                }
            }
            None => {
                let session = self.toggle_lobby_pause(room_code, player_id).await?;
                Ok(ServerMessage::Session { session })
            }
        }
    }

    /// Route a countdown expiry to its controller. Returns whether it
    /// showed a penalty.
    pub async fn on_timer_expired(&self, expired: TimerExpired) -> bool {
        let Some(flow) = self.flow(&expired.session_id).await else {
            tracing::debug!("Timer expired for unknown session {}", expired.session_id);
            return false;
        };
        let mut flow = flow.lock().await;
        if !flow.handle_timer_complete(expired.turn_counter) {
            return false;
        }

        tracing::info!(
            "Time is up in session {} (turn {})",
            expired.session_id,
            expired.turn_counter
        );
        let room_code = flow.session().room_code.clone();
        self.publish(&room_code, turn_message(&flow));
        true
    }

    /// Merge a document from the session store feed into its running game.
    /// Returns whether another turn is now on screen.
    pub async fn on_store_event(&self, event: SessionEvent) -> bool {
        let Some(flow) = self.flow(&event.session.id).await else {
            return false;
        };
        let mut flow = flow.lock().await;
        match flow.sync_remote(event.session).await {
            Some(Reconcile::AdoptRemote { turn_changed: true }) => {
                tracing::info!(
                    "Session {} moved to turn {} remotely",
                    flow.session_id(),
                    flow.session().turn_counter
                );
                let room_code = flow.session().room_code.clone();
                self.publish(&room_code, turn_message(&flow));
                true
            }
            _ => false,
        }
    }

    /// Rebuild the running game from the local snapshot, if there is one.
    /// An unusable snapshot is discarded.
    pub async fn restore_saved_game(&self) -> GameResult<Option<GameSession>> {
        let saved: Option<SavedGame> =
            match load_json(self.local.as_ref(), StorageKey::SavedGame).await {
                Ok(saved) => saved,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable saved game: {}", e);
                    None
                }
            };
        let Some(saved) = saved else {
            return Ok(None);
        };

        if let Err(reason) = saved.validate() {
            tracing::warn!("Discarding saved game: {}", reason);
            if let Err(e) = self.local.delete(StorageKey::SavedGame).await {
                tracing::error!("Failed to delete saved game: {}", e);
            }
            return Ok(None);
        }

        let session = saved.session.clone();
        match self.store.get_session(&session.id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                if let Err(e) = self.store.create_session(session.clone()).await {
                    tracing::warn!("Failed to re-create session {} remotely: {}", session.id, e);
                }
            }
            Err(e) => tracing::warn!("Session store unavailable while resuming: {}", e),
        }

        let flow = TurnFlow::resume(saved, self.flow_deps())?;
        self.rooms
            .write()
            .await
            .insert(session.room_code.clone(), session.id.clone());
        self.flows
            .write()
            .await
            .insert(session.id.clone(), Arc::new(Mutex::new(flow)));

        tracing::info!(
            "Restored session {} in room {}",
            session.id,
            session.room_code
        );
        Ok(Some(session))
    }
}

/// Spawn a background task that feeds countdown expiries to their games
pub fn spawn_timer_watcher(state: Arc<AppState>) {
    tokio::spawn(async move {
        let Some(mut rx) = state.timer_rx.lock().await.take() else {
            tracing::error!("Timer watcher already running");
            return;
        };

        while let Some(expired) = rx.recv().await {
            state.on_timer_expired(expired).await;
        }
    });
}

/// Spawn a background task that merges session store updates into the
/// running games
pub fn spawn_store_watcher(state: Arc<AppState>) {
    let mut events = state.store.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    state.on_store_event(event).await;
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("Store watcher lagged, skipped {} updates", n);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
