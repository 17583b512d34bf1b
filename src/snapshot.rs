//! Saved-game snapshot for resuming an interrupted session.
//!
//! Written to the local store after every turn change and deleted once the
//! game finishes.

use crate::types::*;
use serde::{Deserialize, Serialize};

/// Schema version for snapshot compatibility
/// Version 1: session document only
pub const SAVED_GAME_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedGame {
    /// Schema version for forward compatibility
    pub schema_version: u32,
    /// Save timestamp (ISO8601)
    pub saved_at: String,
    pub session: GameSession,
}

impl SavedGame {
    pub fn new(session: GameSession) -> Self {
        Self {
            schema_version: SAVED_GAME_SCHEMA_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            session,
        }
    }

    /// Check the snapshot before resuming from it
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version > SAVED_GAME_SCHEMA_VERSION {
            return Err(format!(
                "Saved game schema version {} is newer than supported version {}",
                self.schema_version, SAVED_GAME_SCHEMA_VERSION
            ));
        }

        let session = &self.session;
        if session.status == SessionStatus::Finished {
            return Err("Saved game is already finished".to_string());
        }
        if session.players.is_empty() {
            return Err("Saved game has no players".to_string());
        }
        if session.rounds_completed > session.rounds_total {
            return Err(format!(
                "Saved game completed {} of {} rounds",
                session.rounds_completed, session.rounds_total
            ));
        }
        if let Some(ref player_id) = session.current_turn_player_id {
            if session.player(player_id).is_none() {
                return Err(format!(
                    "Saved game references turn-holder '{}' but player not found",
                    player_id
                ));
            }
        }

        Ok(())
    }
}
