use crate::flow::{PlayerAction, TurnView};
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    // Lobby
    AddPlayer {
        name: String,
        #[serde(default)]
        avatar: Option<String>,
    },
    RemovePlayer {
        player_id: PlayerId,
    },
    SetPreferences {
        player_id: PlayerId,
        preferences: CategoryPreferences,
    },
    StartGame,
    // Turn
    StartTurn,
    ValidateChallenge,
    Abandon,
    CancelAbandon,
    ConfirmAbandon,
    SentenceNext,
    // Action cards
    UseJoker,
    UseReroll,
    UseSwap {
        target_id: PlayerId,
    },
    UseAccompaniment {
        partner_id: PlayerId,
    },
    /// Lobby or mid-game
    TogglePause {
        player_id: PlayerId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        session: GameSession,
        /// Present once the game has started
        #[serde(skip_serializing_if = "Option::is_none")]
        view: Option<TurnView>,
        actions: Vec<PlayerAction>,
        server_now: String,
    },
    /// Lobby changes (players, preferences, pause flags)
    Session {
        session: GameSession,
    },
    /// Anything that changed the card on screen or the view around it
    Turn {
        session: GameSession,
        view: TurnView,
        actions: Vec<PlayerAction>,
        swap_targets: Vec<PlayerId>,
    },
    GameOver {
        session: GameSession,
        record: HistoryRecord,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn error(code: impl Into<String>, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.into(),
            msg: msg.into(),
        }
    }
}

impl From<crate::error::GameError> for ServerMessage {
    fn from(e: crate::error::GameError) -> Self {
        ServerMessage::error(e.code(), e.to_string())
    }
}
