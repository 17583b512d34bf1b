use crate::types::SessionStatus;

/// Result type for engine and lobby operations
pub type GameResult<T> = Result<T, GameError>;

/// Result type for store collaborators
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the session store and the local store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors that can occur while running a game
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("{0}")]
    Validation(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Invalid status transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("Action not available: {0}")]
    ActionUnavailable(String),

    #[error("Invalid turn state: {0}")]
    InvalidTurnState(String),

    #[error("Dare pool is empty")]
    EmptyDarePool,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stable code sent to clients in `ServerMessage::Error`
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Validation(_) => "VALIDATION_FAILED",
            GameError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            GameError::PlayerNotFound(_) => "PLAYER_NOT_FOUND",
            GameError::InvalidTransition { .. } => "INVALID_TRANSITION",
            GameError::ActionUnavailable(_) => "ACTION_UNAVAILABLE",
            GameError::InvalidTurnState(_) => "INVALID_TURN_STATE",
            GameError::EmptyDarePool => "EMPTY_DARE_POOL",
            GameError::Store(_) => "STORE_FAILED",
        }
    }
}
