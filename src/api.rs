//! HTTP API endpoints.
//!
//! Used by the lobby screen to open a room and by the history and settings
//! screens, which read the device-local store.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GameError;
use crate::history::load_history;
use crate::state::AppState;
use crate::store::local::{load_json, save_json};
use crate::store::StorageKey;
use crate::types::{GameSettings, UserProfile};

/// Routes under `/api`
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{code}", get(get_session))
        .route("/api/history", get(list_history))
        .route("/api/profile", get(get_profile).put(put_profile))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    msg: String,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = match &self {
            GameError::SessionNotFound(_) | GameError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
            GameError::Validation(_) | GameError::EmptyDarePool => StatusCode::BAD_REQUEST,
            GameError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::CONFLICT,
        };
        let body = ErrorBody {
            code: self.code(),
            msg: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    /// Falls back to the profile defaults, then to the built-in defaults
    #[serde(default)]
    pub settings: Option<GameSettings>,
    pub rounds_total: u32,
    #[serde(default)]
    pub progressive: bool,
}

/// Open a lobby.
///
/// POST /api/sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Response {
    let settings = match req.settings {
        Some(settings) => settings,
        None => load_json::<UserProfile>(state.local.as_ref(), StorageKey::Profile)
            .await
            .ok()
            .flatten()
            .and_then(|p| p.default_settings)
            .unwrap_or_default(),
    };

    match state
        .create_session(settings, req.rounds_total, req.progressive)
        .await
    {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Look up a room.
///
/// GET /api/sessions/{code}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Response {
    match state.get_session_by_code(&code).await {
        Ok(session) => Json(session).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Finished games recorded on this device, newest first.
///
/// GET /api/history
pub async fn list_history(State(state): State<Arc<AppState>>) -> Response {
    match load_history(state.local.as_ref()).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            tracing::error!("Failed to read history: {}", e);
            GameError::from(e).into_response()
        }
    }
}

/// GET /api/profile
pub async fn get_profile(State(state): State<Arc<AppState>>) -> Response {
    match load_json::<UserProfile>(state.local.as_ref(), StorageKey::Profile).await {
        Ok(profile) => Json(profile.unwrap_or_default()).into_response(),
        Err(e) => {
            tracing::error!("Failed to read profile: {}", e);
            GameError::from(e).into_response()
        }
    }
}

/// PUT /api/profile
pub async fn put_profile(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<UserProfile>,
) -> Response {
    match save_json(state.local.as_ref(), StorageKey::Profile, &profile).await {
        Ok(()) => Json(profile).into_response(),
        Err(e) => {
            tracing::error!("Failed to save profile: {}", e);
            GameError::from(e).into_response()
        }
    }
}
