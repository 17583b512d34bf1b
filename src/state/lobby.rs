use super::{normalize_room_code, AppState};
use crate::error::{GameError, GameResult};
use crate::flow::TurnFlow;
use crate::types::*;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Fewest session categories a game can be created with
pub const MIN_CATEGORIES: usize = 2;

/// Longest accepted display name, in characters
pub const MAX_NAME_LEN: usize = 24;

/// Safe character set for room codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;

fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

fn validate_settings(settings: &GameSettings, rounds_total: u32) -> GameResult<()> {
    if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&settings.difficulty) {
        return Err(GameError::validation(format!(
            "Difficulty must be between {} and {}",
            MIN_DIFFICULTY, MAX_DIFFICULTY
        )));
    }
    let mut categories = settings.categories.clone();
    categories.sort();
    categories.dedup();
    if categories.len() < MIN_CATEGORIES {
        return Err(GameError::validation(format!(
            "Pick at least {} categories",
            MIN_CATEGORIES
        )));
    }
    if rounds_total == 0 {
        return Err(GameError::validation("At least one round is required"));
    }
    Ok(())
}

fn validate_name(session: &GameSession, name: &str) -> GameResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::validation("Name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(GameError::validation(format!(
            "Name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    let lowered = name.to_lowercase();
    if session
        .players
        .iter()
        .any(|p| p.name.to_lowercase() == lowered)
    {
        return Err(GameError::validation(format!("{} is already playing", name)));
    }
    Ok(name.to_string())
}

fn validate_preferences(session: &GameSession, prefs: &CategoryPreferences) -> GameResult<()> {
    if prefs.want.len() > 1 || prefs.avoid.len() > 1 {
        return Err(GameError::validation(
            "Pick at most one wanted and one avoided category",
        ));
    }
    if prefs.want.iter().any(|c| prefs.avoid.contains(c)) {
        return Err(GameError::validation(
            "A category cannot be both wanted and avoided",
        ));
    }
    if let Some(unknown) = prefs
        .want
        .iter()
        .chain(prefs.avoid.iter())
        .find(|c| !session.settings.categories.contains(c))
    {
        return Err(GameError::validation(format!(
            "Unknown category for this game: {}",
            unknown
        )));
    }
    Ok(())
}

impl AppState {
    /// Open a new lobby
    pub async fn create_session(
        &self,
        settings: GameSettings,
        rounds_total: u32,
        progressive: bool,
    ) -> GameResult<GameSession> {
        validate_settings(&settings, rounds_total)?;

        let mut rooms = self.rooms.write().await;
        let room_code = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
        };

        let session = GameSession {
            id: ulid::Ulid::new().to_string(),
            room_code: room_code.clone(),
            status: SessionStatus::Waiting,
            settings,
            players: Vec::new(),
            current_turn_player_id: None,
            current_dare: None,
            rounds_total,
            rounds_completed: 0,
            players_played_this_round: 0,
            progressive,
            turn_counter: 0,
            swap_used_by_player_ids: Vec::new(),
            used_dare_ids: Vec::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
            started_at: None,
            archived: false,
        };

        self.store.create_session(session.clone()).await?;
        rooms.insert(room_code.clone(), session.id.clone());

        tracing::info!(
            "Created session {} with room code {} ({} rounds)",
            session.id,
            room_code,
            rounds_total
        );
        Ok(session)
    }

    pub async fn session_id_for(&self, room_code: &str) -> GameResult<SessionId> {
        let code = normalize_room_code(room_code);
        if let Some(id) = self.rooms.read().await.get(&code) {
            return Ok(id.clone());
        }
        match self.store.find_by_room_code(&code).await? {
            Some(session) => Ok(session.id),
            None => Err(GameError::SessionNotFound(code)),
        }
    }

    /// Current session document; the running controller's copy wins over the
    /// store
    pub async fn get_session_by_code(&self, room_code: &str) -> GameResult<GameSession> {
        let session_id = self.session_id_for(room_code).await?;
        if let Some(flow) = self.flow(&session_id).await {
            return Ok(flow.lock().await.session().clone());
        }
        self.store
            .get_session(&session_id)
            .await?
            .ok_or_else(|| GameError::SessionNotFound(normalize_room_code(room_code)))
    }

    async fn lobby_session(&self, room_code: &str) -> GameResult<GameSession> {
        let session = self.get_session_by_code(room_code).await?;
        if session.status != SessionStatus::Waiting {
            return Err(GameError::InvalidTurnState(
                "The lobby is closed once the game has started".to_string(),
            ));
        }
        Ok(session)
    }

    async fn save_lobby_players(&self, session: &GameSession) -> GameResult<()> {
        let patch = SessionPatch {
            players: Some(session.players.clone()),
            ..SessionPatch::default()
        };
        self.store.update_session(&session.id, patch).await?;
        Ok(())
    }

    pub async fn add_player(
        &self,
        room_code: &str,
        name: &str,
        avatar: Option<String>,
    ) -> GameResult<(GameSession, Player)> {
        let _guard = self.lobby.lock().await;
        let mut session = self.lobby_session(room_code).await?;
        let name = validate_name(&session, name)?;

        let player = Player::new(name, avatar, &session.settings.allowance);
        session.players.push(player.clone());
        self.save_lobby_players(&session).await?;

        tracing::info!("Player {} joined room {}", player.name, session.room_code);
        Ok((session, player))
    }

    pub async fn remove_player(&self, room_code: &str, player_id: &str) -> GameResult<GameSession> {
        let _guard = self.lobby.lock().await;
        let mut session = self.lobby_session(room_code).await?;
        let before = session.players.len();
        session.players.retain(|p| p.id != player_id);
        if session.players.len() == before {
            return Err(GameError::PlayerNotFound(player_id.to_string()));
        }
        self.save_lobby_players(&session).await?;

        tracing::info!("Player {} left room {}", player_id, session.room_code);
        Ok(session)
    }

    pub async fn set_preferences(
        &self,
        room_code: &str,
        player_id: &str,
        preferences: CategoryPreferences,
    ) -> GameResult<GameSession> {
        let _guard = self.lobby.lock().await;
        let mut session = self.lobby_session(room_code).await?;
        validate_preferences(&session, &preferences)?;

        let player = session
            .player_mut(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        player.preferences = preferences;
        self.save_lobby_players(&session).await?;
        Ok(session)
    }

    /// Pause flag while still in the lobby; running games go through the
    /// controller
    pub(super) async fn toggle_lobby_pause(
        &self,
        room_code: &str,
        player_id: &str,
    ) -> GameResult<GameSession> {
        let _guard = self.lobby.lock().await;
        let mut session = self.lobby_session(room_code).await?;
        let player = session
            .player_mut(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        // Not sticky yet: only sitting out once the game runs counts
        player.is_paused = !player.is_paused;
        self.save_lobby_players(&session).await?;
        Ok(session)
    }

    /// Close the lobby: build the controller and draw the first card
    pub async fn start_game(&self, room_code: &str) -> GameResult<Arc<Mutex<TurnFlow>>> {
        let _guard = self.lobby.lock().await;
        let session = self.lobby_session(room_code).await?;
        if session.players.is_empty() {
            return Err(GameError::validation("At least one player is required"));
        }

        let session_id = session.id.clone();
        let mut flow = TurnFlow::new(session, self.flow_deps());
        flow.start_game().await?;

        let flow = Arc::new(Mutex::new(flow));
        self.flows.write().await.insert(session_id, flow.clone());
        Ok(flow)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{test_settings, test_state};
    use super::*;
    use crate::store::SessionStore;

    #[tokio::test]
    async fn test_create_session_generates_room_code() {
        let (state, store, _local) = test_state();
        let session = state.create_session(test_settings(), 3, false).await.unwrap();

        assert_eq!(session.room_code.len(), CODE_LENGTH);
        assert!(session
            .room_code
            .bytes()
            .all(|b| CODE_CHARS.contains(&b)));
        assert_eq!(session.status, SessionStatus::Waiting);
        assert!(store.get_session(&session.id).await.unwrap().is_some());

        let found = state
            .get_session_by_code(&session.room_code.to_lowercase())
            .await
            .unwrap();
        assert_eq!(found.id, session.id);
    }

    #[tokio::test]
    async fn test_create_session_validation() {
        let (state, _store, _local) = test_state();

        let mut settings = test_settings();
        settings.categories = vec!["fun".to_string(), "fun".to_string()];
        assert!(matches!(
            state.create_session(settings, 3, false).await,
            Err(GameError::Validation(_))
        ));

        let mut settings = test_settings();
        settings.difficulty = 5;
        assert!(state.create_session(settings, 3, false).await.is_err());

        assert!(state.create_session(test_settings(), 0, false).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_room_code() {
        let (state, _store, _local) = test_state();
        let err = state.get_session_by_code("ZZZZZ").await.unwrap_err();
        assert_eq!(err.code(), "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_add_player_name_rules() {
        let (state, _store, _local) = test_state();
        let code = state
            .create_session(test_settings(), 3, false)
            .await
            .unwrap()
            .room_code;

        let (_, alice) = state.add_player(&code, "  Alice ", None).await.unwrap();
        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.jokers_left, 1);
        assert_eq!(alice.rerolls_left, 2);

        assert!(state.add_player(&code, "ALICE", None).await.is_err());
        assert!(state.add_player(&code, "   ", None).await.is_err());
        assert!(state.add_player(&code, &"x".repeat(25), None).await.is_err());
        assert!(state.add_player(&code, &"é".repeat(24), None).await.is_ok());

        let session = state.get_session_by_code(&code).await.unwrap();
        assert_eq!(session.players.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_player() {
        let (state, _store, _local) = test_state();
        let code = state
            .create_session(test_settings(), 3, false)
            .await
            .unwrap()
            .room_code;
        let (_, bob) = state.add_player(&code, "Bob", None).await.unwrap();

        let session = state.remove_player(&code, &bob.id).await.unwrap();
        assert!(session.players.is_empty());
        assert!(matches!(
            state.remove_player(&code, &bob.id).await,
            Err(GameError::PlayerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_preferences_rules() {
        let (state, _store, _local) = test_state();
        let code = state
            .create_session(test_settings(), 3, false)
            .await
            .unwrap()
            .room_code;
        let (_, bob) = state.add_player(&code, "Bob", None).await.unwrap();
        let prefs = |want: &[&str], avoid: &[&str]| CategoryPreferences {
            want: want.iter().map(|c| c.to_string()).collect(),
            avoid: avoid.iter().map(|c| c.to_string()).collect(),
        };

        let session = state
            .set_preferences(&code, &bob.id, prefs(&["fun"], &["social"]))
            .await
            .unwrap();
        assert_eq!(session.player(&bob.id).unwrap().preferences.want, vec!["fun"]);

        for bad in [
            prefs(&["fun", "social"], &[]),
            prefs(&["fun"], &["fun"]),
            prefs(&["hot"], &[]),
        ] {
            assert!(matches!(
                state.set_preferences(&code, &bob.id, bad).await,
                Err(GameError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_start_game_requires_players() {
        let (state, _store, _local) = test_state();
        let code = state
            .create_session(test_settings(), 3, false)
            .await
            .unwrap()
            .room_code;
        assert!(matches!(
            state.start_game(&code).await,
            Err(GameError::Validation(_))
        ));

        state.add_player(&code, "Alice", None).await.unwrap();
        let flow = state.start_game(&code).await.unwrap();
        assert_eq!(flow.lock().await.session().status, SessionStatus::Active);

        // Lobby is closed now
        assert!(state.add_player(&code, "Late", None).await.is_err());
        assert!(state.start_game(&code).await.is_err());
    }

    #[tokio::test]
    async fn test_lobby_pause_is_not_sticky() {
        let (state, _store, _local) = test_state();
        let code = state
            .create_session(test_settings(), 3, false)
            .await
            .unwrap()
            .room_code;
        let (_, bob) = state.add_player(&code, "Bob", None).await.unwrap();

        state.toggle_lobby_pause(&code, &bob.id).await.unwrap();
        let session = state.toggle_lobby_pause(&code, &bob.id).await.unwrap();
        let bob = session.player(&bob.id).unwrap();
        assert!(!bob.is_paused);
        assert!(!bob.has_been_paused);
    }

    #[tokio::test]
    async fn test_paused_at_start_becomes_sticky() {
        let (state, _store, _local) = test_state();
        let code = state
            .create_session(test_settings(), 3, false)
            .await
            .unwrap()
            .room_code;
        let (_, alice) = state.add_player(&code, "Alice", None).await.unwrap();
        let (_, bob) = state.add_player(&code, "Bob", None).await.unwrap();
        let (_, chloe) = state.add_player(&code, "Chloe", None).await.unwrap();

        // Chloe changes her mind, Bob stays out
        state.toggle_lobby_pause(&code, &chloe.id).await.unwrap();
        state.toggle_lobby_pause(&code, &chloe.id).await.unwrap();
        state.toggle_lobby_pause(&code, &bob.id).await.unwrap();

        let flow = state.start_game(&code).await.unwrap();
        let flow = flow.lock().await;
        let players = &flow.session().players;
        let sticky = |id: &str| players.iter().find(|p| p.id == id).unwrap().has_been_paused;
        assert!(!sticky(&alice.id));
        assert!(sticky(&bob.id));
        assert!(!sticky(&chloe.id));
    }
}
