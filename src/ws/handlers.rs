//! WebSocket message dispatch
//!
//! Every socket is bound to one room. Successful commands are broadcast to
//! the whole room (the sender included); failures go back to the sender
//! only, as an error toast.

use crate::error::GameResult;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{advance_message, turn_message, AppState};
use std::sync::Arc;

/// Lock the room's running controller for the duration of `$body`
macro_rules! on_flow {
    ($state:expr, $room:expr, $flow:ident => $body:expr) => {{
        let handle = $state.running_flow($room).await?;
        let mut $flow = handle.lock().await;
        $body
    }};
}

/// Handle a client message; returns the reply for the sender, if any
pub async fn handle_message(
    msg: ClientMessage,
    room_code: &str,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match dispatch(msg, room_code, state).await {
        Ok(update) => {
            state.publish(room_code, update);
            None
        }
        Err(e) => {
            tracing::warn!("Command rejected in room {}: {}", room_code, e);
            Some(e.into())
        }
    }
}

async fn dispatch(
    msg: ClientMessage,
    room_code: &str,
    state: &Arc<AppState>,
) -> GameResult<ServerMessage> {
    match msg {
        // Lobby
        ClientMessage::AddPlayer { name, avatar } => {
            let (session, _player) = state.add_player(room_code, &name, avatar).await?;
            Ok(ServerMessage::Session { session })
        }

        ClientMessage::RemovePlayer { player_id } => {
            let session = state.remove_player(room_code, &player_id).await?;
            Ok(ServerMessage::Session { session })
        }

        ClientMessage::SetPreferences {
            player_id,
            preferences,
        } => {
            let session = state
                .set_preferences(room_code, &player_id, preferences)
                .await?;
            Ok(ServerMessage::Session { session })
        }

        ClientMessage::StartGame => {
            let flow = state.start_game(room_code).await?;
            let flow = flow.lock().await;
            Ok(turn_message(&flow))
        }

        ClientMessage::TogglePause { player_id } => state.toggle_pause(room_code, &player_id).await,

        // Turn
        ClientMessage::StartTurn => on_flow!(state, room_code, flow => {
            flow.start_turn().await?;
            Ok(turn_message(&flow))
        }),

        ClientMessage::ValidateChallenge => on_flow!(state, room_code, flow => {
            let advance = flow.handle_validate_challenge().await?;
            Ok(advance_message(&flow, advance))
        }),

        ClientMessage::Abandon => on_flow!(state, room_code, flow => {
            flow.handle_abandon()?;
            Ok(turn_message(&flow))
        }),

        ClientMessage::CancelAbandon => on_flow!(state, room_code, flow => {
            flow.cancel_abandon()?;
            Ok(turn_message(&flow))
        }),

        ClientMessage::ConfirmAbandon => on_flow!(state, room_code, flow => {
            flow.confirm_abandon()?;
            Ok(turn_message(&flow))
        }),

        ClientMessage::SentenceNext => on_flow!(state, room_code, flow => {
            let advance = flow.handle_sentence_next().await?;
            Ok(advance_message(&flow, advance))
        }),

        // Action cards
        ClientMessage::UseJoker => on_flow!(state, room_code, flow => {
            let advance = flow.use_joker().await?;
            Ok(advance_message(&flow, advance))
        }),

        ClientMessage::UseReroll => on_flow!(state, room_code, flow => {
            flow.use_reroll().await?;
            Ok(turn_message(&flow))
        }),

        ClientMessage::UseSwap { target_id } => on_flow!(state, room_code, flow => {
            flow.use_swap(&target_id).await?;
            Ok(turn_message(&flow))
        }),

        ClientMessage::UseAccompaniment { partner_id } => on_flow!(state, room_code, flow => {
            flow.use_accompaniment(&partner_id).await?;
            Ok(turn_message(&flow))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::{test_settings, test_state};

    fn error_code(reply: Option<ServerMessage>) -> String {
        match reply {
            Some(ServerMessage::Error { code, .. }) => code,
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_is_broadcast_to_room() {
        let (state, _store, _local) = test_state();
        let state = Arc::new(state);
        let code = state
            .create_session(test_settings(), 2, false)
            .await
            .unwrap()
            .room_code;
        let mut rx = state.broadcast.subscribe();

        let reply = handle_message(
            ClientMessage::AddPlayer {
                name: "Alice".to_string(),
                avatar: None,
            },
            &code,
            &state,
        )
        .await;
        assert!(reply.is_none());

        let published = rx.recv().await.unwrap();
        assert_eq!(published.room_code, code);
        assert!(matches!(
            published.msg,
            ServerMessage::Session { ref session } if session.players.len() == 1
        ));
    }

    #[tokio::test]
    async fn test_turn_command_before_start() {
        let (state, _store, _local) = test_state();
        let state = Arc::new(state);
        let code = state
            .create_session(test_settings(), 2, false)
            .await
            .unwrap()
            .room_code;

        let reply = handle_message(ClientMessage::StartTurn, &code, &state).await;
        assert_eq!(error_code(reply), "INVALID_TURN_STATE");
    }

    #[tokio::test]
    async fn test_unknown_room() {
        let (state, _store, _local) = test_state();
        let state = Arc::new(state);
        let reply = handle_message(ClientMessage::StartGame, "NOPE1", &state).await;
        assert_eq!(error_code(reply), "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_out_of_order_commands_are_rejected() {
        let (state, _store, _local) = test_state();
        let state = Arc::new(state);
        let code = state
            .create_session(test_settings(), 2, false)
            .await
            .unwrap()
            .room_code;
        state.add_player(&code, "Alice", None).await.unwrap();
        assert!(handle_message(ClientMessage::StartGame, &code, &state)
            .await
            .is_none());

        let reply = handle_message(ClientMessage::ValidateChallenge, &code, &state).await;
        assert_eq!(error_code(reply), "INVALID_TURN_STATE");

        let reply = handle_message(
            ClientMessage::UseSwap {
                target_id: "nobody".to_string(),
            },
            &code,
            &state,
        )
        .await;
        assert_eq!(error_code(reply), "ACTION_UNAVAILABLE");
    }
}
