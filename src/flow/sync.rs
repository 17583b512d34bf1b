//! Reconciling the local session copy with documents pushed by the store.
//!
//! The controller writes optimistically, so its copy is the pending tier and
//! the store's feed is the confirmed tier. The rule: a remote document older
//! than the local turn is a stale echo and is dropped; anything else wins
//! over the local copy.

use crate::types::{GameSession, SessionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Replace the local copy. `turn_changed` means the card on screen is
    /// no longer the one the local view was built for.
    AdoptRemote { turn_changed: bool },
    KeepLocal,
}

pub fn reconcile(local: &GameSession, remote: &GameSession) -> Reconcile {
    if local.id != remote.id {
        return Reconcile::KeepLocal;
    }
    if remote.turn_counter < local.turn_counter {
        return Reconcile::KeepLocal;
    }
    // Status is one-way: a finished game stays finished
    if local.status == SessionStatus::Finished && remote.status != SessionStatus::Finished {
        return Reconcile::KeepLocal;
    }

    let turn_changed = remote.turn_counter != local.turn_counter
        || remote.current_turn_player_id != local.current_turn_player_id;
    Reconcile::AdoptRemote { turn_changed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameSettings;

    fn session(turn_counter: u64, holder: &str) -> GameSession {
        GameSession {
            id: "s1".to_string(),
            room_code: "ABCDE".to_string(),
            status: SessionStatus::Active,
            settings: GameSettings::default(),
            players: Vec::new(),
            current_turn_player_id: Some(holder.to_string()),
            current_dare: None,
            rounds_total: 2,
            rounds_completed: 0,
            players_played_this_round: 0,
            progressive: false,
            turn_counter,
            swap_used_by_player_ids: Vec::new(),
            used_dare_ids: Vec::new(),
            created_at: String::new(),
            started_at: None,
            archived: false,
        }
    }

    #[test]
    fn test_stale_echo_is_ignored() {
        assert_eq!(
            reconcile(&session(5, "a"), &session(4, "b")),
            Reconcile::KeepLocal
        );
    }

    #[test]
    fn test_same_turn_conflict_remote_wins() {
        let local = session(5, "a");
        let mut remote = session(5, "a");
        remote.players_played_this_round = 2;
        assert_eq!(
            reconcile(&local, &remote),
            Reconcile::AdoptRemote {
                turn_changed: false
            }
        );

        // Same counter but someone else holds the turn
        assert_eq!(
            reconcile(&local, &session(5, "b")),
            Reconcile::AdoptRemote { turn_changed: true }
        );
    }

    #[test]
    fn test_newer_turn_is_adopted() {
        assert_eq!(
            reconcile(&session(5, "a"), &session(6, "b")),
            Reconcile::AdoptRemote { turn_changed: true }
        );
    }

    #[test]
    fn test_finished_is_terminal() {
        let mut local = session(5, "a");
        local.status = SessionStatus::Finished;
        assert_eq!(reconcile(&local, &session(6, "b")), Reconcile::KeepLocal);
    }

    #[test]
    fn test_other_session_is_ignored() {
        let mut remote = session(9, "a");
        remote.id = "s2".to_string();
        assert_eq!(reconcile(&session(1, "a"), &remote), Reconcile::KeepLocal);
    }
}
