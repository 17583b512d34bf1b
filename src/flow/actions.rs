//! Action cards: joker, reroll, swap and accompaniment.
//!
//! Each card is spent by the current turn-holder while their card is on
//! screen (IDLE or PLAYING). Counters are decremented locally first and
//! then in the session store.

use super::{Advance, TurnFlow, TurnOutcome, TurnPhase, TurnView};
use crate::error::{GameError, GameResult};
use crate::types::{Dare, PlayerAttribute, PlayerId, SessionStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    Joker,
    Reroll,
    Swap,
    Accompaniment,
}

impl PlayerAction {
    fn attribute(self) -> PlayerAttribute {
        match self {
            PlayerAction::Joker => PlayerAttribute::Jokers,
            PlayerAction::Reroll => PlayerAttribute::Rerolls,
            PlayerAction::Swap => PlayerAttribute::Swaps,
            PlayerAction::Accompaniment => PlayerAttribute::Accompaniments,
        }
    }
}

impl TurnFlow {
    /// Cards the turn-holder can play right now; an exhausted counter hides
    /// its action
    pub fn available_actions(&self) -> Vec<PlayerAction> {
        if self.session.status != SessionStatus::Active
            || !matches!(self.view.phase, TurnPhase::Idle | TurnPhase::Playing)
        {
            return Vec::new();
        }
        let Some(player) = self.session.current_player() else {
            return Vec::new();
        };

        let mut actions = Vec::new();
        if player.jokers_left > 0 {
            actions.push(PlayerAction::Joker);
        }
        if player.rerolls_left > 0 {
            actions.push(PlayerAction::Reroll);
        }
        if player.swaps_left > 0 && !self.swap_targets().is_empty() {
            actions.push(PlayerAction::Swap);
        }
        if player.accompaniments_left > 0
            && self.view.accompanist_id.is_none()
            && !self.partner_candidates().is_empty()
        {
            actions.push(PlayerAction::Accompaniment);
        }
        actions
    }

    /// Active players the turn-holder may swap with this turn
    pub fn swap_targets(&self) -> Vec<PlayerId> {
        let current = self.session.current_turn_player_id.as_deref();
        self.session
            .players
            .iter()
            .filter(|p| Some(p.id.as_str()) != current)
            .filter(|p| !p.is_paused)
            .filter(|p| !self.session.swap_used_by_player_ids.contains(&p.id))
            .map(|p| p.id.clone())
            .collect()
    }

    fn partner_candidates(&self) -> Vec<PlayerId> {
        let current = self.session.current_turn_player_id.as_deref();
        self.session
            .players
            .iter()
            .filter(|p| Some(p.id.as_str()) != current && !p.is_paused)
            .map(|p| p.id.clone())
            .collect()
    }

    fn require_action(&self, action: PlayerAction) -> GameResult<PlayerId> {
        let player_id = self.current_player_id()?;
        if !self.available_actions().contains(&action) {
            return Err(GameError::ActionUnavailable(format!(
                "{:?} is not available to {}",
                action, player_id
            )));
        }
        Ok(player_id)
    }

    /// Spend one card locally, then in the session store
    async fn spend(&mut self, player_id: &str, action: PlayerAction) -> GameResult<()> {
        let attribute = action.attribute();
        let player = self
            .session
            .player_mut(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        let counter = player.attribute_mut(attribute);
        *counter = counter.saturating_sub(1);

        self.save_local().await;
        let result = self
            .store
            .decrement_player_attribute(&self.session.id, player_id, attribute)
            .await;
        self.note_remote(result, "decrement_player_attribute");

        tracing::info!(
            "Player {} used {:?} in session {}",
            player_id,
            action,
            self.session.id
        );
        Ok(())
    }

    /// Skip the dare without a penalty or a point; the turn counts as played
    pub async fn use_joker(&mut self) -> GameResult<Advance> {
        let player_id = self.require_action(PlayerAction::Joker)?;
        self.spend(&player_id, PlayerAction::Joker).await?;
        self.advance(TurnOutcome::Jokered).await
    }

    /// Replace the card with another one; same player, same turn
    pub async fn use_reroll(&mut self) -> GameResult<()> {
        let player_id = self.require_action(PlayerAction::Reroll)?;
        let current_dare = self.session.current_dare.as_ref().map(|d| d.id.clone());
        let dare = self.draw_for(&player_id, current_dare.as_deref())?;

        self.spend(&player_id, PlayerAction::Reroll).await?;
        self.remount(player_id, dare);
        self.persist_turn().await;
        Ok(())
    }

    /// Hand the current dare to another player. The two exchange seats and
    /// neither can take part in another swap this turn.
    pub async fn use_swap(&mut self, target_id: &str) -> GameResult<()> {
        let player_id = self.require_action(PlayerAction::Swap)?;
        if !self.swap_targets().iter().any(|id| id == target_id) {
            return Err(GameError::ActionUnavailable(format!(
                "Cannot swap with {}",
                target_id
            )));
        }
        let dare = self
            .session
            .current_dare
            .clone()
            .ok_or_else(|| GameError::InvalidTurnState("No dare drawn".to_string()))?;

        self.spend(&player_id, PlayerAction::Swap).await?;

        let from = self.session.players.iter().position(|p| p.id == player_id);
        let to = self.session.players.iter().position(|p| p.id == target_id);
        if let (Some(from), Some(to)) = (from, to) {
            self.session.players.swap(from, to);
        }
        for id in [player_id, target_id.to_string()] {
            if !self.session.swap_used_by_player_ids.contains(&id) {
                self.session.swap_used_by_player_ids.push(id);
            }
        }

        self.view.accompanist_id = None;
        self.remount(target_id.to_string(), dare);
        self.persist_players().await;
        self.persist_turn().await;
        Ok(())
    }

    /// Ask another active player to join the dare; they score with the
    /// turn-holder on validation
    pub async fn use_accompaniment(&mut self, partner_id: &str) -> GameResult<()> {
        let player_id = self.require_action(PlayerAction::Accompaniment)?;
        if !self.partner_candidates().iter().any(|id| id == partner_id) {
            return Err(GameError::ActionUnavailable(format!(
                "{} cannot accompany this turn",
                partner_id
            )));
        }
        let dare = self
            .session
            .current_dare
            .clone()
            .ok_or_else(|| GameError::InvalidTurnState("No dare drawn".to_string()))?;

        self.spend(&player_id, PlayerAction::Accompaniment).await?;
        self.view.accompanist_id = Some(partner_id.to_string());
        self.remount(player_id, dare);
        self.persist_turn().await;
        Ok(())
    }

    /// Put a card back face-down under a fresh turn counter without touching
    /// the round or the swap list. Any running timer is dropped.
    fn remount(&mut self, player_id: PlayerId, dare: Dare) {
        self.cancel_timer();
        self.set_turn(player_id, dare);
        self.view = TurnView {
            accompanist_id: self.view.accompanist_id.take(),
            ..TurnView::idle(true)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{dare, flow_with, play_validated, started, waiting_session};
    use super::*;
    use crate::store::SessionStore;

    #[tokio::test]
    async fn test_default_allowance_offers_every_action() {
        let (flow, _harness) = started(&["a", "b"], 2).await;
        assert_eq!(
            flow.available_actions(),
            vec![
                PlayerAction::Joker,
                PlayerAction::Reroll,
                PlayerAction::Swap,
                PlayerAction::Accompaniment
            ]
        );
    }

    #[tokio::test]
    async fn test_exhausted_joker_is_hidden() {
        let mut session = waiting_session(&["a", "b"], 2);
        session.players[0].jokers_left = 0;
        let (mut flow, _harness) = flow_with(session, vec![dare("d1", 1), dare("d2", 1)]).await;
        flow.start_game().await.unwrap();

        let actions = flow.available_actions();
        assert!(!actions.contains(&PlayerAction::Joker));
        assert!(actions.contains(&PlayerAction::Reroll));
        assert!(matches!(
            flow.use_joker().await,
            Err(GameError::ActionUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_no_actions_during_penalty() {
        let (mut flow, _harness) = started(&["a", "b"], 2).await;
        flow.start_turn().await.unwrap();
        flow.confirm_abandon().unwrap();
        assert!(flow.available_actions().is_empty());
    }

    #[tokio::test]
    async fn test_joker_skips_without_point() {
        let (mut flow, harness) = started(&["a", "b"], 3).await;

        let advance = flow.use_joker().await.unwrap();
        assert!(matches!(advance, Advance::NextTurn { ref player_id, .. } if player_id == "b"));
        let a = flow.session().player("a").unwrap();
        assert_eq!(a.jokers_left, 0);
        assert_eq!(a.score, 0);
        assert_eq!(flow.session().players_played_this_round, 1);

        let remote = harness.store.get_session("s1").await.unwrap().unwrap();
        assert_eq!(remote.player("a").unwrap().jokers_left, 0);
    }

    #[tokio::test]
    async fn test_reroll_draws_a_different_dare() {
        let (mut flow, _harness) = started(&["a", "b"], 3).await;
        let before = flow.session().current_dare.clone().unwrap();
        let counter = flow.session().turn_counter;

        flow.use_reroll().await.unwrap();

        let after = flow.session().current_dare.clone().unwrap();
        assert_ne!(before.id, after.id);
        assert_eq!(flow.session().current_turn_player_id.as_deref(), Some("a"));
        assert_eq!(flow.session().turn_counter, counter + 1);
        assert_eq!(flow.session().players_played_this_round, 0);
        assert_eq!(flow.session().player("a").unwrap().rerolls_left, 1);
        assert_eq!(flow.view().phase, TurnPhase::Idle);
    }

    #[tokio::test]
    async fn test_reroll_with_single_dare_keeps_it() {
        let (mut flow, _harness) = flow_with(waiting_session(&["a"], 2), vec![dare("only", 1)]).await;
        flow.start_game().await.unwrap();
        flow.use_reroll().await.unwrap();
        assert_eq!(flow.session().current_dare.as_ref().unwrap().id, "only");
    }

    #[tokio::test]
    async fn test_reroll_while_playing_cancels_timer() {
        let mut session = waiting_session(&["a", "b"], 2);
        session.settings.difficulty = 3;
        let (mut flow, _harness) =
            flow_with(session, vec![dare("x", 3), dare("y", 3)]).await;
        flow.start_game().await.unwrap();
        flow.start_turn().await.unwrap();
        assert!(flow.view().timer_active);
        let stale = flow.session().turn_counter;

        flow.use_reroll().await.unwrap();
        assert!(!flow.view().timer_active);
        assert!(!flow.handle_timer_complete(stale));
    }

    #[tokio::test]
    async fn test_swap_exchanges_seats_and_turn() {
        let (mut flow, harness) = started(&["a", "b", "c"], 3).await;

        flow.use_swap("c").await.unwrap();

        let seats: Vec<&str> = flow.session().players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(seats, vec!["c", "b", "a"]);
        assert_eq!(flow.session().current_turn_player_id.as_deref(), Some("c"));
        assert_eq!(flow.session().player("a").unwrap().swaps_left, 0);
        assert_eq!(
            flow.session().swap_used_by_player_ids,
            vec!["a".to_string(), "c".to_string()]
        );

        // c cannot bounce the turn back to a this turn
        assert_eq!(flow.swap_targets(), vec!["b".to_string()]);

        let remote = harness.store.get_session("s1").await.unwrap().unwrap();
        assert_eq!(remote.current_turn_player_id.as_deref(), Some("c"));
        assert_eq!(remote.players[0].id, "c");
    }

    #[tokio::test]
    async fn test_swap_with_paused_or_self_is_rejected() {
        let (mut flow, _harness) = started(&["a", "b", "c"], 3).await;
        flow.toggle_pause("b").await.unwrap();

        assert!(matches!(
            flow.use_swap("b").await,
            Err(GameError::ActionUnavailable(_))
        ));
        assert!(matches!(
            flow.use_swap("a").await,
            Err(GameError::ActionUnavailable(_))
        ));
        assert_eq!(flow.session().player("a").unwrap().swaps_left, 1);
    }

    #[tokio::test]
    async fn test_accompanist_scores_with_turn_holder() {
        let (mut flow, _harness) = started(&["a", "b", "c"], 3).await;

        flow.use_accompaniment("c").await.unwrap();
        assert_eq!(flow.view().accompanist_id.as_deref(), Some("c"));
        assert!(!flow.available_actions().contains(&PlayerAction::Accompaniment));

        play_validated(&mut flow).await;
        assert_eq!(flow.session().player("a").unwrap().score, 1);
        assert_eq!(flow.session().player("c").unwrap().score, 1);
        assert_eq!(flow.session().player("b").unwrap().score, 0);
        assert!(flow.view().accompanist_id.is_none());
    }

    #[tokio::test]
    async fn test_accompanist_gets_nothing_on_abandon() {
        let (mut flow, _harness) = started(&["a", "b"], 3).await;
        flow.use_accompaniment("b").await.unwrap();
        flow.start_turn().await.unwrap();
        flow.confirm_abandon().unwrap();
        flow.handle_sentence_next().await.unwrap();

        assert_eq!(flow.session().player("b").unwrap().score, 0);
        assert_eq!(flow.session().player("a").unwrap().accompaniments_left, 0);
    }

    #[tokio::test]
    async fn test_solo_player_has_no_partner_actions() {
        let (mut flow, _harness) = flow_with(waiting_session(&["a"], 1), vec![dare("d", 1)]).await;
        flow.start_game().await.unwrap();
        assert_eq!(
            flow.available_actions(),
            vec![PlayerAction::Joker, PlayerAction::Reroll]
        );
    }
}
