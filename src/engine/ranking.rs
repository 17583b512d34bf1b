use crate::types::{Player, RankedPlayer};
use std::cmp::Ordering;

/// Final podium, best first
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub ranked: Vec<RankedPlayer>,
    /// Ever-paused players left out of `ranked`
    pub adventurers: Vec<RankedPlayer>,
}

impl Ranking {
    pub fn winner(&self) -> Option<&RankedPlayer> {
        self.ranked.first()
    }

    /// Bottom of the table; none in a solo game
    pub fn loser(&self) -> Option<&RankedPlayer> {
        if self.ranked.len() < 2 {
            return None;
        }
        self.ranked.last()
    }

    /// Everyone between winner and loser
    pub fn others(&self) -> &[RankedPlayer] {
        if self.ranked.len() <= 2 {
            return &[];
        }
        &self.ranked[1..self.ranked.len() - 1]
    }
}

/// Higher score first; on equal score, more unused joker/reroll/swap cards
/// first.
pub fn compare_standing(a: &RankedPlayer, b: &RankedPlayer) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.actions_left.cmp(&a.actions_left))
}

/// Rank players who were never paused. Players paused at least once are
/// adventurers and only get ranked when nobody else is left. Full ties keep
/// seating order.
pub fn final_ranking(players: &[Player]) -> Ranking {
    let (adventurers, competitors): (Vec<&Player>, Vec<&Player>) =
        players.iter().partition(|p| p.has_been_paused);

    let mut adventurers: Vec<RankedPlayer> = adventurers.into_iter().map(Into::into).collect();
    let mut ranked: Vec<RankedPlayer> = competitors.into_iter().map(Into::into).collect();

    if ranked.is_empty() {
        ranked = std::mem::take(&mut adventurers);
    }

    // sort_by is stable: equal standings stay in seating order
    ranked.sort_by(compare_standing);
    adventurers.sort_by(compare_standing);

    Ranking {
        ranked,
        adventurers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionAllowance;

    fn player(id: &str, score: u32, actions: u32) -> Player {
        let mut p = Player::new(id.to_string(), None, &ActionAllowance::default());
        p.id = id.to_string();
        p.score = score;
        p.jokers_left = actions;
        p.rerolls_left = 0;
        p.swaps_left = 0;
        p
    }

    fn order(ranking: &Ranking) -> Vec<&str> {
        ranking.ranked.iter().map(|r| r.player_id.as_str()).collect()
    }

    #[test]
    fn test_score_then_actions() {
        let players = vec![
            player("a", 3, 0),
            player("b", 5, 0),
            player("c", 3, 2),
            player("d", 1, 4),
        ];
        let ranking = final_ranking(&players);
        assert_eq!(order(&ranking), vec!["b", "c", "a", "d"]);
        assert_eq!(ranking.winner().unwrap().player_id, "b");
        assert_eq!(ranking.loser().unwrap().player_id, "d");
        assert_eq!(ranking.others().len(), 2);
    }

    #[test]
    fn test_full_tie_keeps_seating_order() {
        let players = vec![player("a", 5, 2), player("b", 5, 2)];
        let ranking = final_ranking(&players);
        assert_eq!(ranking.winner().unwrap().player_id, "a");
        assert_eq!(ranking.loser().unwrap().player_id, "b");

        let swapped = vec![player("b", 5, 2), player("a", 5, 2)];
        assert_eq!(final_ranking(&swapped).winner().unwrap().player_id, "b");
    }

    #[test]
    fn test_adventurers_are_excluded() {
        let mut paused = player("p", 9, 9);
        paused.has_been_paused = true;
        let players = vec![player("a", 1, 0), paused, player("b", 2, 0)];

        let ranking = final_ranking(&players);
        assert_eq!(order(&ranking), vec!["b", "a"]);
        assert_eq!(ranking.adventurers.len(), 1);
        assert_eq!(ranking.adventurers[0].player_id, "p");
    }

    #[test]
    fn test_only_adventurers_get_ranked_among_themselves() {
        let mut x = player("x", 1, 0);
        let mut y = player("y", 4, 0);
        x.has_been_paused = true;
        y.has_been_paused = true;

        let ranking = final_ranking(&[x, y]);
        assert_eq!(order(&ranking), vec!["y", "x"]);
        assert!(ranking.adventurers.is_empty());
    }

    #[test]
    fn test_solo_game_has_no_loser() {
        let ranking = final_ranking(&[player("solo", 3, 1)]);
        assert_eq!(ranking.winner().unwrap().player_id, "solo");
        assert!(ranking.loser().is_none());
        assert!(ranking.others().is_empty());
    }

    #[test]
    fn test_empty_table() {
        let ranking = final_ranking(&[]);
        assert!(ranking.winner().is_none());
        assert!(ranking.loser().is_none());
    }
}
