/// Counters after one more turn has been played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundProgress {
    pub players_played_this_round: u32,
    pub rounds_completed: u32,
    pub round_completed: bool,
}

/// Count one finished turn.
///
/// The play counter resets as soon as it reaches the number of active
/// players, and that turn closes the round. Pausing mid-round can shrink the
/// active count below the play counter, so the comparison is `>=`.
pub fn advance_round(
    players_played_this_round: u32,
    rounds_completed: u32,
    active_player_count: u32,
) -> RoundProgress {
    let played = players_played_this_round + 1;
    if played >= active_player_count {
        RoundProgress {
            players_played_this_round: 0,
            rounds_completed: rounds_completed + 1,
            round_completed: true,
        }
    } else {
        RoundProgress {
            players_played_this_round: played,
            rounds_completed,
            round_completed: false,
        }
    }
}

pub fn is_game_over(rounds_completed: u32, rounds_total: u32) -> bool {
    rounds_completed >= rounds_total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_player_closes_round() {
        for active in 1..=8u32 {
            for completed in 0..3u32 {
                let progress = advance_round(active - 1, completed, active);
                assert_eq!(progress.players_played_this_round, 0);
                assert_eq!(progress.rounds_completed, completed + 1);
                assert!(progress.round_completed);
            }
        }
    }

    #[test]
    fn test_mid_round_only_counts_the_play() {
        for active in 2..=8u32 {
            for played in 0..active - 1 {
                let progress = advance_round(played, 4, active);
                assert_eq!(progress.players_played_this_round, played + 1);
                assert_eq!(progress.rounds_completed, 4);
                assert!(!progress.round_completed);
            }
        }
    }

    #[test]
    fn test_shrunk_table_still_closes_round() {
        // Two of four played, then two paused: next play closes the round
        let progress = advance_round(2, 0, 2);
        assert_eq!(progress.players_played_this_round, 0);
        assert_eq!(progress.rounds_completed, 1);
    }

    #[test]
    fn test_game_over() {
        assert!(!is_game_over(1, 2));
        assert!(is_game_over(2, 2));
        assert!(is_game_over(3, 2));
    }
}
