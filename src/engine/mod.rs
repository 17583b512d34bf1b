//! Pure turn-progression rules.
//!
//! Nothing in here touches a store, a clock or a global generator: the
//! controller in [`crate::flow`] feeds these functions its session state and
//! an injected [`crate::random::RandomSource`].

pub mod filter;
pub mod penalty;
pub mod ranking;
pub mod round;
pub mod turn;

pub use filter::{eligible_dares, pick_dare, session_pool, WANT_BOOST_PROBABILITY};
pub use penalty::penalty_for;
pub use ranking::{compare_standing, final_ranking, Ranking};
pub use round::{advance_round, is_game_over, RoundProgress};
pub use turn::{first_player, next_player};
