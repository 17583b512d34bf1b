use crate::random::RandomSource;
use crate::types::{Dare, MAX_DIFFICULTY, MIN_DIFFICULTY};

const SOBER_PENALTIES: [&[&str]; 4] = [
    &[
        "Compliment the player on your right.",
        "Speak with an accent until your next turn.",
    ],
    &[
        "Do ten push-ups.",
        "Let the group choose your nickname for the next round.",
    ],
    &[
        "Let the group post a story on your account.",
        "Keep an ice cube in your hand until it melts.",
    ],
    &[
        "Call someone from your contacts chosen by the group.",
        "Give your phone to the player on your left for one round.",
    ],
];

const ALCOHOL_PENALTIES: [&[&str]; 4] = [
    &["Take one sip.", "Take one sip with your weak hand."],
    &["Take two sips.", "Pick someone to drink two sips with you."],
    &["Take three sips.", "Finish half of your glass."],
    &["Down a shot.", "Finish your glass."],
];

/// Penalty shown when a dare is abandoned or the timer runs out.
///
/// The dare's own penalty wins; otherwise one entry is drawn from the table
/// for its difficulty and the session's alcohol mode.
pub fn penalty_for(dare: &Dare, alcohol_mode: bool, rng: &mut dyn RandomSource) -> String {
    if let Some(penalty) = &dare.penalty {
        return penalty.clone();
    }

    let level = dare.difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY) - MIN_DIFFICULTY;
    let table = if alcohol_mode {
        ALCOHOL_PENALTIES[level as usize]
    } else {
        SOBER_PENALTIES[level as usize]
    };
    table[rng.next_index(table.len())].to_string()
}
