use crate::random::RandomSource;
use crate::types::{CategoryPreferences, Dare, GameSession, MAX_DIFFICULTY, MIN_DIFFICULTY};

/// Chance that a player's wanted category overrides the normal draw
pub const WANT_BOOST_PROBABILITY: f64 = 0.20;

/// Candidate dares for one player.
///
/// Avoided categories are removed first, unless that would leave nothing, in
/// which case the avoid list is ignored: avoid is advisory and never blocks
/// play. Then, with probability [`WANT_BOOST_PROBABILITY`], the draw is
/// restricted to dares in a wanted category when any exist. One roll is
/// consumed per call.
///
/// Never returns an empty set for a non-empty `pool`.
pub fn eligible_dares<'a>(
    pool: &[&'a Dare],
    preferences: &CategoryPreferences,
    rng: &mut dyn RandomSource,
) -> Vec<&'a Dare> {
    let mut candidates: Vec<&'a Dare> = pool
        .iter()
        .copied()
        .filter(|d| !d.has_any_category(&preferences.avoid))
        .collect();
    if candidates.is_empty() {
        candidates = pool.to_vec();
    }

    let wanted: Vec<&'a Dare> = candidates
        .iter()
        .copied()
        .filter(|d| d.has_any_category(&preferences.want))
        .collect();

    let boost = rng.next_f64() < WANT_BOOST_PROBABILITY;
    if boost && !wanted.is_empty() {
        wanted
    } else {
        candidates
    }
}

/// Difficulty used for the next draw
pub fn effective_difficulty(session: &GameSession) -> u8 {
    if !session.progressive {
        return session.settings.difficulty;
    }
    let total = session.rounds_total.max(1) as u64;
    let step = session.rounds_completed as u64 * MAX_DIFFICULTY as u64 / total;
    (MIN_DIFFICULTY as u64 + step).min(MAX_DIFFICULTY as u64) as u8
}

/// Narrow the full pool to what suits this session: its categories, its
/// current difficulty, and dares not drawn yet. Each step falls back to the
/// previous set when it would empty it.
pub fn session_pool<'a>(pool: &'a [Dare], session: &GameSession) -> Vec<&'a Dare> {
    let all: Vec<&'a Dare> = pool.iter().collect();

    let categories = &session.settings.categories;
    let by_category = narrow(all, |d| {
        categories.is_empty() || d.has_any_category(categories)
    });

    let difficulty = effective_difficulty(session);
    let by_difficulty = narrow(by_category, |d| d.difficulty == difficulty);

    narrow(by_difficulty, |d| !session.used_dare_ids.contains(&d.id))
}

fn narrow<'a>(dares: Vec<&'a Dare>, keep: impl Fn(&Dare) -> bool) -> Vec<&'a Dare> {
    let narrowed: Vec<&'a Dare> = dares.iter().copied().filter(|d| keep(*d)).collect();
    if narrowed.is_empty() {
        dares
    } else {
        narrowed
    }
}

/// Draw the next dare for a player. `exclude` (the dare being rerolled) is
/// skipped whenever anything else is available.
pub fn pick_dare(
    pool: &[Dare],
    session: &GameSession,
    preferences: &CategoryPreferences,
    exclude: Option<&str>,
    rng: &mut dyn RandomSource,
) -> Option<Dare> {
    let mut base = session_pool(pool, session);
    if let Some(excluded) = exclude {
        if base.iter().any(|d| d.id != excluded) {
            base.retain(|d| d.id != excluded);
        } else if let Some(other) = pool.iter().find(|d| d.id != excluded) {
            // Session narrowing left only the current card
            base = vec![other];
        }
    }

    let candidates = eligible_dares(&base, preferences, rng);
    if candidates.is_empty() {
        return None;
    }
    let index = rng.next_index(candidates.len());
    Some(candidates[index].clone())
}
