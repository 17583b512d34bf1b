use crate::types::Player;

/// Next non-paused player after `current_id`, scanning forward with
/// wraparound.
///
/// The scan visits at most `players.len()` seats. If everyone is paused it
/// stops there and hands back the last seat visited (the current player
/// itself when `current_id` is seated) instead of spinning. An unknown or
/// missing `current_id` starts the scan at seat 0.
pub fn next_player<'a>(players: &'a [Player], current_id: Option<&str>) -> Option<&'a Player> {
    if players.is_empty() {
        return None;
    }

    let len = players.len();
    let start = current_id
        .and_then(|id| players.iter().position(|p| p.id == id))
        .unwrap_or(len - 1);

    let mut visited = &players[start];
    for step in 1..=len {
        visited = &players[(start + step) % len];
        if !visited.is_paused {
            return Some(visited);
        }
    }

    Some(visited)
}

/// Opening turn-holder: the first non-paused seat
pub fn first_player(players: &[Player]) -> Option<&Player> {
    next_player(players, None)
}
