use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type SessionId = String;
pub type PlayerId = String;
pub type DareId = String;
pub type HistoryId = String;
pub type Category = String;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 4;

/// A challenge card drawn by the turn-holder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dare {
    pub id: DareId,
    pub text: String,
    /// 1 (soft) to 4 (extreme)
    pub difficulty: u8,
    pub categories: Vec<Category>,
    /// Overrides the penalty table when the dare is abandoned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty: Option<String>,
    #[serde(default = "default_reward")]
    pub reward: u32,
}

fn default_reward() -> u32 {
    1
}

impl Dare {
    pub fn has_any_category(&self, categories: &[Category]) -> bool {
        self.categories.iter().any(|c| categories.contains(c))
    }
}

/// Want/avoid lists picked by a player in the lobby
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryPreferences {
    #[serde(default)]
    pub want: Vec<Category>,
    #[serde(default)]
    pub avoid: Vec<Category>,
}

impl CategoryPreferences {
    pub fn is_empty(&self) -> bool {
        self.want.is_empty() && self.avoid.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub score: u32,
    pub jokers_left: u32,
    pub rerolls_left: u32,
    pub swaps_left: u32,
    #[serde(default)]
    pub accompaniments_left: u32,
    pub is_paused: bool,
    /// Sticky: once paused, the player is an adventurer for the final ranking
    pub has_been_paused: bool,
    #[serde(default)]
    pub preferences: CategoryPreferences,
}

impl Player {
    pub fn new(name: String, avatar: Option<String>, allowance: &ActionAllowance) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name,
            avatar,
            score: 0,
            jokers_left: allowance.jokers,
            rerolls_left: allowance.rerolls,
            swaps_left: allowance.swaps,
            accompaniments_left: allowance.accompaniments,
            is_paused: false,
            has_been_paused: false,
            preferences: CategoryPreferences::default(),
        }
    }

    /// Remaining joker + reroll + swap cards, used as the end-game tiebreaker
    pub fn actions_left(&self) -> u32 {
        self.jokers_left + self.rerolls_left + self.swaps_left
    }

    pub fn attribute_mut(&mut self, attribute: PlayerAttribute) -> &mut u32 {
        match attribute {
            PlayerAttribute::Jokers => &mut self.jokers_left,
            PlayerAttribute::Rerolls => &mut self.rerolls_left,
            PlayerAttribute::Swaps => &mut self.swaps_left,
            PlayerAttribute::Accompaniments => &mut self.accompaniments_left,
        }
    }
}

/// Decrementable per-player counters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAttribute {
    Jokers,
    Rerolls,
    Swaps,
    Accompaniments,
}

/// Action cards handed to every player when they join
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionAllowance {
    pub jokers: u32,
    pub rerolls: u32,
    pub swaps: u32,
    pub accompaniments: u32,
}

impl Default for ActionAllowance {
    fn default() -> Self {
        Self {
            jokers: 1,
            rerolls: 2,
            swaps: 1,
            accompaniments: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Waiting,
    Active,
    Finished,
}

impl SessionStatus {
    /// Status only ever moves forward: WAITING -> ACTIVE -> FINISHED
    pub fn can_transition_to(&self, to: SessionStatus) -> bool {
        matches!(
            (self, to),
            (SessionStatus::Waiting, SessionStatus::Active)
                | (SessionStatus::Active, SessionStatus::Finished)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSettings {
    pub difficulty: u8,
    pub categories: Vec<Category>,
    /// Countdown for dares of difficulty 2 and above (0 disables the timer)
    pub timer_seconds: u32,
    pub alcohol_mode: bool,
    #[serde(default)]
    pub allowance: ActionAllowance,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            difficulty: 2,
            categories: vec!["fun".to_string(), "social".to_string()],
            timer_seconds: 60,
            alcohol_mode: false,
            allowance: ActionAllowance::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSession {
    pub id: SessionId,
    pub room_code: String,
    pub status: SessionStatus,
    pub settings: GameSettings,
    pub players: Vec<Player>,
    pub current_turn_player_id: Option<PlayerId>,
    pub current_dare: Option<Dare>,
    pub rounds_total: u32,
    pub rounds_completed: u32,
    pub players_played_this_round: u32,
    pub progressive: bool,
    /// Monotonic, bumped whenever the card on screen changes
    pub turn_counter: u64,
    pub swap_used_by_player_ids: Vec<PlayerId>,
    #[serde(default)]
    pub used_dare_ids: Vec<DareId>,
    pub created_at: String,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

impl GameSession {
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.current_turn_player_id
            .as_deref()
            .and_then(|id| self.player(id))
    }

    pub fn active_player_count(&self) -> u32 {
        self.players.iter().filter(|p| !p.is_paused).count() as u32
    }

    /// The payload pushed to the session store after every turn change
    pub fn turn_update(&self) -> TurnUpdate {
        TurnUpdate {
            current_turn_player_id: self.current_turn_player_id.clone(),
            current_dare: self.current_dare.clone(),
            rounds_completed: self.rounds_completed,
            players_played_this_round: self.players_played_this_round,
            started_at: self.started_at.clone(),
            turn_counter: self.turn_counter,
            swap_used_by_player_ids: self.swap_used_by_player_ids.clone(),
        }
    }

    pub fn apply_turn_update(&mut self, turn: TurnUpdate) {
        self.current_turn_player_id = turn.current_turn_player_id;
        self.current_dare = turn.current_dare;
        self.rounds_completed = turn.rounds_completed;
        self.players_played_this_round = turn.players_played_this_round;
        self.started_at = turn.started_at;
        self.turn_counter = turn.turn_counter;
        self.swap_used_by_player_ids = turn.swap_used_by_player_ids;
    }
}

/// Turn tuple written by `updateGameTurn`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnUpdate {
    pub current_turn_player_id: Option<PlayerId>,
    pub current_dare: Option<Dare>,
    pub rounds_completed: u32,
    pub players_played_this_round: u32,
    pub started_at: Option<String>,
    pub turn_counter: u64,
    pub swap_used_by_player_ids: Vec<PlayerId>,
}

/// Partial session update; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<Player>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_dare_ids: Option<Vec<DareId>>,
}

/// One line of the end-of-game podium
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedPlayer {
    pub player_id: PlayerId,
    pub name: String,
    pub avatar: Option<String>,
    pub score: u32,
    pub actions_left: u32,
}

impl From<&Player> for RankedPlayer {
    fn from(p: &Player) -> Self {
        Self {
            player_id: p.id.clone(),
            name: p.name.clone(),
            avatar: p.avatar.clone(),
            score: p.score,
            actions_left: p.actions_left(),
        }
    }
}

/// Snapshot written once when a session finishes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    pub id: HistoryId,
    pub session_id: SessionId,
    pub room_code: String,
    /// The GOAT
    pub winner: RankedPlayer,
    /// The Chèvre; absent in solo games
    pub loser: Option<RankedPlayer>,
    pub others: Vec<RankedPlayer>,
    /// Players paused at least once, kept out of the ranking
    pub adventurers: Vec<RankedPlayer>,
    pub rounds_total: u32,
    pub rounds_completed: u32,
    pub difficulty: u8,
    pub categories: Vec<Category>,
    pub alcohol_mode: bool,
    pub finished_at: String,
}

/// Locally stored user profile, used to prefill the lobby
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    #[serde(default)]
    pub preferences: CategoryPreferences,
    #[serde(default)]
    pub default_settings: Option<GameSettings>,
}
