//! The dare pool.
//!
//! Dares are immutable once loaded. The host either uses the built-in seed
//! deck or replaces it with a JSON file (`SOCIAL_CHAOS_DARES`).

use crate::error::{GameError, GameResult};
use crate::types::{Category, Dare, MAX_DIFFICULTY, MIN_DIFFICULTY};
use std::collections::HashSet;
use std::path::Path;

/// (id, difficulty, categories, text, penalty)
type SeedDare = (&'static str, u8, &'static [&'static str], &'static str, Option<&'static str>);

const SEED_DARES: &[SeedDare] = &[
    ("d-001", 1, &["fun"], "Imitate the player on your left for the next 30 seconds.", None),
    ("d-002", 1, &["social"], "Tell everyone the last thing you searched for online.", None),
    ("d-003", 1, &["fun", "creative"], "Invent a slogan for the player on your right.", None),
    ("d-004", 1, &["physical"], "Hold a plank until your next turn is announced.", None),
    ("d-005", 1, &["drink"], "Cheers with every player, looking each one in the eye.", None),
    ("d-006", 1, &["social"], "Reveal your most useless talent, then demonstrate it.", None),
    ("d-007", 2, &["fun"], "Speak only in questions until the end of the round.", None),
    ("d-008", 2, &["creative"], "Sing the chorus of a song chosen by the group.", None),
    ("d-009", 2, &["physical"], "Do ten squats while reciting the alphabet backwards.", None),
    ("d-010", 2, &["social", "hot"], "Give a sincere compliment to every player.", None),
    ("d-011", 2, &["drink"], "Invent a toast and make everyone raise their glass.", Some("Finish your glass.")),
    ("d-012", 2, &["fun", "social"], "Let the group pick your new nickname for the rest of the game.", None),
    ("d-013", 3, &["hot"], "Whisper your best pickup line to the player of your choice.", None),
    ("d-014", 3, &["social"], "Let the player on your left send a message from your phone.", None),
    ("d-015", 3, &["creative", "fun"], "Perform a one-minute stand-up about the player opposite you.", None),
    ("d-016", 3, &["physical"], "Dance without music for thirty seconds.", None),
    ("d-017", 3, &["drink"], "Drink without using your hands.", Some("Take two sips.")),
    ("d-018", 3, &["fun"], "Call a friend and sing them happy birthday.", None),
    ("d-019", 4, &["hot"], "Describe your ideal date in vivid detail.", None),
    ("d-020", 4, &["social"], "Show the last photo in your gallery to everyone.", None),
    ("d-021", 4, &["physical", "fun"], "Swap one piece of clothing with the player on your right.", None),
    ("d-022", 4, &["creative"], "Write and read a love poem to an object in the room.", None),
    ("d-023", 4, &["drink"], "Let the group prepare your next drink.", Some("Down a shot.")),
    ("d-024", 4, &["social", "hot"], "Confess something nobody in the room knows about you.", None),
];

#[derive(Debug, Clone, Default)]
pub struct DarePool {
    dares: Vec<Dare>,
}

impl DarePool {
    /// Build a pool, rejecting malformed dares
    pub fn new(dares: Vec<Dare>) -> GameResult<Self> {
        if dares.is_empty() {
            return Err(GameError::EmptyDarePool);
        }

        let mut seen = HashSet::new();
        for dare in &dares {
            if !seen.insert(dare.id.as_str()) {
                return Err(GameError::validation(format!(
                    "Duplicate dare id '{}'",
                    dare.id
                )));
            }
            if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&dare.difficulty) {
                return Err(GameError::validation(format!(
                    "Dare '{}' has difficulty {}, expected {}-{}",
                    dare.id, dare.difficulty, MIN_DIFFICULTY, MAX_DIFFICULTY
                )));
            }
            if dare.text.trim().is_empty() {
                return Err(GameError::validation(format!(
                    "Dare '{}' has no text",
                    dare.id
                )));
            }
            if dare.categories.is_empty() {
                return Err(GameError::validation(format!(
                    "Dare '{}' has no category",
                    dare.id
                )));
            }
        }

        Ok(Self { dares })
    }

    /// The seed deck bundled with the binary
    pub fn builtin() -> Self {
        let dares = SEED_DARES
            .iter()
            .map(|(id, difficulty, categories, text, penalty)| Dare {
                id: id.to_string(),
                text: text.to_string(),
                difficulty: *difficulty,
                categories: categories.iter().map(|c| c.to_string()).collect(),
                penalty: penalty.map(str::to_string),
                reward: 1,
            })
            .collect();
        Self { dares }
    }

    pub fn from_json_str(json: &str) -> GameResult<Self> {
        let dares: Vec<Dare> = serde_json::from_str(json)
            .map_err(|e| GameError::validation(format!("Invalid dare file: {}", e)))?;
        Self::new(dares)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> GameResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            GameError::validation(format!("Cannot read dare file {}: {}", path.display(), e))
        })?;
        let pool = Self::from_json_str(&json)?;
        tracing::info!("Loaded {} dares from {}", pool.len(), path.display());
        Ok(pool)
    }

    pub fn dares(&self) -> &[Dare] {
        &self.dares
    }

    pub fn get(&self, id: &str) -> Option<&Dare> {
        self.dares.iter().find(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.dares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dares.is_empty()
    }

    /// Distinct categories, in first-seen order
    pub fn categories(&self) -> Vec<Category> {
        let mut out: Vec<Category> = Vec::new();
        for category in self.dares.iter().flat_map(|d| d.categories.iter()) {
            if !out.contains(category) {
                out.push(category.clone());
            }
        }
        out
    }
}
