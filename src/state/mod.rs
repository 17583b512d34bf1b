mod lobby;
mod turns;

pub use lobby::{MAX_NAME_LEN, MIN_CATEGORIES};
pub use turns::{advance_message, spawn_store_watcher, spawn_timer_watcher, turn_message};

use crate::config::AppConfig;
use crate::dares::DarePool;
use crate::flow::timer::TimerExpired;
use crate::flow::{FlowDeps, TurnFlow};
use crate::protocol::ServerMessage;
use crate::random::{RandomSource, ThreadRandom};
use crate::store::{LocalStore, SessionStore};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};

/// Builds the random source handed to each new controller
pub type RandomFactory = Arc<dyn Fn() -> Box<dyn RandomSource> + Send + Sync>;

/// A message for every socket connected to one room
#[derive(Debug, Clone)]
pub struct RoomMessage {
    pub room_code: String,
    pub msg: ServerMessage,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn SessionStore>,
    pub local: Arc<dyn LocalStore>,
    pub dares: Arc<DarePool>,
    /// Room code -> session id, for every session hosted here
    pub rooms: Arc<RwLock<HashMap<String, SessionId>>>,
    /// Running games, keyed by session id
    pub flows: Arc<RwLock<HashMap<SessionId, Arc<Mutex<TurnFlow>>>>>,
    /// Room-scoped messages for all connected sockets
    pub broadcast: broadcast::Sender<RoomMessage>,
    /// Serializes lobby read-modify-write cycles
    lobby: Arc<Mutex<()>>,
    timer_tx: mpsc::UnboundedSender<TimerExpired>,
    timer_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<TimerExpired>>>>,
    random: RandomFactory,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn SessionStore>,
        local: Arc<dyn LocalStore>,
        dares: DarePool,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            config: Arc::new(config),
            store,
            local,
            dares: Arc::new(dares),
            rooms: Arc::new(RwLock::new(HashMap::new())),
            flows: Arc::new(RwLock::new(HashMap::new())),
            broadcast: tx,
            lobby: Arc::new(Mutex::new(())),
            timer_tx,
            timer_rx: Arc::new(Mutex::new(Some(timer_rx))),
            random: Arc::new(|| Box::new(ThreadRandom) as Box<dyn RandomSource>),
        }
    }

    /// Replace the randomness used by controllers created from now on
    pub fn with_random(mut self, random: RandomFactory) -> Self {
        self.random = random;
        self
    }

    fn flow_deps(&self) -> FlowDeps {
        FlowDeps {
            store: self.store.clone(),
            local: self.local.clone(),
            dares: self.dares.clone(),
            rng: (self.random)(),
            timer_events: self.timer_tx.clone(),
            flip_delay: self.config.flip_delay,
        }
    }

    pub async fn flow(&self, session_id: &str) -> Option<Arc<Mutex<TurnFlow>>> {
        self.flows.read().await.get(session_id).cloned()
    }

    /// Send to every socket of a room
    pub fn publish(&self, room_code: &str, msg: ServerMessage) {
        // Ignore send errors (no sockets connected is fine)
        let _ = self.broadcast.send(RoomMessage {
            room_code: room_code.to_string(),
            msg,
        });
    }
}

/// Room codes are case-insensitive and may arrive padded
pub fn normalize_room_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::random::ScriptedRandom;
    use crate::store::{MemoryLocalStore, MemorySessionStore};
    use std::time::Duration;

    pub(crate) fn test_dares() -> DarePool {
        let dare = |id: &str, difficulty: u8, category: &str| Dare {
            id: id.to_string(),
            text: format!("dare {}", id),
            difficulty,
            categories: vec![category.to_string()],
            penalty: None,
            reward: 1,
        };
        DarePool::new(vec![
            dare("f1", 1, "fun"),
            dare("f2", 1, "fun"),
            dare("s1", 1, "social"),
            dare("s2", 1, "social"),
            dare("h1", 2, "fun"),
        ])
        .unwrap()
    }

    pub(crate) fn test_state() -> (AppState, Arc<MemorySessionStore>, Arc<MemoryLocalStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let local = Arc::new(MemoryLocalStore::new());
        let config = AppConfig {
            flip_delay: Duration::ZERO,
            ..AppConfig::default()
        };
        let state = AppState::new(config, store.clone(), local.clone(), test_dares())
            .with_random(Arc::new(|| {
                Box::new(ScriptedRandom::new()) as Box<dyn RandomSource>
            }));
        (state, store, local)
    }

    pub(crate) fn test_settings() -> GameSettings {
        GameSettings {
            difficulty: 1,
            categories: vec!["fun".to_string(), "social".to_string()],
            timer_seconds: 30,
            alcohol_mode: false,
            allowance: ActionAllowance::default(),
        }
    }

    #[test]
    fn test_normalize_room_code() {
        assert_eq!(normalize_room_code("  abcde "), "ABCDE");
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let (state, _store, _local) = test_state();
        let mut rx = state.broadcast.subscribe();
        state.publish("ABCDE", ServerMessage::error("X", "y"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.room_code, "ABCDE");
    }
}
