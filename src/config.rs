use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::flow::timer::DEFAULT_FLIP_DELAY;

const DEFAULT_BIND: &str = "0.0.0.0:6574";

/// Host configuration, read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    /// Directory of the file-backed local store
    pub data_dir: PathBuf,
    /// Optional JSON file replacing the built-in dare pool
    pub dares_path: Option<PathBuf>,
    /// Card flip animation before a countdown starts
    pub flip_delay: Duration,
    pub static_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            data_dir: PathBuf::from("data"),
            dares_path: None,
            flip_delay: DEFAULT_FLIP_DELAY,
            static_dir: PathBuf::from("static"),
        }
    }
}

fn default_bind() -> SocketAddr {
    // 6574 is one past the classic party-game port
    SocketAddr::from(([0, 0, 0, 0], 6574))
}

/// Non-empty, trimmed value of an environment variable
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind = match env_value("SOCIAL_CHAOS_BIND") {
            Some(v) => v.parse().unwrap_or_else(|e| {
                tracing::warn!(
                    "Invalid SOCIAL_CHAOS_BIND '{}': {}, using {}",
                    v,
                    e,
                    DEFAULT_BIND
                );
                defaults.bind
            }),
            None => defaults.bind,
        };

        let flip_delay = match env_value("SOCIAL_CHAOS_FLIP_DELAY_MS") {
            Some(v) => match v.parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(e) => {
                    tracing::warn!("Invalid SOCIAL_CHAOS_FLIP_DELAY_MS '{}': {}", v, e);
                    defaults.flip_delay
                }
            },
            None => defaults.flip_delay,
        };

        let config = Self {
            bind,
            data_dir: env_value("SOCIAL_CHAOS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            dares_path: env_value("SOCIAL_CHAOS_DARES").map(PathBuf::from),
            flip_delay,
            static_dir: env_value("SOCIAL_CHAOS_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
        };

        tracing::info!(
            bind = %config.bind,
            data_dir = %config.data_dir.display(),
            custom_dares = config.dares_path.is_some(),
            flip_delay_ms = config.flip_delay.as_millis() as u64,
            "Config loaded"
        );
        config
    }
}
