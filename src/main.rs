use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use social_chaos::{
    api,
    config::AppConfig,
    dares::DarePool,
    state::{self, AppState},
    store::{FileLocalStore, MemorySessionStore},
    ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "social_chaos=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Social Chaos...");

    let config = AppConfig::from_env();

    let dares = match &config.dares_path {
        Some(path) => match DarePool::from_json_file(path) {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!(
                    "Failed to load dares from {}: {}. Using the built-in pool.",
                    path.display(),
                    e
                );
                DarePool::builtin()
            }
        },
        None => DarePool::builtin(),
    };

    let local = Arc::new(FileLocalStore::new(config.data_dir.clone()));
    let store = Arc::new(MemorySessionStore::new());
    let bind = config.bind;
    let static_dir = config.static_dir.clone();

    let state = Arc::new(AppState::new(config, store, local, dares));

    match state.restore_saved_game().await {
        Ok(Some(session)) => tracing::info!("Resumed game in room {}", session.room_code),
        Ok(None) => {}
        Err(e) => tracing::warn!("Could not resume saved game: {}", e),
    }

    // Spawn background task that turns countdown expiries into penalties
    state::spawn_timer_watcher(state.clone());
    // And one that follows session updates written by other devices
    state::spawn_store_watcher(state.clone());

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(api::routes())
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on http://{}", bind);

    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", bind, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
