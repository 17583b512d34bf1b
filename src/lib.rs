// Public API for integration tests and potential library usage

pub mod api;
pub mod config;
pub mod dares;
pub mod engine;
pub mod error;
pub mod flow;
pub mod history;
pub mod protocol;
pub mod random;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;
