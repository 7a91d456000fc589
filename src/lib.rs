//! VocalPrep: mock-interview practice with live transcript capture and
//! filler-word analytics.
//!
//! The client-facing half (`speech`, `transcript`, `analysis`, `client`)
//! turns a recognition event stream into per-question transcripts and
//! statistics; the server half (`store`, `server`) persists interviews
//! behind an owner-gated REST API.

pub mod analysis;
pub mod client;
pub mod config;
pub mod server;
pub mod speech;
pub mod store;
pub mod transcript;

pub use analysis::FillerWordAnalyzer;
pub use client::ApiClient;
pub use speech::SpeechSession;
pub use transcript::TranscriptManager;

use std::sync::Arc;

use log::info;

use config::AppConfig;
use server::{AppState, AuthKeys};
use store::PgStore;

/// Loads configuration, connects the store and serves the API.
pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    info!("VocalPrep starting...");

    let store = PgStore::connect(&config.database).await?;
    store.ensure_schema().await?;

    let state = AppState::new(Arc::new(store), AuthKeys::new(config.jwt_secret.as_bytes()));
    server::serve(&config.bind_addr, state).await
}
