mod config;
mod error;
mod handlers;
mod models;
mod router;
mod state;

use config::GatewayConfig;
use persistence::GlobalLeaderboardStore;
use router::create_router;
use session::{CsvFeed, SessionEngine};
use state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        stock_data_dir = %config.stock_data_dir.display(),
        leaderboard_path = %config.leaderboard_path.display(),
        tick_rate_hz = config.session.tick_rate_hz,
        duration_secs = config.session.duration_secs,
        "Starting game server"
    );

    let feed = Arc::new(CsvFeed::new(&config.stock_data_dir));
    let store = Arc::new(GlobalLeaderboardStore::new(&config.leaderboard_path));
    let engine = SessionEngine::new(config.session.clone(), feed);
    let (session, _session_task) = session::spawn(engine, Some(store.clone()));

    let app = create_router(AppState::new(session, store));

    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!("Listening on {}", config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
