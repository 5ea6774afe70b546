use clap::Parser;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seqmgr_studio::{
    config::{Args, StudioConfig},
    create_router,
    session::cleanup_task,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let log_filter = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "seqmgr_studio={0},seqmgr_core={0},tower_http=info",
                    log_filter
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config: StudioConfig = args.into();
    let listen_addr = config.listen_addr();
    let base_url = config.base_url();

    let state = AppState::from_config(config)?;

    // Start session cleanup background task
    let cleanup_manager = state.sessions.clone();
    tokio::spawn(async move {
        cleanup_task(cleanup_manager, Duration::from_secs(60)).await;
    });

    let app = create_router(state);
    let listener = TcpListener::bind(&listen_addr).await?;

    tracing::info!("seqmgr Studio starting on {}", base_url);
    tracing::info!("API available at {}/api/session", base_url);
    tracing::info!("Health check at {}/health", base_url);

    axum::serve(listener, app).await?;

    Ok(())
}
