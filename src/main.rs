use anyhow::Context;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moviewave::{app, config::Config, services::cleanup::CleanupService, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Invalid configuration")?;

    // В production - JSON-логи для сборщика, иначе обычный текст
    let filter = tracing_subscriber::EnvFilter::new(&config.app.rust_log);
    if config.app.environment == "production" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!(
        "Starting MovieWave booking API ({} environment)",
        config.app.environment
    );

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("Invalid HOST/PORT")?;

    // Create the shared application state
    let app_state = AppState::new(config).context("Failed to initialise application state")?;

    // --- Start background tasks ---

    // Warmup cache в фоне
    let state_for_warmup = app_state.clone();
    task::spawn(async move {
        state_for_warmup
            .cache
            .warmup(&state_for_warmup.catalog)
            .await;
    });

    // Task to clean up idle sessions every 5 minutes
    let cleanup = CleanupService::new(app_state.clone());
    task::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(300)).await;
            cleanup.run_full_cleanup().await;
        }
    });

    // --- Start the web server ---
    let app = app(app_state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("Server error")?;

    Ok(())
}
