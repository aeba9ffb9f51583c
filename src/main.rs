// src/main.rs

use std::sync::Arc;

use exam_portal::config::Config;
use exam_portal::routes;
use exam_portal::state::AppState;
use exam_portal::store::{LocalBuffer, PgRemoteStore, RemoteStore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (and .env, if present)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let buffer = match &config.local_buffer_url {
        Some(url) => LocalBuffer::open_or_disabled(url).await,
        None => {
            tracing::warn!("Local buffer disabled; offline submissions will not be staged");
            LocalBuffer::disabled()
        }
    };

    let remote: Arc<dyn RemoteStore> = match &config.database_url {
        Some(url) => Arc::new(PgRemoteStore::connect_lazy(url)?),
        None => {
            tracing::warn!("DATABASE_URL not set; running in local-only mode");
            Arc::new(PgRemoteStore::unconfigured())
        }
    };

    let state = AppState::new(config.clone(), buffer, remote.clone())?;
    let _sync_tasks = state.start_sync_tasks();

    if config.database_url.is_some() {
        state
            .connectivity
            .spawn_probe(remote, config.probe_interval);
    }

    if state.admin.is_none() {
        tracing::info!("ADMIN_USERNAME/ADMIN_PASSWORD not set; admin routes are locked");
    }

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);

    // Start the server
    axum::serve(listener, app).await?;

    Ok(())
}
