// src/main.rs

use std::sync::Arc;

use quizzy::config::Config;
use quizzy::routes;
use quizzy::services::auth::seed_admin_user;
use quizzy::state::AppState;
use quizzy::store::{DynStore, MemoryStore, PgStore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Also loads .env (if present)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: DynStore = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store. Data will not persist.");
            Arc::new(MemoryStore::new())
        }
    };

    if let Err(e) = seed_admin_user(store.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    let state = AppState {
        store,
        config: config.clone(),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
