use std::sync::Arc;

use courier_service::api;
use courier_service::config::{Config, LogFormat};
use courier_service::db::{CourierDb, MemoryDb, PgDb};
use courier_service::error::AppError;
use courier_service::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;
    init_tracing(&config);

    let db: Arc<dyn CourierDb> = match &config.database_url {
        Some(url) => Arc::new(PgDb::new(url.clone(), config.db_max_connections)),
        None => {
            tracing::warn!("DATABASE_URL not set; couriers are kept in memory");
            Arc::new(MemoryDb::new())
        }
    };

    let state = Arc::new(AppState::new(db));
    state.store.init().await?;

    let app = api::rest::router(state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "courier service started");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")));

    state.store.shutdown().await;
    served
}

fn init_tracing(config: &Config) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);

    match config.log_format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
