use anyhow::Result;
use statrelay_server::app;
use statrelay_server::config::ServerConfig;
use statrelay_server::state::AppState;
use statrelay_storage::db::DbStorage;
use statrelay_storage::memory::MemStorage;
use statrelay_storage::Storage;
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("statrelay=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    let config = ServerConfig::load_or_default(&config_path)?;

    // Pick the backend: a database URL selects the relational engine,
    // otherwise metrics live in memory with an optional snapshot file.
    let mut db: Option<Arc<DbStorage>> = None;
    let mut mem: Option<Arc<MemStorage>> = None;
    let storage: Arc<dyn Storage> = match &config.storage.database_url {
        Some(url) => {
            let engine = Arc::new(DbStorage::connect(url).await?);
            db = Some(engine.clone());
            engine
        }
        None => {
            let engine = Arc::new(MemStorage::with_snapshot(
                &config.storage.snapshot_path,
                config.storage.restore,
            ));
            mem = Some(engine.clone());
            engine
        }
    };

    tracing::info!(
        addr = %config.listen_addr,
        backend = if db.is_some() { "database" } else { "memory" },
        signing = config.sign_key.is_some(),
        "statrelay-server starting"
    );

    let state = AppState {
        storage: storage.clone(),
        db,
        sign_key: config.sign_key.clone().map(Into::into),
    };

    // Periodic snapshot flush (memory backend only).
    let flush_handle = mem.as_ref().and_then(|engine| {
        let secs = config.storage.store_interval_secs;
        if secs == 0 {
            return None;
        }
        let engine = engine.clone();
        Some(tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(secs));
            tick.tick().await; // the first tick completes immediately
            loop {
                tick.tick().await;
                match engine.flush() {
                    Ok(()) => tracing::debug!("Snapshot flushed"),
                    Err(e) => tracing::error!(error = %e, "Snapshot flush failed"),
                }
            }
        }))
    });

    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = flush_handle {
        handle.abort();
    }
    // Final flush for the memory backend, connection close for the
    // relational one.
    storage.shutdown().await;

    tracing::info!("statrelay-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
