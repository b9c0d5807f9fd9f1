// Pet Registry - Web Server
// Cats and dogs over an embedded document store

use anyhow::{Context, Result};
use pet_registry::http::{app, AppState};
use pet_registry::{init_logging, Config, DocumentStore, VERSION};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(config.log_format);

    info!(
        version = VERSION,
        database = ?config.database,
        store_timeout_ms = config.store_timeout.as_millis() as u64,
        dog_age_increment = %config.dog_age_increment,
        "starting pet registry"
    );

    // Store handle is created here and injected; nothing holds it globally
    let store: Arc<dyn DocumentStore> = Arc::new(config.open_store()?);
    let state = AppState::new(Arc::clone(&store), config.dog_age_increment);
    let app = app(state, &config.assets_dir);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    info!(addr = %addr, assets = %config.assets_dir.display(), "server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error");

    if let Err(err) = store.shutdown().await {
        error!(error = %err, "failed to close document store");
    }
    info!("server stopped");

    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
