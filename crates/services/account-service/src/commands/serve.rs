//! Serve command - Starts the HTTP server.

use std::sync::Arc;

use common::{AppError, AppResult};

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::{Config, SessionBackend};
use crate::infra::Database;
use crate::service::Services;
use crate::session::{MemorySessionStore, RedisSessionStore, SessionRepository};

/// Execute the serve command
pub async fn execute(args: ServeArgs, mut config: Config) -> AppResult<()> {
    tracing::info!("Starting server...");

    if let Some(host) = args.host {
        config.server_host = host;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }

    let db = Arc::new(
        Database::connect(&config.database)
            .await
            .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?,
    );

    let session_store = connect_session_store(&config).await?;
    let services = Services::build(db.get_connection(), session_store, &config);
    let app = create_router(AppState::from_services(&services, db, &config.session));

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!(
        authority_enabled = config.authority_enabled,
        session_mode = ?config.session.mode,
        "Server running on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    Ok(())
}

async fn connect_session_store(config: &Config) -> AppResult<Arc<dyn SessionRepository>> {
    match config.session.backend {
        SessionBackend::Redis => {
            let store = RedisSessionStore::connect(&config.cache.url).await?;
            Ok(Arc::new(store))
        }
        SessionBackend::Memory => {
            tracing::warn!("In-process session store: sessions are lost on restart and not shared between nodes");
            Ok(Arc::new(MemorySessionStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
