//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging. The workspace's main `panda-run` binary also loads
//! a `.env` file before serving the same router.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use panda_core::{config::database_path_from_env_value, CoreConfig, SqliteStore, SystemClock};

/// Main entry point for the Panda REST API server
///
/// # Environment Variables
/// - `PANDA_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `PANDA_DATABASE_PATH`: SQLite database file (default: "panda.db")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the database cannot be opened, or
/// - the server address cannot be bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("panda_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("PANDA_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let cfg = CoreConfig::new(database_path_from_env_value(
        std::env::var("PANDA_DATABASE_PATH").ok(),
    ))?;

    tracing::info!("-- Opening Panda database at {}", cfg.database_path().display());
    let store = Arc::new(SqliteStore::from_config(&cfg)?);
    let app = router(AppState::with_store(store, Arc::new(SystemClock)));

    tracing::info!("-- Starting Panda REST API on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
