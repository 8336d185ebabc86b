use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use api_shared::HealthService;
use panda_core::{config::database_path_from_env_value, CoreConfig, SqliteStore, SystemClock};

/// Main entry point for the Panda application
///
/// Loads `.env`, opens the SQLite store and serves the REST API with Swagger UI.
///
/// # Environment Variables
/// - `PANDA_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `PANDA_DATABASE_PATH`: SQLite database file, or `:memory:` (default: "panda.db")
/// - `RUST_LOG`: extra tracing filter directives
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, database or server startup fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("panda_run=info".parse()?)
                .add_directive("panda_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("PANDA_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let cfg = CoreConfig::new(database_path_from_env_value(
        std::env::var("PANDA_DATABASE_PATH").ok(),
    ))?;

    let store = Arc::new(SqliteStore::from_config(&cfg)?);
    tracing::info!("++ Using database {}", cfg.database_path().display());

    let rest_app = router(AppState::with_store(store, Arc::new(SystemClock)));

    tracing::info!(
        "++ Starting Panda REST on {} ({})",
        rest_addr,
        HealthService::check_health().message
    );
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, rest_app).await?;

    Ok(())
}
