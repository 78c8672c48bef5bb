#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use registrar::{
    api::{self, AppState},
    config::{
        self,
        database::{create_connection, create_tables},
    },
    errors::{Error, Result},
};
use std::env;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::load_app_configuration()?;
    info!("Successfully processed application configuration.");

    // 4. Signing key is read directly before use, not stored in AppConfig
    let jwt_secret = env::var("JWT_SECRET")
        .inspect_err(|e| error!("JWT_SECRET not found: {}", e))
        .map_err(Error::EnvVar)?;

    // 5. Connect and make sure every table exists
    let db = create_connection()
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    create_tables(&db)
        .await
        .inspect(|()| info!("Database tables ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 6. Serve until ctrl-c
    let bind_address = app_config.server.bind_address.clone();
    let listener = TcpListener::bind(&bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind_address, e))?;
    info!("Listening on {}", bind_address);

    let app = api::router(AppState::new(db, app_config, &jwt_secret));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received.");
}
