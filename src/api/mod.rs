//! HTTP surface - axum router over the core operations.
//!
//! Handlers are thin: they resolve the [`extract::CurrentActor`], narrow it to
//! the role profile the operation needs, call into [`crate::core`] and return
//! JSON. Every failure travels as [`crate::errors::Error`] and is mapped to a
//! status code in [`error`].

pub mod attendance;
pub mod auth;
pub mod courses;
pub mod directory;
pub mod error;
pub mod extract;
pub mod professors;
pub mod records;
pub mod students;

use crate::config::settings::AppConfig;
use axum::{Json, Router, routing::get};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Shared connection pool
    pub db: DatabaseConnection,
    /// Loaded application configuration
    pub config: Arc<AppConfig>,
    /// Token signing key
    pub jwt_secret: Arc<str>,
}

impl AppState {
    /// Bundles the shared handles for the router.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig, jwt_secret: &str) -> Self {
        Self {
            db,
            config: Arc::new(config),
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::routes())
        .nest("/courses", courses::routes())
        .nest("/students", students::routes())
        .nest("/professors", professors::routes())
        .nest("/academic-records", records::routes())
        .nest("/directory", directory::routes())
        .nest("/attendance", attendance::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
