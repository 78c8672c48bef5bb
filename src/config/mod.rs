/// Database configuration and connection management
pub mod database;

/// Policy and server settings loaded from config.toml
pub mod settings;

pub use settings::{AppConfig, load_app_configuration};
