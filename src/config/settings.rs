//! Application settings loaded from `config.toml`.
//!
//! Every section has defaults, so a missing file or a partial file still
//! yields a complete configuration. Secrets are not read from this file: the
//! token signing key comes from the `JWT_SECRET` environment variable.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listener settings
    pub server: ServerConfig,
    /// Token and password rules
    pub auth: AuthConfig,
    /// What counts toward GPA
    pub grading: GradingPolicy,
    /// Degree requirements and on-track thresholds
    pub progress: ProgressPolicy,
    /// Where rendered transcripts go
    pub transcripts: TranscriptConfig,
    /// At-risk reporting
    pub attendance: AttendanceConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the API listens on, e.g. "0.0.0.0:8000"
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Access token settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of issued bearer tokens
    pub access_token_expire_minutes: i64,
    /// Minimum accepted password length at registration
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_expire_minutes: 30,
            min_password_length: 8,
        }
    }
}

/// Which non-graded records count toward GPA totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GradingPolicy {
    /// Count incomplete records in GPA (missing numeric grade counts as 0.0)
    pub count_incomplete: bool,
    /// Add withdrawn records' attempted credits to the attempted total
    pub count_withdrawn: bool,
}

/// Degree requirements and the on-track predicate
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProgressPolicy {
    /// Credits needed to graduate
    pub total_credits_required: i32,
    /// Credits needed from major courses
    pub major_credits_required: i32,
    /// Credits needed from general education
    pub general_education_credits_required: i32,
    /// Credits needed from electives
    pub elective_credits_required: i32,
    /// Cumulative GPA below this is off track
    pub minimum_gpa: f64,
    /// Earned credits expected per full year since the catalog year
    pub credits_per_year: i32,
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            total_credits_required: 120,
            major_credits_required: 60,
            general_education_credits_required: 30,
            elective_credits_required: 30,
            minimum_gpa: 2.0,
            credits_per_year: 30,
        }
    }
}

/// Transcript rendering output
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Directory rendered transcripts are written to; nothing is written when unset
    pub output_dir: Option<PathBuf>,
}

/// Attendance reporting thresholds
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    /// Students below this attendance percentage are reported at risk
    pub at_risk_threshold: f64,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            at_risk_threshold: 70.0,
        }
    }
}

/// Loads application configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads configuration from `REGISTRAR_CONFIG` (default `./config.toml`).
///
/// A missing file is not an error: defaults are used and a warning is logged.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("REGISTRAR_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        warn!("Config file {} not found, using defaults", path);
        return Ok(AppConfig::default());
    }
    let config = load_config(&path)?;
    info!("Loaded configuration from {}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
            [grading]
            count_incomplete = true

            [progress]
            total_credits_required = 128
            minimum_gpa = 2.5

            [transcripts]
            output_dir = "data/transcripts"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.grading.count_incomplete);
        assert!(!config.grading.count_withdrawn);
        assert_eq!(config.progress.total_credits_required, 128);
        assert_eq!(config.progress.minimum_gpa, 2.5);
        // Untouched keys keep their defaults
        assert_eq!(config.progress.credits_per_year, 30);
        assert_eq!(config.auth.access_token_expire_minutes, 30);
        assert_eq!(
            config.transcripts.output_dir,
            Some(PathBuf::from("data/transcripts"))
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8000");
        assert_eq!(config.attendance.at_risk_threshold, 70.0);
        assert!(config.transcripts.output_dir.is_none());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("does/not/exist.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
