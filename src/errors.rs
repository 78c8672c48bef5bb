//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants map
//! one-to-one onto the failure classes the HTTP layer reports, see
//! `api::error` for the status code mapping.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Application error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing, malformed or expired credentials.
    #[error("Not authenticated: {message}")]
    Unauthenticated {
        /// Why the credentials were rejected
        message: String,
    },

    /// Authenticated, but the actor lacks the capability for this operation.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// The capability that was missing
        message: String,
    },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity looked up (e.g. "Course")
        entity: &'static str,
        /// The identifier that matched nothing
        id: String,
    },

    /// A uniqueness rule was violated (duplicate email, identifier, enrollment).
    #[error("Conflict: {message}")]
    Conflict {
        /// Which rule was violated
        message: String,
    },

    /// Input rejected before reaching storage.
    #[error("Validation failed: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Parse or read failure detail
        message: String,
    },

    /// Any other storage failure.
    #[error("Database error: {0}")]
    Database(DbErr),

    /// Filesystem failure (transcript files, config file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required environment variable is missing or not unicode.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// JWT encoding failed.
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// The password hasher rejected its input.
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Hasher error detail
        message: String,
    },
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`Error::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Unauthenticated`].
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }
}

// Unique-constraint races lose as Conflict, everything else stays a database error.
impl From<DbErr> for Error {
    fn from(value: DbErr) -> Self {
        match value.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::Conflict { message: detail },
            _ => Self::Database(value),
        }
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::PasswordHash {
            message: value.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found("Course", 42);
        assert_eq!(err.to_string(), "Course not found: 42");
    }

    #[test]
    fn test_plain_db_error_stays_database() {
        let err: Error = DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, Error::Database(_)));
    }
}
