//! HTTP mapping of [`Error`].

use crate::errors::Error;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// JSON error body
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

impl Error {
    /// Short machine-readable kind reported in the `error` field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated { .. } => "unauthenticated",
            Self::Forbidden { .. } => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Validation { .. } => "validation",
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_)
            | Self::Token(_)
            | Self::PasswordHash { .. } => "internal",
        }
    }

    /// HTTP status the error is reported with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_)
            | Self::Token(_)
            | Self::PasswordHash { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status.is_server_error() {
            error!("Request failed: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut response = (
            status,
            Json(ErrorBody {
                error: self.kind(),
                detail,
            }),
        )
            .into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
