//! Request extractors: the authenticated actor and error-mapped JSON/query.

use crate::{
    api::AppState,
    core::{
        access::{Actor, resolve_actor},
        auth::decode_token,
    },
    errors::Error,
};
use axum::{
    extract::{FromRequest, FromRequestParts, rejection::{JsonRejection, QueryRejection}},
    http::{header::AUTHORIZATION, request::Parts},
};

/// The user named by the request's bearer token, with their profile.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::unauthenticated("Missing bearer token"))?;
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::unauthenticated("Authorization header is not a bearer token"))?;

        let claims = decode_token(token, &state.jwt_secret)?;
        resolve_actor(&state.db, &claims).await.map(Self)
    }
}

/// `axum::Json` whose rejections are reported as [`Error::Validation`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Query` whose rejections are reported as [`Error::Validation`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct QueryParams<T>(pub T);

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}
