//! Password hashing and bearer token handling.
//!
//! Passwords are stored as Argon2 PHC strings. Access tokens are HS256 JWTs
//! carrying the user's email, id and role.

use crate::{
    entities::{UserRole, user},
    errors::{Error, Result},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Hashes a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Checks a password against a stored PHC string.
///
/// A mismatch is `Ok(false)`; only an unparseable stored hash is an error.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// JWT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User email
    pub sub: String,
    /// User row id
    pub user_id: i64,
    /// Student or professor
    pub role: UserRole,
    /// Issued at, seconds since the epoch
    pub iat: usize,
    /// Expiry, seconds since the epoch
    pub exp: usize,
}

/// Issued token as returned by the login endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    /// Signed JWT
    pub access_token: String,
    /// Always "bearer"
    pub token_type: &'static str,
    /// Lifetime in seconds
    pub expires_in: i64,
    /// Role of the logged-in user
    pub user_role: UserRole,
    /// User row id
    pub user_id: i64,
}

/// Signs an access token for `user` valid for `lifetime_minutes`.
pub fn issue_token(user: &user::Model, secret: &str, lifetime_minutes: i64) -> Result<AccessToken> {
    let now = Utc::now();
    let expires = now + Duration::minutes(lifetime_minutes);
    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        role: user.role,
        iat: timestamp(now.timestamp()),
        exp: timestamp(expires.timestamp()),
    };
    let access_token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(AccessToken {
        access_token,
        token_type: "bearer",
        expires_in: lifetime_minutes * 60,
        user_role: user.role,
        user_id: user.id,
    })
}

fn timestamp(seconds: i64) -> usize {
    usize::try_from(seconds).unwrap_or_default()
}

/// Verifies signature and expiry and returns the claims.
///
/// Every failure is reported as [`Error::Unauthenticated`].
pub fn decode_token(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| Error::unauthenticated(format!("Could not validate credentials: {e}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn sample_user() -> user::Model {
        let now = Utc::now();
        user::Model {
            id: 7,
            email: "ada@example.edu".to_string(),
            password_hash: String::new(),
            role: UserRole::Professor,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_round_trip_carries_role() {
        let token = issue_token(&sample_user(), "secret", 30).unwrap();
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_in, 1800);
        assert_eq!(token.user_id, 7);

        let claims = decode_token(&token.access_token, "secret").unwrap();
        assert_eq!(claims.sub, "ada@example.edu");
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.role, UserRole::Professor);
    }

    #[test]
    fn test_token_with_wrong_secret_is_rejected() {
        let token = issue_token(&sample_user(), "secret", 30).unwrap();
        let result = decode_token(&token.access_token, "other");
        assert!(matches!(result, Err(Error::Unauthenticated { .. })));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Beyond the default 60s leeway
        let token = issue_token(&sample_user(), "secret", -5).unwrap();
        let result = decode_token(&token.access_token, "secret");
        assert!(matches!(result, Err(Error::Unauthenticated { .. })));
    }
}
