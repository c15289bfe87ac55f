//! Credential and token service.
//!
//! Passwords are bcrypt-hashed (cost 10) on a blocking thread; identity is
//! carried in an HS256 JWT holding the user id and role.

pub mod middleware;

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

lazy_static::lazy_static! {
    /// JWT signing secret from environment
    pub static ref JWT_SECRET: String = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "default-jwt-secret-change-in-production".to_string());
}

/// bcrypt work factor
pub const HASH_COST: u32 = 10;

/// Token lifetime. The original service issued non-expiring tokens; a bounded
/// session was chosen instead (recorded in DESIGN.md).
const TOKEN_EXPIRY_HOURS: i64 = 24;

/// Caller roles, coarse capability sets with no hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Presenter,
    Author,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Presenter => "presenter",
            Role::Author => "author",
            Role::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "presenter" => Some(Role::Presenter),
            "author" => Some(Role::Author),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims: subject is the user id, role travels with it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Hash a plaintext password. bcrypt is CPU-bound, so it runs outside the
/// async executor.
pub async fn hash_password(plaintext: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash(&plaintext, HASH_COST))
        .await
        .map_err(|e| ApiError::Unexpected(format!("hash task panicked: {e}")))?
        .map_err(|e| ApiError::Unexpected(format!("Failed to process password: {e}")))
}

/// Compare a plaintext against a stored hash. Never errors to the caller: any
/// bcrypt failure counts as a mismatch.
pub async fn verify_password(plaintext: String, hashed: String) -> bool {
    tokio::task::spawn_blocking(move || verify(&plaintext, &hashed).unwrap_or(false))
        .await
        .unwrap_or(false)
}

/// Sign a token for the given user and role.
pub fn issue_token(user_id: Uuid, role: Role) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(TOKEN_EXPIRY_HOURS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .map_err(|e| ApiError::Unexpected(format!("Failed to create token: {e}")))
}

/// Verify signature and expiry; any malformed or tampered token fails the
/// same way and the caller turns it into an authentication error.
pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_then_verify_round_trips_identity() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, Role::Author).unwrap();
        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "author");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_verify_rejects_garbage() {
        assert!(verify_token("not.a.token").is_err());
        assert!(verify_token("").is_err());
    }

    #[test]
    fn test_verify_rejects_tampered_token() {
        let token = issue_token(Uuid::new_v4(), Role::User).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert!(verify_token(&tampered).is_err());
    }

    #[test]
    fn test_role_parse_covers_all_four() {
        for role in [Role::Admin, Role::Presenter, Role::Author, Role::User] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[tokio::test]
    async fn test_password_hash_verify_round_trip() {
        let hashed = hash_password("s3cret-enough".to_string()).await.unwrap();
        assert!(verify_password("s3cret-enough".to_string(), hashed.clone()).await);
        assert!(!verify_password("wrong".to_string(), hashed).await);
    }

    #[tokio::test]
    async fn test_verify_password_tolerates_bad_hash() {
        assert!(!verify_password("anything".to_string(), "not-a-bcrypt-hash".to_string()).await);
    }
}
