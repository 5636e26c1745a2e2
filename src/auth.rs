//! Identity and credentials.
//!
//! Identity travels as a signed token in an http-only cookie and is decoded
//! per request into an explicit [`Identity`] value; nothing is held in
//! ambient state. Passwords are hashed with argon2; email-verification and
//! password-reset tokens are opaque random strings with a store-side
//! expiry.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "token";
const SESSION_TTL_DAYS: i64 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Seller,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Self::Customer),
            "seller" => Some(Self::Seller),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }
}

/// The authenticated caller, decoded from the session cookie.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "{} role required",
                role.as_str()
            )))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    role: String,
    exp: i64,
}

/// Signing material for session tokens, derived from `JWT_SECRET`.
#[derive(Clone)]
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid or expired session token")]
    InvalidToken,
    #[error("token signing failed")]
    Signing,
}

pub fn sign(identity: Identity, keys: &AuthKeys) -> Result<String, AuthError> {
    let claims = Claims {
        sub: identity.id,
        role: identity.role.as_str().to_string(),
        exp: (Utc::now() + Duration::days(SESSION_TTL_DAYS)).timestamp(),
    };
    jsonwebtoken::encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|_| AuthError::Signing)
}

/// Pure verification: token in, `{id, role}` out.
pub fn verify(token: &str, keys: &AuthKeys) -> Result<Identity, AuthError> {
    let data = jsonwebtoken::decode::<Claims>(token, &keys.decoding, &Validation::default())
        .map_err(|_| AuthError::InvalidToken)?;
    let role = Role::parse(&data.claims.role).ok_or(AuthError::InvalidToken)?;
    Ok(Identity {
        id: data.claims.sub,
        role,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let jar = CookieJar::from_request_parts(parts, &state)
            .await
            .map_err(|_| ApiError::Unauthorized)?;
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(ApiError::Unauthorized)?;
        verify(&token, &state.auth).map_err(|_| ApiError::Unauthorized)
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| ApiError::InvalidState("Could not hash password".into()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Opaque token for email-verification and password-reset flows.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let keys = AuthKeys::from_secret(b"test-secret");
        let identity = Identity {
            id: Uuid::new_v4(),
            role: Role::Seller,
        };
        let token = sign(identity, &keys).unwrap();
        assert_eq!(verify(&token, &keys).unwrap(), identity);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let keys = AuthKeys::from_secret(b"secret-a");
        let other = AuthKeys::from_secret(b"secret-b");
        let token = sign(
            Identity {
                id: Uuid::new_v4(),
                role: Role::Customer,
            },
            &keys,
        )
        .unwrap();
        assert!(verify(&token, &other).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter42!").unwrap();
        assert!(verify_password("hunter42!", &hash));
        assert!(!verify_password("hunter43!", &hash));
    }

    #[test]
    fn role_check() {
        let id = Identity {
            id: Uuid::new_v4(),
            role: Role::Customer,
        };
        assert!(id.require(Role::Customer).is_ok());
        assert!(matches!(
            id.require(Role::Admin),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn opaque_tokens_are_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 48);
        assert_ne!(a, b);
    }
}
