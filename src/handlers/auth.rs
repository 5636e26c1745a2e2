//! Signup, login and the token lifecycles around them.
//!
//! Verification and reset tokens are persisted with an expiry and consumed
//! on use. There is no outbound mailer; issued tokens are logged so an
//! operator-side delivery hook can pick them up.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    self, generate_token, hash_password, verify_password, Identity, Role, SESSION_COOKIE,
};
use crate::error::{ApiError, ApiResult};
use crate::events::{self, DomainEvent};
use crate::models::User;
use crate::state::AppState;

const VERIFY_TOKEN_TTL_HOURS: i64 = 24;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 3))]
    pub user_name: String,
    pub role: String,
    #[validate(length(min = 8))]
    pub password: String,
}

pub async fn signup(
    State(s): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    req.validate()?;
    let role = Role::parse(&req.role)
        .filter(|r| *r != Role::Admin)
        .ok_or_else(|| ApiError::InvalidState("Role must be customer or seller".into()))?;

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1 OR user_name = $2")
            .bind(&req.email)
            .bind(&req.user_name)
            .fetch_optional(&s.db)
            .await?;
    if existing.is_some() {
        return Err(ApiError::InvalidState("User already exists".into()));
    }

    let user_id = Uuid::now_v7();
    let hash = hash_password(&req.password)?;
    sqlx::query(
        "INSERT INTO users (id, name, user_name, email, password_hash, role, is_verified) \
         VALUES ($1, $2, $3, $4, $5, $6, FALSE)",
    )
    .bind(user_id)
    .bind(&req.name)
    .bind(&req.user_name)
    .bind(&req.email)
    .bind(&hash)
    .bind(role.as_str())
    .execute(&s.db)
    .await
    .map_err(|e| ApiError::on_conflict(e, "User already exists"))?;

    let token = generate_token();
    sqlx::query(
        "INSERT INTO verification_tokens (id, email, token, purpose, expires_at) \
         VALUES ($1, $2, $3, 'verify_email', $4)",
    )
    .bind(Uuid::now_v7())
    .bind(&req.email)
    .bind(&token)
    .bind(Utc::now() + Duration::hours(VERIFY_TOKEN_TTL_HOURS))
    .execute(&s.db)
    .await?;
    tracing::info!(email = %req.email, token = %token, "email verification token issued");

    events::publish(
        &s.nats,
        DomainEvent::UserRegistered {
            user_id,
            role: role.as_str().to_string(),
        },
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Signup successful, check your inbox to verify your email"
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailParams {
    pub token: String,
}

pub async fn verify_email(
    State(s): State<AppState>,
    Query(p): Query<VerifyEmailParams>,
) -> ApiResult<Json<Value>> {
    let (id, email) = lookup_live_token(&s.db, &p.token, "verify_email").await?;

    sqlx::query("UPDATE users SET is_verified = TRUE, updated_at = NOW() WHERE email = $1")
        .bind(&email)
        .execute(&s.db)
        .await?;
    sqlx::query("DELETE FROM verification_tokens WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;

    Ok(Json(json!({ "success": true, "message": "Email verified" })))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

pub async fn login(
    State(s): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let role = Role::parse(&req.role)
        .filter(|r| *r != Role::Admin)
        .ok_or_else(|| ApiError::InvalidState("Role must be customer or seller".into()))?;

    let user: User = sqlx::query_as(
        "SELECT * FROM users WHERE email = $1 AND role = $2 AND is_verified = TRUE",
    )
    .bind(&req.email)
    .bind(role.as_str())
    .fetch_optional(&s.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let token = auth::sign(Identity { id: user.id, role }, &s.auth)
        .map_err(|_| ApiError::InvalidState("Could not issue session".into()))?;

    Ok((
        jar.add(session_cookie(token)),
        Json(json!({ "success": true })),
    ))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    (jar.remove(removal), Json(json!({ "success": true })))
}

pub async fn me(State(s): State<AppState>, identity: Identity) -> ApiResult<Json<Value>> {
    if identity.role == Role::Admin {
        let admin: crate::models::Admin = sqlx::query_as("SELECT * FROM admins WHERE id = $1")
            .bind(identity.id)
            .fetch_optional(&s.db)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        return Ok(Json(json!({ "user": admin, "role": "admin" })));
    }
    let user: User = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(identity.id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    let role = user.role.clone();
    Ok(Json(json!({ "user": user, "role": role })))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

pub async fn forgot_password(
    State(s): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<Value>> {
    let known: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(&s.db)
        .await?;

    // Same response whether or not the address exists.
    if known.is_some() {
        let token = generate_token();
        sqlx::query(
            "INSERT INTO verification_tokens (id, email, token, purpose, expires_at) \
             VALUES ($1, $2, $3, 'reset_password', $4)",
        )
        .bind(Uuid::now_v7())
        .bind(&req.email)
        .bind(&token)
        .bind(Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS))
        .execute(&s.db)
        .await?;
        tracing::info!(email = %req.email, token = %token, "password reset token issued");
    }

    Ok(Json(json!({
        "success": true,
        "message": "If the account exists, a reset link has been sent"
    })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(min = 8))]
    pub password: String,
}

pub async fn reset_password(
    State(s): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    req.validate()?;
    let (id, email) = lookup_live_token(&s.db, &req.token, "reset_password").await?;

    let hash = hash_password(&req.password)?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE email = $2")
        .bind(&hash)
        .bind(&email)
        .execute(&s.db)
        .await?;
    sqlx::query("DELETE FROM verification_tokens WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;

    Ok(Json(json!({ "success": true, "message": "Password updated" })))
}

/// Look up a stored token by value and purpose. An expired token is
/// rejected but left in place; callers delete it only after the action it
/// authorizes has gone through.
async fn lookup_live_token(
    db: &sqlx::PgPool,
    token: &str,
    purpose: &str,
) -> ApiResult<(Uuid, String)> {
    let found: Option<(Uuid, String, chrono::DateTime<Utc>)> = sqlx::query_as(
        "SELECT id, email, expires_at FROM verification_tokens \
         WHERE token = $1 AND purpose = $2",
    )
    .bind(token)
    .bind(purpose)
    .fetch_optional(db)
    .await?;
    let (id, email, expires_at) = found.ok_or_else(|| ApiError::NotFound("Invalid token".into()))?;
    ensure_token_live(expires_at)?;
    Ok((id, email))
}

fn ensure_token_live(expires_at: chrono::DateTime<Utc>) -> ApiResult<()> {
    if expires_at < Utc::now() {
        return Err(ApiError::InvalidState("Token expired".into()));
    }
    Ok(())
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_token_is_rejected() {
        let past = Utc::now() - Duration::hours(2);
        assert!(matches!(
            ensure_token_live(past),
            Err(ApiError::InvalidState(_))
        ));
    }

    #[test]
    fn live_token_is_accepted() {
        let future = Utc::now() + Duration::hours(2);
        assert!(ensure_token_live(future).is_ok());
    }
}
