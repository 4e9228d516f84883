//! Operator authentication endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::User;
use crate::routes::{ok, require_operator, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedUserRequest {
    pub email: String,
    pub password: String,
}

/// Creates the auth router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/seed-user", post(seed_user))
}

/// POST /api/auth/login
///
/// Missing account, missing hash and wrong password are indistinguishable
/// to the caller.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    let user: Option<User> = sqlx::query_as(
        "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
    )
    .bind(req.email.trim())
    .fetch_optional(&state.db)
    .await?;

    let user = user.ok_or_else(invalid_credentials)?;
    if !relist_auth::verify_password(req.password.trim(), &user.password_hash) {
        return Err(invalid_credentials());
    }

    Ok(ok(serde_json::json!({"id": user.id, "email": user.email})))
}

/// POST /api/auth/seed-user
///
/// Creates or rotates an operator account. Passwords are 6-digit codes.
async fn seed_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SeedUserRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_operator(&state, &headers)?;

    if req.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if !is_six_digit_code(&req.password) {
        return Err(AppError::Validation(
            "Password must be a 6-digit code".to_string(),
        ));
    }

    let password_hash = relist_auth::hash_password(&req.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO users (email, password_hash) VALUES ($1, $2) \
         ON CONFLICT (email) DO UPDATE SET password_hash = EXCLUDED.password_hash \
         RETURNING id",
    )
    .bind(req.email.trim())
    .bind(&password_hash)
    .fetch_one(&state.db)
    .await?;

    Ok(ok(serde_json::json!({"id": id, "email": req.email.trim()})))
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_string())
}

fn is_six_digit_code(password: &str) -> bool {
    password.len() == 6 && password.chars().all(|c| c.is_ascii_digit())
}
