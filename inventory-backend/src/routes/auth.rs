//! Account registration and login.

use crate::AppState;
use crate::auth::{hash_password, verify_password};
use crate::error::AppError;
use crate::helpers::now;
use crate::routes::ApiJson;
use crate::validation;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_macros::debug_handler;
use inventory_db::{NewUser, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Default, Deserialize)]
#[serde(default)]
pub(crate) struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    role: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub(crate) struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub(crate) struct LoginResponse {
    token: String,
    user: User,
}

#[debug_handler]
pub(crate) async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Usernames are unique after trimming
    let username = payload.username.trim().to_string();
    validation::require_text("username", &username)?;
    validation::validate_email(&payload.email)?;
    validation::validate_password(&payload.password)?;

    let password_hash = hash_password(payload.password).await?;
    let role = payload.role.filter(|r| !r.trim().is_empty());

    let user = state
        .db
        .create_user(
            NewUser {
                username,
                email: payload.email,
                password_hash,
                role,
            },
            now(),
        )
        .await
        .map_err(AppError::storage("Failed to register user"))?;

    tracing::info!(user_id = %user.id, username = %user.username, "registered user");
    Ok((StatusCode::CREATED, Json(User::from(user))))
}

#[debug_handler]
pub(crate) async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = payload.username.trim().to_string();
    validation::require_text("username", &username)?;
    validation::require_text("password", &payload.password)?;

    let user = state
        .db
        .find_user_by_username(username.clone())
        .await
        .map_err(AppError::storage("Failed to log in"))?;

    // Same answer for unknown user and wrong password
    let hash = user.as_ref().map(|u| u.password_hash.clone());
    let verified = verify_password(payload.password, hash).await;
    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::warn!(%username, "failed login attempt");
            return Err(AppError::Unauthorized("Invalid credentials"));
        }
    };

    let token = state
        .tokens
        .issue(&user.id.to_hex(), &user.username, now().timestamp())?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            token,
            user: User::from(user),
        }),
    ))
}
