//! Axum route handlers for the Auth API.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::token::AccessToken;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;
use crate::users::queries::{self, NewUser};
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// POST /api/v1/auth/register
///
/// Self-registration always creates a recruiter. Admins promote users afterwards.
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let new_user = NewUser::from_input(
        &req.username,
        &req.email,
        &req.full_name,
        &req.password,
        Role::Recruiter,
    )?;
    let user = queries::insert(&state.db, new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AccessToken>, AppError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "username and password are required".to_string(),
        ));
    }

    let user = queries::find_by_username(&state.db, req.username.trim()).await?;
    let verified = verify_password(&req.password, user.as_ref().map(|u| u.password_hash.as_str()));

    let user = match user {
        Some(user) if verified => user,
        _ => {
            warn!("Failed login attempt for '{}'", req.username.trim());
            return Err(AppError::Unauthorized(
                "Incorrect username or password".to_string(),
            ));
        }
    };

    if !user.is_active {
        return Err(AppError::Validation("Inactive user".to_string()));
    }

    let token = state.tokens.issue(&user)?;
    info!("User {} logged in", user.username);
    Ok(Json(token))
}

/// POST /api/v1/auth/logout
///
/// Revokes the presented token for the rest of its lifetime.
pub async fn handle_logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, AppError> {
    state
        .denylist
        .revoke(auth.jti, auth.remaining_lifetime())
        .await?;
    info!("User {} logged out", auth.username);
    Ok(Json(json!({ "message": "Successfully logged out" })))
}

/// GET /api/v1/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<User>, AppError> {
    let user = queries::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(user))
}

/// PUT /api/v1/auth/me
pub async fn handle_update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let username = req.username.as_deref().map(validation::username).transpose()?;
    let email = req
        .email
        .as_deref()
        .map(|e| validation::email("email", e))
        .transpose()?;
    let full_name = req
        .full_name
        .as_deref()
        .map(|n| validation::required_text("full_name", n, 100))
        .transpose()?;

    let user = queries::update_profile(
        &state.db,
        auth.id,
        username.as_deref(),
        email.as_deref(),
        full_name.as_deref(),
    )
    .await?;
    Ok(Json(user))
}

/// POST /api/v1/auth/password
pub async fn handle_change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    validate_password_strength(&req.new_password)?;

    let user = queries::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    if !verify_password(&req.current_password, Some(&user.password_hash)) {
        return Err(AppError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }

    let hash = hash_password(&req.new_password)?;
    queries::set_password_hash(&state.db, user.id, &hash).await?;
    info!("User {} changed their password", user.username);
    Ok(StatusCode::NO_CONTENT)
}
