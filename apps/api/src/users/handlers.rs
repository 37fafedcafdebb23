//! Axum route handlers for user administration.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::{Role, User};
use crate::pagination::{PageParams, Paginated};
use crate::state::AppState;
use crate::users::queries::{self, NewUser, UserFilters};
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// GET /api/v1/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(page): Query<PageParams>,
    Query(filters): Query<UserListQuery>,
) -> Result<Json<Paginated<User>>, AppError> {
    auth.require(auth.role.can_list_users(), "Not authorized to list users")?;
    let page = page.resolve()?;

    let filters = UserFilters {
        role: filters.role,
        is_active: filters.is_active,
    };
    let (users, total) = queries::list(&state.db, &filters, page).await?;
    Ok(Json(Paginated::new(users, total, page)))
}

/// POST /api/v1/users
pub async fn handle_create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    auth.require(auth.role.can_manage_users(), "Admin access required")?;

    let new_user = NewUser::from_input(
        &req.username,
        &req.email,
        &req.full_name,
        &req.password,
        req.role,
    )?;
    let user = queries::insert(&state.db, new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/v1/users/:id
pub async fn handle_get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    auth.require(
        auth.id == id || auth.role.can_list_users(),
        "Not authorized to view this user",
    )?;

    let user = queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(user))
}

/// PATCH /api/v1/users/:id
pub async fn handle_update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    auth.require(auth.role.can_manage_users(), "Admin access required")?;

    if id == auth.id {
        if req.is_active == Some(false) {
            return Err(AppError::Validation(
                "You cannot deactivate your own account".to_string(),
            ));
        }
        if req.role.is_some_and(|r| r != Role::Admin) {
            return Err(AppError::Validation(
                "You cannot remove your own admin role".to_string(),
            ));
        }
    }

    let full_name = req
        .full_name
        .as_deref()
        .map(|n| validation::required_text("full_name", n, 100))
        .transpose()?;

    let user =
        queries::update_account(&state.db, id, full_name.as_deref(), req.role, req.is_active)
            .await?;
    tracing::info!(
        "User {} updated by {} (role={}, active={})",
        user.username,
        auth.username,
        user.role,
        user.is_active
    );
    Ok(Json(user))
}
