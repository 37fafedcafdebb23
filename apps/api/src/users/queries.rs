use anyhow::Context;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password, validate_password_strength};
use crate::config::AdminBootstrap;
use crate::errors::AppError;
use crate::models::user::{Role, User};
use crate::pagination::Page;
use crate::validation;

/// A user about to be inserted, already validated and hashed.
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
}

impl NewUser {
    /// Validates raw input and hashes the password.
    pub fn from_input(
        username: &str,
        email: &str,
        full_name: &str,
        password: &str,
        role: Role,
    ) -> Result<Self, AppError> {
        let username = validation::username(username)?;
        let email = validation::email("email", email)?;
        let full_name = validation::required_text("full_name", full_name, 100)?;
        validate_password_strength(password)?;

        Ok(Self {
            username,
            email,
            full_name,
            password_hash: hash_password(password)?,
            role,
        })
    }
}

#[derive(Debug, Default)]
pub struct UserFilters {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, AppError> {
    Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, AppError> {
    Ok(
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?,
    )
}

/// Rejects a username or email already held by another user.
pub async fn ensure_unique(
    pool: &PgPool,
    username: Option<&str>,
    email: Option<&str>,
    exclude: Option<Uuid>,
) -> Result<(), AppError> {
    if let Some(username) = username {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND id IS DISTINCT FROM $2)",
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(AppError::Validation("Username already registered".to_string()));
        }
    }
    if let Some(email) = email {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND id IS DISTINCT FROM $2)",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(AppError::Validation("Email already registered".to_string()));
        }
    }
    Ok(())
}

pub async fn insert(pool: &PgPool, user: NewUser) -> Result<User, AppError> {
    ensure_unique(pool, Some(&user.username), Some(&user.email), None).await?;

    let created = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, email, full_name, password_hash, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.full_name)
    .bind(&user.password_hash)
    .bind(user.role)
    .fetch_one(pool)
    .await?;

    info!("Created user {} ({})", created.username, created.role);
    Ok(created)
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &UserFilters) {
    if let Some(role) = filters.role {
        qb.push(" AND role = ").push_bind(role);
    }
    if let Some(is_active) = filters.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
}

pub async fn list(
    pool: &PgPool,
    filters: &UserFilters,
    page: Page,
) -> Result<(Vec<User>, i64), AppError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
    push_filters(&mut count, filters);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE TRUE");
    push_filters(&mut query, filters);
    query
        .push(" ORDER BY username LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let users = query.build_query_as::<User>().fetch_all(pool).await?;

    Ok((users, total))
}

/// Self-service profile change. `None` leaves a field untouched.
pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    username: Option<&str>,
    email: Option<&str>,
    full_name: Option<&str>,
) -> Result<User, AppError> {
    ensure_unique(pool, username, email, Some(id)).await?;

    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET username = COALESCE($2, username),
            email = COALESCE($3, email),
            full_name = COALESCE($4, full_name),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(username)
    .bind(email)
    .bind(full_name)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("User"))
}

/// Admin change of name, role or activation.
pub async fn update_account(
    pool: &PgPool,
    id: Uuid,
    full_name: Option<&str>,
    role: Option<Role>,
    is_active: Option<bool>,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET full_name = COALESCE($2, full_name),
            role = COALESCE($3, role),
            is_active = COALESCE($4, is_active),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(full_name)
    .bind(role)
    .bind(is_active)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("User"))
}

pub async fn set_password_hash(pool: &PgPool, id: Uuid, password_hash: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Loads an active user with the given role, or fails with 400 naming the field.
pub async fn require_active_with_role(
    pool: &PgPool,
    id: Uuid,
    role: Option<Role>,
    field: &str,
) -> Result<User, AppError> {
    let user = find_by_id(pool, id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Validation(format!("{field} must be an active user")))?;
    if let Some(role) = role {
        if user.role != role {
            return Err(AppError::Validation(format!("{field} must be a {role}")));
        }
    }
    Ok(user)
}

/// Creates the configured admin when the database has no admin yet.
pub async fn bootstrap_admin(pool: &PgPool, admin: &AdminBootstrap) -> anyhow::Result<()> {
    let has_admin: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin')")
            .fetch_one(pool)
            .await?;
    if has_admin {
        return Ok(());
    }

    let new_admin = NewUser::from_input(
        &admin.username,
        &admin.email,
        "Administrator",
        &admin.password,
        Role::Admin,
    )
    .context("Invalid ADMIN_* settings")?;
    insert(pool, new_admin)
        .await
        .context("Failed to bootstrap admin user")?;

    info!("Bootstrapped admin user '{}'", admin.username);
    Ok(())
}
