use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::client::Client;
use crate::pagination::Page;
use crate::validation::like_pattern;

/// Validated client fields, used for both insert and full update.
pub struct ClientFields {
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default)]
pub struct ClientFilters {
    pub search: Option<String>,
    pub include_inactive: bool,
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Client>, AppError> {
    Ok(sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

async fn ensure_name_free(pool: &PgPool, name: &str, exclude: Option<Uuid>) -> Result<(), AppError> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM clients WHERE lower(name) = lower($1) AND id IS DISTINCT FROM $2)",
    )
    .bind(name)
    .bind(exclude)
    .fetch_one(pool)
    .await?;
    if taken {
        return Err(AppError::Validation(format!("Client '{name}' already exists")));
    }
    Ok(())
}

pub async fn insert(pool: &PgPool, fields: &ClientFields) -> Result<Client, AppError> {
    ensure_name_free(pool, &fields.name, None).await?;

    Ok(sqlx::query_as::<_, Client>(
        r#"
        INSERT INTO clients (id, name, contact_person, email, phone, address)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&fields.name)
    .bind(&fields.contact_person)
    .bind(&fields.email)
    .bind(&fields.phone)
    .bind(&fields.address)
    .fetch_one(pool)
    .await?)
}

pub async fn update(pool: &PgPool, id: Uuid, fields: &ClientFields) -> Result<Client, AppError> {
    ensure_name_free(pool, &fields.name, Some(id)).await?;

    sqlx::query_as::<_, Client>(
        r#"
        UPDATE clients
        SET name = $2, contact_person = $3, email = $4, phone = $5, address = $6,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&fields.name)
    .bind(&fields.contact_person)
    .bind(&fields.email)
    .bind(&fields.phone)
    .bind(&fields.address)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Client"))
}

/// Soft delete: requirements keep pointing at the client.
pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<Client, AppError> {
    sqlx::query_as::<_, Client>(
        "UPDATE clients SET is_active = FALSE, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Client"))
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &ClientFilters) {
    if !filters.include_inactive {
        qb.push(" AND is_active");
    }
    if let Some(search) = &filters.search {
        let pattern = like_pattern(search);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR contact_person ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list(
    pool: &PgPool,
    filters: &ClientFilters,
    page: Page,
) -> Result<(Vec<Client>, i64), AppError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM clients WHERE TRUE");
    push_filters(&mut count, filters);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM clients WHERE TRUE");
    push_filters(&mut query, filters);
    query
        .push(" ORDER BY name LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let clients = query.build_query_as::<Client>().fetch_all(pool).await?;

    Ok((clients, total))
}
