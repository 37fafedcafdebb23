use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{Application, ApplicationDetail};
use crate::pagination::Page;
use crate::pipeline::{record_transition, ApplicationStatus, TransitionRecord};

pub const SUBMITTED_REASON: &str = "Application submitted";

pub struct NewApplication {
    pub requirement_id: Uuid,
    pub candidate_id: Uuid,
    pub assigned_recruiter_id: Option<Uuid>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ApplicationFilters {
    pub status: Option<ApplicationStatus>,
    pub requirement_id: Option<Uuid>,
    pub candidate_id: Option<Uuid>,
    pub assigned_recruiter_id: Option<Uuid>,
    pub source: Option<String>,
}

const DETAIL_SELECT: &str = r#"
    SELECT a.*, r.title AS requirement_title, r.req_code,
           c.name AS candidate_name, c.email AS candidate_email,
           u.username AS recruiter_username
    FROM applications a
    JOIN requirements r ON r.id = a.requirement_id
    JOIN candidates c ON c.id = a.candidate_id
    LEFT JOIN users u ON u.id = a.assigned_recruiter_id
    WHERE TRUE"#;

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Application>, AppError> {
    Ok(
        sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn find_detail(pool: &PgPool, id: Uuid) -> Result<Option<ApplicationDetail>, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(DETAIL_SELECT);
    query.push(" AND a.id = ").push_bind(id);
    Ok(query
        .build_query_as::<ApplicationDetail>()
        .fetch_optional(pool)
        .await?)
}

/// Loads an application or fails with 404.
pub async fn require(pool: &PgPool, id: Uuid) -> Result<Application, AppError> {
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Application"))
}

pub async fn count_for_candidate(pool: &PgPool, candidate_id: Uuid) -> Result<i64, AppError> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE candidate_id = $1")
            .bind(candidate_id)
            .fetch_one(pool)
            .await?,
    )
}

/// Creates the application in status `applied` together with its first history row.
pub async fn insert(
    pool: &PgPool,
    new: &NewApplication,
    created_by: Uuid,
) -> Result<Application, AppError> {
    let already_applied: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM applications WHERE requirement_id = $1 AND candidate_id = $2)",
    )
    .bind(new.requirement_id)
    .bind(new.candidate_id)
    .fetch_one(pool)
    .await?;
    if already_applied {
        return Err(AppError::Validation(
            "Candidate has already applied to this requirement".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let application = sqlx::query_as::<_, Application>(
        r#"
        INSERT INTO applications
            (id, requirement_id, candidate_id, status, assigned_recruiter_id, source, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.requirement_id)
    .bind(new.candidate_id)
    .bind(ApplicationStatus::Applied)
    .bind(new.assigned_recruiter_id)
    .bind(&new.source)
    .bind(&new.notes)
    .fetch_one(&mut *tx)
    .await?;

    record_transition(
        &mut tx,
        TransitionRecord {
            application_id: application.id,
            from_status: None,
            to_status: ApplicationStatus::Applied,
            changed_by: created_by,
            reason: Some(SUBMITTED_REASON),
            notes: None,
        },
    )
    .await?;

    tx.commit().await?;

    info!(
        "Application {} created for candidate {} on requirement {}",
        application.id, application.candidate_id, application.requirement_id
    );
    Ok(application)
}

/// Rewrites the editable non-status fields.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    assigned_recruiter_id: Option<Uuid>,
    source: Option<&str>,
    notes: Option<&str>,
) -> Result<Application, AppError> {
    sqlx::query_as::<_, Application>(
        r#"
        UPDATE applications
        SET assigned_recruiter_id = $2, source = $3, notes = $4, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(assigned_recruiter_id)
    .bind(source)
    .bind(notes)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Application"))
}

/// Deletes the application; history and interviews go with it via `ON DELETE CASCADE`.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM applications WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Application"));
    }
    Ok(())
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &ApplicationFilters) {
    if let Some(status) = filters.status {
        qb.push(" AND a.status = ").push_bind(status);
    }
    if let Some(requirement_id) = filters.requirement_id {
        qb.push(" AND a.requirement_id = ").push_bind(requirement_id);
    }
    if let Some(candidate_id) = filters.candidate_id {
        qb.push(" AND a.candidate_id = ").push_bind(candidate_id);
    }
    if let Some(recruiter_id) = filters.assigned_recruiter_id {
        qb.push(" AND a.assigned_recruiter_id = ").push_bind(recruiter_id);
    }
    if let Some(source) = &filters.source {
        qb.push(" AND a.source = ").push_bind(source.clone());
    }
}

pub async fn list(
    pool: &PgPool,
    filters: &ApplicationFilters,
    page: Page,
) -> Result<(Vec<ApplicationDetail>, i64), AppError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM applications a WHERE TRUE");
    push_filters(&mut count, filters);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut query = QueryBuilder::<Postgres>::new(DETAIL_SELECT);
    push_filters(&mut query, filters);
    query
        .push(" ORDER BY a.applied_at DESC, a.id LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let applications = query
        .build_query_as::<ApplicationDetail>()
        .fetch_all(pool)
        .await?;

    Ok((applications, total))
}
