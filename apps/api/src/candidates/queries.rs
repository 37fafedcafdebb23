use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{Candidate, CandidateSummary};
use crate::pagination::Page;
use crate::validation::like_pattern;

/// Validated profile fields, written in full on insert and update.
#[derive(Debug, Clone, Default)]
pub struct CandidateFields {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub current_company: Option<String>,
    pub current_designation: Option<String>,
    pub experience_years: Option<f64>,
    pub current_ctc: Option<f64>,
    pub expected_ctc: Option<f64>,
    pub notice_period: Option<String>,
    pub location: Option<String>,
    pub skills: Option<String>,
    pub linkedin_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct CandidateFilters {
    pub search: Option<String>,
    pub location: Option<String>,
    pub skills: Option<String>,
    pub experience_min: Option<f64>,
    pub experience_max: Option<f64>,
}

const SUMMARY_SELECT: &str = r#"
    SELECT c.*,
           (SELECT COUNT(*) FROM applications a WHERE a.candidate_id = c.id) AS applications_count
    FROM candidates c
    WHERE TRUE"#;

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Candidate>, AppError> {
    Ok(
        sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn find_summary(pool: &PgPool, id: Uuid) -> Result<Option<CandidateSummary>, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
    query.push(" AND c.id = ").push_bind(id);
    Ok(query
        .build_query_as::<CandidateSummary>()
        .fetch_optional(pool)
        .await?)
}

async fn ensure_email_free(pool: &PgPool, email: &str, exclude: Option<Uuid>) -> Result<(), AppError> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM candidates WHERE email = $1 AND id IS DISTINCT FROM $2)",
    )
    .bind(email)
    .bind(exclude)
    .fetch_one(pool)
    .await?;
    if taken {
        return Err(AppError::Validation(
            "A candidate with this email already exists".to_string(),
        ));
    }
    Ok(())
}

pub async fn insert(
    pool: &PgPool,
    fields: &CandidateFields,
    created_by: Uuid,
) -> Result<Candidate, AppError> {
    ensure_email_free(pool, &fields.email, None).await?;

    Ok(sqlx::query_as::<_, Candidate>(
        r#"
        INSERT INTO candidates
            (id, name, email, phone, current_company, current_designation, experience_years,
             current_ctc, expected_ctc, notice_period, location, skills, linkedin_url, notes,
             created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&fields.name)
    .bind(&fields.email)
    .bind(&fields.phone)
    .bind(&fields.current_company)
    .bind(&fields.current_designation)
    .bind(fields.experience_years)
    .bind(fields.current_ctc)
    .bind(fields.expected_ctc)
    .bind(&fields.notice_period)
    .bind(&fields.location)
    .bind(&fields.skills)
    .bind(&fields.linkedin_url)
    .bind(&fields.notes)
    .bind(created_by)
    .fetch_one(pool)
    .await?)
}

pub async fn update(pool: &PgPool, id: Uuid, fields: &CandidateFields) -> Result<Candidate, AppError> {
    ensure_email_free(pool, &fields.email, Some(id)).await?;

    sqlx::query_as::<_, Candidate>(
        r#"
        UPDATE candidates
        SET name = $2, email = $3, phone = $4, current_company = $5, current_designation = $6,
            experience_years = $7, current_ctc = $8, expected_ctc = $9, notice_period = $10,
            location = $11, skills = $12, linkedin_url = $13, notes = $14, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&fields.name)
    .bind(&fields.email)
    .bind(&fields.phone)
    .bind(&fields.current_company)
    .bind(&fields.current_designation)
    .bind(fields.experience_years)
    .bind(fields.current_ctc)
    .bind(fields.expected_ctc)
    .bind(&fields.notice_period)
    .bind(&fields.location)
    .bind(&fields.skills)
    .bind(&fields.linkedin_url)
    .bind(&fields.notes)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Candidate"))
}

pub async fn set_resume_key(pool: &PgPool, id: Uuid, resume_key: &str) -> Result<Candidate, AppError> {
    sqlx::query_as::<_, Candidate>(
        "UPDATE candidates SET resume_key = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(resume_key)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Candidate"))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM candidates WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Candidate"));
    }
    Ok(())
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &CandidateFilters) {
    if let Some(search) = &filters.search {
        let pattern = like_pattern(search);
        qb.push(" AND (c.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.current_company ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(location) = &filters.location {
        qb.push(" AND c.location ILIKE ").push_bind(like_pattern(location));
    }
    if let Some(skills) = &filters.skills {
        qb.push(" AND c.skills ILIKE ").push_bind(like_pattern(skills));
    }
    if let Some(min) = filters.experience_min {
        qb.push(" AND c.experience_years >= ").push_bind(min);
    }
    if let Some(max) = filters.experience_max {
        qb.push(" AND c.experience_years <= ").push_bind(max);
    }
}

pub async fn list(
    pool: &PgPool,
    filters: &CandidateFilters,
    page: Page,
) -> Result<(Vec<CandidateSummary>, i64), AppError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM candidates c WHERE TRUE");
    push_filters(&mut count, filters);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut query = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
    push_filters(&mut query, filters);
    query
        .push(" ORDER BY c.created_at DESC, c.id LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let candidates = query
        .build_query_as::<CandidateSummary>()
        .fetch_all(pool)
        .await?;

    Ok((candidates, total))
}
