use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dashboard::stats::HistoryPoint;
use crate::errors::AppError;
use crate::pipeline::ApplicationStatus;

/// Which rows a statistic covers. Recruiters get `recruiter` set to themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope {
    pub recruiter: Option<Uuid>,
    pub requirement: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopRequirement {
    pub id: Uuid,
    pub req_code: String,
    pub title: String,
    pub client_name: String,
    pub applications_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct RecruiterRow {
    pub recruiter_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub assigned_requirements: i64,
    pub applications: i64,
    pub hires: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SourceCount {
    pub source: String,
    pub count: i64,
}

/// Filters rows of `applications a` by the scope.
fn push_application_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: Scope) {
    if let Some(recruiter) = scope.recruiter {
        qb.push(" AND a.assigned_recruiter_id = ").push_bind(recruiter);
    }
    if let Some(requirement) = scope.requirement {
        qb.push(" AND a.requirement_id = ").push_bind(requirement);
    }
}

pub async fn requirements_by_status(pool: &PgPool, scope: Scope) -> Result<Vec<(String, i64)>, AppError> {
    let mut query =
        QueryBuilder::<Postgres>::new("SELECT r.status, COUNT(*) FROM requirements r WHERE TRUE");
    if let Some(recruiter) = scope.recruiter {
        query.push(" AND r.assigned_to = ").push_bind(recruiter);
    }
    query.push(" GROUP BY r.status");
    Ok(query.build_query_as().fetch_all(pool).await?)
}

pub async fn applications_by_status(pool: &PgPool, scope: Scope) -> Result<Vec<(String, i64)>, AppError> {
    let mut query =
        QueryBuilder::<Postgres>::new("SELECT a.status, COUNT(*) FROM applications a WHERE TRUE");
    push_application_scope(&mut query, scope);
    query.push(" GROUP BY a.status");
    Ok(query.build_query_as().fetch_all(pool).await?)
}

/// All candidates, or for a recruiter the distinct candidates in their applications.
pub async fn total_candidates(pool: &PgPool, scope: Scope) -> Result<i64, AppError> {
    let total = match scope.recruiter {
        Some(recruiter) => {
            sqlx::query_scalar(
                "SELECT COUNT(DISTINCT candidate_id) FROM applications WHERE assigned_recruiter_id = $1",
            )
            .bind(recruiter)
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM candidates")
                .fetch_one(pool)
                .await?
        }
    };
    Ok(total)
}

pub async fn applications_since(
    pool: &PgPool,
    scope: Scope,
    since: DateTime<Utc>,
) -> Result<i64, AppError> {
    let mut query =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM applications a WHERE a.applied_at >= ");
    query.push_bind(since);
    push_application_scope(&mut query, scope);
    Ok(query.build_query_scalar().fetch_one(pool).await?)
}

pub async fn interviews_since(
    pool: &PgPool,
    scope: Scope,
    since: DateTime<Utc>,
) -> Result<i64, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) FROM interviews i JOIN applications a ON a.id = i.application_id \
         WHERE i.created_at >= ",
    );
    query.push_bind(since);
    push_application_scope(&mut query, scope);
    Ok(query.build_query_scalar().fetch_one(pool).await?)
}

/// Distinct applications whose history ever entered each status.
pub async fn stage_reach(pool: &PgPool, scope: Scope) -> Result<Vec<(ApplicationStatus, i64)>, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT h.to_status, COUNT(DISTINCT h.application_id) FROM status_history h \
         JOIN applications a ON a.id = h.application_id WHERE TRUE",
    );
    push_application_scope(&mut query, scope);
    query.push(" GROUP BY h.to_status");
    Ok(query.build_query_as().fetch_all(pool).await?)
}

/// History rows ordered per application, oldest first, for stage timing.
pub async fn history_points(pool: &PgPool, scope: Scope) -> Result<Vec<HistoryPoint>, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT h.application_id, h.to_status, h.changed_at FROM status_history h \
         JOIN applications a ON a.id = h.application_id WHERE TRUE",
    );
    push_application_scope(&mut query, scope);
    query.push(" ORDER BY h.application_id, h.changed_at, h.id");
    Ok(query.build_query_as::<HistoryPoint>().fetch_all(pool).await?)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bucket {
    Month,
    Day,
}

impl Bucket {
    fn unit(self) -> &'static str {
        match self {
            Bucket::Month => "month",
            Bucket::Day => "day",
        }
    }
}

/// Application counts per calendar bucket of `applied_at` (UTC), from `since` on.
pub async fn applications_per_period(
    pool: &PgPool,
    scope: Scope,
    bucket: Bucket,
    since: NaiveDate,
) -> Result<Vec<(NaiveDate, i64)>, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT date_trunc('{}', a.applied_at AT TIME ZONE 'UTC')::date AS period, COUNT(*) \
         FROM applications a WHERE (a.applied_at AT TIME ZONE 'UTC')::date >= ",
        bucket.unit()
    ));
    query.push_bind(since);
    push_application_scope(&mut query, scope);
    query.push(" GROUP BY period ORDER BY period");
    Ok(query.build_query_as().fetch_all(pool).await?)
}

pub async fn application_sources(pool: &PgPool, scope: Scope) -> Result<Vec<SourceCount>, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT COALESCE(a.source, 'unknown') AS source, COUNT(*) AS count FROM applications a WHERE TRUE",
    );
    push_application_scope(&mut query, scope);
    query.push(" GROUP BY 1 ORDER BY count DESC, source");
    Ok(query.build_query_as::<SourceCount>().fetch_all(pool).await?)
}

pub async fn top_requirements(
    pool: &PgPool,
    scope: Scope,
    limit: i64,
) -> Result<Vec<TopRequirement>, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(
        r#"
        SELECT r.id, r.req_code, r.title, c.name AS client_name, COUNT(a.id) AS applications_count
        FROM requirements r
        JOIN clients c ON c.id = r.client_id
        JOIN applications a ON a.requirement_id = r.id
        WHERE TRUE"#,
    );
    if let Some(recruiter) = scope.recruiter {
        query
            .push(" AND r.assigned_to = ")
            .push_bind(recruiter)
            .push(" AND a.assigned_recruiter_id = ")
            .push_bind(recruiter);
    }
    query
        .push(" GROUP BY r.id, c.name ORDER BY applications_count DESC, r.req_code LIMIT ")
        .push_bind(limit);
    Ok(query.build_query_as::<TopRequirement>().fetch_all(pool).await?)
}

/// Per active recruiter: requirements assigned, applications handled, hires.
pub async fn recruiter_rows(pool: &PgPool) -> Result<Vec<RecruiterRow>, AppError> {
    Ok(sqlx::query_as::<_, RecruiterRow>(
        r#"
        SELECT u.id AS recruiter_id, u.username, u.full_name,
               (SELECT COUNT(*) FROM requirements r WHERE r.assigned_to = u.id) AS assigned_requirements,
               (SELECT COUNT(*) FROM applications a WHERE a.assigned_recruiter_id = u.id) AS applications,
               (SELECT COUNT(*) FROM applications a
                 WHERE a.assigned_recruiter_id = u.id AND a.status = 'hired') AS hires
        FROM users u
        WHERE u.role = 'recruiter' AND u.is_active
        ORDER BY u.username
        "#,
    )
    .fetch_all(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applications::queries::{self as applications, NewApplication};
    use crate::db::fixtures::{seed_candidate, seed_requirement, seed_user};

    async fn apply(pool: &PgPool, requirement_id: Uuid, recruiter: Uuid) {
        let candidate_id = seed_candidate(pool).await;
        applications::insert(
            pool,
            &NewApplication {
                requirement_id,
                candidate_id,
                assigned_recruiter_id: Some(recruiter),
                source: None,
                notes: None,
            },
            recruiter,
        )
        .await
        .unwrap();
    }

    #[sqlx::test(migrator = "crate::db::MIGRATOR")]
    #[ignore = "requires a Postgres server at DATABASE_URL"]
    async fn test_recruiter_top_requirements_count_own_applications(pool: PgPool) {
        let owner = seed_user(&pool, "recruiter").await;
        let colleague = seed_user(&pool, "recruiter").await;
        let requirement_id = seed_requirement(&pool, owner, Some(owner)).await;
        apply(&pool, requirement_id, owner).await;
        apply(&pool, requirement_id, colleague).await;
        apply(&pool, requirement_id, colleague).await;

        let scoped = Scope {
            recruiter: Some(owner),
            requirement: None,
        };
        let rows = top_requirements(&pool, scoped, 5).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, requirement_id);
        assert_eq!(rows[0].applications_count, 1);

        let everyone = top_requirements(&pool, Scope::default(), 5).await.unwrap();
        assert_eq!(everyone[0].applications_count, 3);
    }
}
