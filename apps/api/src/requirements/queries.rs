use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::requirement::{
    EmploymentMode, Priority, Requirement, RequirementStatus, RequirementSummary,
};
use crate::pagination::Page;
use crate::validation::like_pattern;

/// Every writable requirement column except `assigned_to`, which only changes
/// through the assign operation.
#[derive(Debug, Clone)]
pub struct RequirementFields {
    pub req_code: String,
    pub client_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub skills_required: Option<String>,
    pub experience_required: Option<String>,
    pub location: Option<String>,
    pub employment_mode: EmploymentMode,
    pub priority: Priority,
    pub status: RequirementStatus,
    pub positions_count: i32,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub notes: Option<String>,
}

impl RequirementFields {
    pub fn from_requirement(r: &Requirement) -> Self {
        Self {
            req_code: r.req_code.clone(),
            client_id: r.client_id,
            title: r.title.clone(),
            description: r.description.clone(),
            skills_required: r.skills_required.clone(),
            experience_required: r.experience_required.clone(),
            location: r.location.clone(),
            employment_mode: r.employment_mode,
            priority: r.priority,
            status: r.status,
            positions_count: r.positions_count,
            budget_min: r.budget_min,
            budget_max: r.budget_max,
            notes: r.notes.clone(),
        }
    }

    /// Cross-field checks the column types cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.positions_count < 1 {
            return Err(AppError::Validation(
                "positions_count must be at least 1".to_string(),
            ));
        }
        for (field, value) in [("budget_min", self.budget_min), ("budget_max", self.budget_max)] {
            if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
                return Err(AppError::Validation(format!(
                    "{field} must be a non-negative number"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.budget_min, self.budget_max) {
            if min > max {
                return Err(AppError::Validation(
                    "budget_min cannot exceed budget_max".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RequirementFilters {
    pub status: Option<RequirementStatus>,
    pub client_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

const SUMMARY_SELECT: &str = r#"
    SELECT r.*, c.name AS client_name,
           (SELECT COUNT(*) FROM applications a WHERE a.requirement_id = r.id) AS applications_count
    FROM requirements r
    JOIN clients c ON c.id = r.client_id
    WHERE TRUE"#;

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Requirement>, AppError> {
    Ok(
        sqlx::query_as::<_, Requirement>("SELECT * FROM requirements WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn find_summary(pool: &PgPool, id: Uuid) -> Result<Option<RequirementSummary>, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
    query.push(" AND r.id = ").push_bind(id);
    Ok(query
        .build_query_as::<RequirementSummary>()
        .fetch_optional(pool)
        .await?)
}

async fn ensure_code_free(pool: &PgPool, req_code: &str, exclude: Option<Uuid>) -> Result<(), AppError> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM requirements WHERE req_code = $1 AND id IS DISTINCT FROM $2)",
    )
    .bind(req_code)
    .bind(exclude)
    .fetch_one(pool)
    .await?;
    if taken {
        return Err(AppError::Validation(format!(
            "Requirement code '{req_code}' already exists"
        )));
    }
    Ok(())
}

pub async fn insert(
    pool: &PgPool,
    fields: &RequirementFields,
    assigned_to: Option<Uuid>,
    created_by: Uuid,
) -> Result<Requirement, AppError> {
    fields.validate()?;
    ensure_code_free(pool, &fields.req_code, None).await?;

    Ok(sqlx::query_as::<_, Requirement>(
        r#"
        INSERT INTO requirements
            (id, req_code, client_id, title, description, skills_required, experience_required,
             location, employment_mode, priority, status, positions_count, budget_min, budget_max,
             notes, created_by, assigned_to)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&fields.req_code)
    .bind(fields.client_id)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(&fields.skills_required)
    .bind(&fields.experience_required)
    .bind(&fields.location)
    .bind(fields.employment_mode)
    .bind(fields.priority)
    .bind(fields.status)
    .bind(fields.positions_count)
    .bind(fields.budget_min)
    .bind(fields.budget_max)
    .bind(&fields.notes)
    .bind(created_by)
    .bind(assigned_to)
    .fetch_one(pool)
    .await?)
}

pub async fn update(pool: &PgPool, id: Uuid, fields: &RequirementFields) -> Result<Requirement, AppError> {
    fields.validate()?;
    ensure_code_free(pool, &fields.req_code, Some(id)).await?;

    sqlx::query_as::<_, Requirement>(
        r#"
        UPDATE requirements
        SET req_code = $2, client_id = $3, title = $4, description = $5, skills_required = $6,
            experience_required = $7, location = $8, employment_mode = $9, priority = $10,
            status = $11, positions_count = $12, budget_min = $13, budget_max = $14, notes = $15,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&fields.req_code)
    .bind(fields.client_id)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(&fields.skills_required)
    .bind(&fields.experience_required)
    .bind(&fields.location)
    .bind(fields.employment_mode)
    .bind(fields.priority)
    .bind(fields.status)
    .bind(fields.positions_count)
    .bind(fields.budget_min)
    .bind(fields.budget_max)
    .bind(&fields.notes)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Requirement"))
}

/// Hands the requirement to a recruiter. An `open` requirement moves to `assigned`;
/// any other status is kept.
pub async fn assign(pool: &PgPool, id: Uuid, recruiter_id: Uuid) -> Result<Requirement, AppError> {
    sqlx::query_as::<_, Requirement>(
        r#"
        UPDATE requirements
        SET assigned_to = $2,
            status = CASE WHEN status = 'open' THEN 'assigned' ELSE status END,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(recruiter_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Requirement"))
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &RequirementFilters) {
    if let Some(status) = filters.status {
        qb.push(" AND r.status = ").push_bind(status);
    }
    if let Some(client_id) = filters.client_id {
        qb.push(" AND r.client_id = ").push_bind(client_id);
    }
    if let Some(assigned_to) = filters.assigned_to {
        qb.push(" AND r.assigned_to = ").push_bind(assigned_to);
    }
    if let Some(priority) = filters.priority {
        qb.push(" AND r.priority = ").push_bind(priority);
    }
    if let Some(search) = &filters.search {
        let pattern = like_pattern(search);
        qb.push(" AND (r.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.req_code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.skills_required ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list(
    pool: &PgPool,
    filters: &RequirementFilters,
    page: Page,
) -> Result<(Vec<RequirementSummary>, i64), AppError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM requirements r WHERE TRUE");
    push_filters(&mut count, filters);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut query = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
    push_filters(&mut query, filters);
    query
        .push(" ORDER BY r.created_at DESC, r.id LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let requirements = query
        .build_query_as::<RequirementSummary>()
        .fetch_all(pool)
        .await?;

    Ok((requirements, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> RequirementFields {
        RequirementFields {
            req_code: "REQ-001".to_string(),
            client_id: Uuid::new_v4(),
            title: "Backend Engineer".to_string(),
            description: None,
            skills_required: Some("rust, postgres".to_string()),
            experience_required: None,
            location: None,
            employment_mode: EmploymentMode::Permanent,
            priority: Priority::default(),
            status: RequirementStatus::Open,
            positions_count: 2,
            budget_min: Some(10.0),
            budget_max: Some(20.0),
            notes: None,
        }
    }

    #[test]
    fn test_valid_fields_pass() {
        assert!(fields().validate().is_ok());
    }

    #[test]
    fn test_budget_min_above_max_rejected() {
        let mut f = fields();
        f.budget_min = Some(30.0);
        let err = f.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: budget_min cannot exceed budget_max"
        );

        f.budget_max = None;
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_positions_must_be_positive() {
        let mut f = fields();
        f.positions_count = 0;
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_negative_budget_rejected() {
        let mut f = fields();
        f.budget_min = Some(-1.0);
        assert!(f.validate().is_err());
    }
}
