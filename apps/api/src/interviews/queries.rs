use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::interview::{Interview, InterviewStatus, InterviewType};

pub const DEFAULT_DURATION_MINUTES: i32 = 60;

/// Every writable interview column; built from the stored row plus a patch.
#[derive(Debug, Clone)]
pub struct InterviewFields {
    pub interviewer_id: Uuid,
    pub interview_type: InterviewType,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub location: Option<String>,
    pub status: InterviewStatus,
    pub feedback: Option<String>,
    pub rating: Option<i16>,
    pub notes: Option<String>,
}

impl InterviewFields {
    pub fn from_interview(i: &Interview) -> Self {
        Self {
            interviewer_id: i.interviewer_id,
            interview_type: i.interview_type,
            scheduled_at: i.scheduled_at,
            duration_minutes: i.duration_minutes,
            location: i.location.clone(),
            status: i.status,
            feedback: i.feedback.clone(),
            rating: i.rating,
            notes: i.notes.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.duration_minutes <= 0 {
            return Err(AppError::Validation(
                "duration_minutes must be greater than 0".to_string(),
            ));
        }
        if self.rating.is_some_and(|r| !(1..=5).contains(&r)) {
            return Err(AppError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        Ok(())
    }
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Interview>, AppError> {
    Ok(
        sqlx::query_as::<_, Interview>("SELECT * FROM interviews WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn list_for_application(
    pool: &PgPool,
    application_id: Uuid,
) -> Result<Vec<Interview>, AppError> {
    Ok(sqlx::query_as::<_, Interview>(
        "SELECT * FROM interviews WHERE application_id = $1 ORDER BY scheduled_at, id",
    )
    .bind(application_id)
    .fetch_all(pool)
    .await?)
}

pub async fn insert(
    pool: &PgPool,
    application_id: Uuid,
    fields: &InterviewFields,
) -> Result<Interview, AppError> {
    fields.validate()?;

    Ok(sqlx::query_as::<_, Interview>(
        r#"
        INSERT INTO interviews
            (id, application_id, interviewer_id, interview_type, scheduled_at, duration_minutes,
             location, status, feedback, rating, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(application_id)
    .bind(fields.interviewer_id)
    .bind(fields.interview_type)
    .bind(fields.scheduled_at)
    .bind(fields.duration_minutes)
    .bind(&fields.location)
    .bind(fields.status)
    .bind(&fields.feedback)
    .bind(fields.rating)
    .bind(&fields.notes)
    .fetch_one(pool)
    .await?)
}

pub async fn update(pool: &PgPool, id: Uuid, fields: &InterviewFields) -> Result<Interview, AppError> {
    fields.validate()?;

    sqlx::query_as::<_, Interview>(
        r#"
        UPDATE interviews
        SET interviewer_id = $2, interview_type = $3, scheduled_at = $4, duration_minutes = $5,
            location = $6, status = $7, feedback = $8, rating = $9, notes = $10,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(fields.interviewer_id)
    .bind(fields.interview_type)
    .bind(fields.scheduled_at)
    .bind(fields.duration_minutes)
    .bind(&fields.location)
    .bind(fields.status)
    .bind(&fields.feedback)
    .bind(fields.rating)
    .bind(&fields.notes)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Interview"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> InterviewFields {
        InterviewFields {
            interviewer_id: Uuid::new_v4(),
            interview_type: InterviewType::Technical,
            scheduled_at: Utc::now(),
            duration_minutes: DEFAULT_DURATION_MINUTES,
            location: None,
            status: InterviewStatus::Scheduled,
            feedback: None,
            rating: None,
            notes: None,
        }
    }

    #[test]
    fn test_rating_bounds() {
        let mut f = fields();
        for ok in 1..=5 {
            f.rating = Some(ok);
            assert!(f.validate().is_ok());
        }
        f.rating = Some(0);
        assert!(f.validate().is_err());
        f.rating = Some(6);
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_duration_must_be_positive() {
        let mut f = fields();
        f.duration_minutes = 0;
        let err = f.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: duration_minutes must be greater than 0"
        );
    }
}
