//! Axum route handlers for interviews scheduled against an application.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::applications::handlers::load_accessible;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::interviews::queries::{self, InterviewFields, DEFAULT_DURATION_MINUTES};
use crate::models::interview::{Interview, InterviewStatus, InterviewType};
use crate::state::AppState;
use crate::users;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct ScheduleInterviewRequest {
    pub interviewer_id: Uuid,
    pub interview_type: InterviewType,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Omitted fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateInterviewRequest {
    pub interviewer_id: Option<Uuid>,
    pub interview_type: Option<InterviewType>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub location: Option<String>,
    pub status: Option<InterviewStatus>,
    pub feedback: Option<String>,
    pub rating: Option<i16>,
    pub notes: Option<String>,
}

impl UpdateInterviewRequest {
    fn apply(self, mut fields: InterviewFields) -> InterviewFields {
        if let Some(interviewer_id) = self.interviewer_id {
            fields.interviewer_id = interviewer_id;
        }
        if let Some(interview_type) = self.interview_type {
            fields.interview_type = interview_type;
        }
        if let Some(scheduled_at) = self.scheduled_at {
            fields.scheduled_at = scheduled_at;
        }
        if let Some(duration) = self.duration_minutes {
            fields.duration_minutes = duration;
        }
        if self.location.is_some() {
            fields.location = validation::optional_text(self.location);
        }
        if let Some(status) = self.status {
            fields.status = status;
        }
        if self.feedback.is_some() {
            fields.feedback = validation::optional_text(self.feedback);
        }
        if self.rating.is_some() {
            fields.rating = self.rating;
        }
        if self.notes.is_some() {
            fields.notes = validation::optional_text(self.notes);
        }
        fields
    }
}

/// POST /api/v1/applications/:id/interviews
pub async fn handle_schedule_interview(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(application_id): Path<Uuid>,
    Json(req): Json<ScheduleInterviewRequest>,
) -> Result<(StatusCode, Json<Interview>), AppError> {
    let application = load_accessible(&state, &auth, application_id).await?;
    if application.status.is_terminal() {
        return Err(AppError::Validation(format!(
            "Cannot schedule an interview for an application in status '{}'",
            application.status
        )));
    }

    let fields = InterviewFields {
        interviewer_id: req.interviewer_id,
        interview_type: req.interview_type,
        scheduled_at: req.scheduled_at,
        duration_minutes: req.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
        location: validation::optional_text(req.location),
        status: InterviewStatus::Scheduled,
        feedback: None,
        rating: None,
        notes: validation::optional_text(req.notes),
    };
    fields.validate()?;
    users::queries::require_active_with_role(&state.db, fields.interviewer_id, None, "interviewer_id")
        .await?;

    let interview = queries::insert(&state.db, application.id, &fields).await?;
    tracing::info!(
        "Interview {} scheduled for application {} at {}",
        interview.id,
        application.id,
        interview.scheduled_at
    );
    Ok((StatusCode::CREATED, Json(interview)))
}

/// GET /api/v1/applications/:id/interviews
pub async fn handle_list_interviews(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(application_id): Path<Uuid>,
) -> Result<Json<Vec<Interview>>, AppError> {
    let application = load_accessible(&state, &auth, application_id).await?;
    Ok(Json(
        queries::list_for_application(&state.db, application.id).await?,
    ))
}

/// PATCH /api/v1/interviews/:id
pub async fn handle_update_interview(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateInterviewRequest>,
) -> Result<Json<Interview>, AppError> {
    let existing = queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Interview"))?;
    load_accessible(&state, &auth, existing.application_id).await?;

    let fields = req.apply(InterviewFields::from_interview(&existing));
    fields.validate()?;
    if fields.interviewer_id != existing.interviewer_id {
        users::queries::require_active_with_role(
            &state.db,
            fields.interviewer_id,
            None,
            "interviewer_id",
        )
        .await?;
    }

    let interview = queries::update(&state.db, id, &fields).await?;
    Ok(Json(interview))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> InterviewFields {
        InterviewFields {
            interviewer_id: Uuid::new_v4(),
            interview_type: InterviewType::Video,
            scheduled_at: Utc::now(),
            duration_minutes: 45,
            location: Some("Meet".to_string()),
            status: InterviewStatus::Scheduled,
            feedback: None,
            rating: None,
            notes: None,
        }
    }

    #[test]
    fn test_completing_interview_with_feedback() {
        let before = stored();
        let patch = UpdateInterviewRequest {
            status: Some(InterviewStatus::Completed),
            feedback: Some("Strong systems design".to_string()),
            rating: Some(4),
            ..Default::default()
        };
        let after = patch.apply(before.clone());

        assert_eq!(after.status, InterviewStatus::Completed);
        assert_eq!(after.rating, Some(4));
        assert_eq!(after.duration_minutes, 45);
        assert_eq!(after.location, before.location);
        assert!(after.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_rating_fails_validation() {
        let patch = UpdateInterviewRequest {
            rating: Some(9),
            ..Default::default()
        };
        assert!(patch.apply(stored()).validate().is_err());
    }

    #[test]
    fn test_schedule_request_parses_rfc3339() {
        let req: ScheduleInterviewRequest = serde_json::from_value(serde_json::json!({
            "interviewer_id": Uuid::new_v4(),
            "interview_type": "in_person",
            "scheduled_at": "2026-03-01T10:30:00Z",
        }))
        .unwrap();
        assert_eq!(req.interview_type, InterviewType::InPerson);
        assert!(req.duration_minutes.is_none());
    }
}
