//! Axum route handlers for candidates and their resume files.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::applications::handlers::list_scoped;
use crate::applications::queries::{self as application_queries, ApplicationFilters};
use crate::auth::AuthUser;
use crate::candidates::queries::{self, CandidateFields, CandidateFilters};
use crate::errors::AppError;
use crate::models::application::ApplicationDetail;
use crate::models::candidate::{Candidate, CandidateSummary};
use crate::pagination::{PageParams, Paginated};
use crate::state::AppState;
use crate::storage::{check_resume_size, content_type_for, resume_extension, resume_key};
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct CandidateListQuery {
    pub search: Option<String>,
    pub location: Option<String>,
    pub skills: Option<String>,
    pub experience_min: Option<f64>,
    pub experience_max: Option<f64>,
}

/// Body for both create and full update.
#[derive(Debug, Default, Deserialize)]
pub struct CandidateRequest {
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

impl CandidateRequest {
    fn into_fields(self) -> Result<CandidateFields, AppError> {
        Ok(CandidateFields {
            name: validation::required_text("name", &self.name, 200)?,
            email: validation::email("email", &self.email)?,
            phone: validation::optional_text(self.phone),
            current_company: validation::optional_text(self.current_company),
            current_designation: validation::optional_text(self.current_designation),
            experience_years: validation::non_negative("experience_years", self.experience_years)?,
            current_ctc: validation::non_negative("current_ctc", self.current_ctc)?,
            expected_ctc: validation::non_negative("expected_ctc", self.expected_ctc)?,
            notice_period: validation::optional_text(self.notice_period),
            location: validation::optional_text(self.location),
            skills: validation::optional_text(self.skills),
            linkedin_url: validation::optional_text(self.linkedin_url),
            notes: validation::optional_text(self.notes),
        })
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("File too large. Maximum size is 10MB".to_string())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}

async fn require_candidate(state: &AppState, id: Uuid) -> Result<Candidate, AppError> {
    queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Candidate"))
}

/// Best-effort removal of a file no row points at anymore.
async fn discard_resume(state: &AppState, key: &str) {
    if let Err(e) = state.resumes.delete(key).await {
        tracing::warn!("Failed to remove resume {key}: {e}");
    }
}

/// GET /api/v1/candidates
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(page): Query<PageParams>,
    Query(filters): Query<CandidateListQuery>,
) -> Result<Json<Paginated<CandidateSummary>>, AppError> {
    let page = page.resolve()?;
    if let (Some(min), Some(max)) = (filters.experience_min, filters.experience_max) {
        if min > max {
            return Err(AppError::Validation(
                "experience_min cannot exceed experience_max".to_string(),
            ));
        }
    }
    let filters = CandidateFilters {
        search: validation::optional_text(filters.search),
        location: validation::optional_text(filters.location),
        skills: validation::optional_text(filters.skills),
        experience_min: filters.experience_min,
        experience_max: filters.experience_max,
    };

    let (candidates, total) = queries::list(&state.db, &filters, page).await?;
    Ok(Json(Paginated::new(candidates, total, page)))
}

/// POST /api/v1/candidates
pub async fn handle_create_candidate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CandidateRequest>,
) -> Result<(StatusCode, Json<Candidate>), AppError> {
    let candidate = queries::insert(&state.db, &req.into_fields()?, auth.id).await?;
    tracing::info!("Candidate {} added by {}", candidate.id, auth.username);
    Ok((StatusCode::CREATED, Json(candidate)))
}

/// GET /api/v1/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CandidateSummary>, AppError> {
    let candidate = queries::find_summary(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Candidate"))?;
    Ok(Json(candidate))
}

/// PUT /api/v1/candidates/:id
pub async fn handle_update_candidate(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<CandidateRequest>,
) -> Result<Json<Candidate>, AppError> {
    let candidate = queries::update(&state.db, id, &req.into_fields()?).await?;
    Ok(Json(candidate))
}

/// DELETE /api/v1/candidates/:id
pub async fn handle_delete_candidate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require(
        auth.role.can_delete_candidates(),
        "Not authorized to delete candidates",
    )?;

    let candidate = require_candidate(&state, id).await?;
    let applications = application_queries::count_for_candidate(&state.db, id).await?;
    if applications > 0 {
        return Err(AppError::Validation(format!(
            "Candidate has {applications} application(s) and cannot be deleted"
        )));
    }

    queries::delete(&state.db, id).await?;
    if let Some(key) = &candidate.resume_key {
        discard_resume(&state, key).await;
    }

    tracing::info!("Candidate {id} deleted by {}", auth.username);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/candidates/:id/resume
///
/// Expects a multipart body with the file in field `file`. A previous resume is
/// removed once the new one is stored.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Candidate>, AppError> {
    let candidate = require_candidate(&state, id).await?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("file field has no filename".to_string()))?;
        let extension = resume_extension(&filename)?;
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((extension, bytes));
        break;
    }
    let (extension, bytes) =
        upload.ok_or_else(|| AppError::Validation("Missing multipart field 'file'".to_string()))?;
    check_resume_size(bytes.len())?;

    let key = resume_key(candidate.id, &extension);
    let size = bytes.len();
    state
        .resumes
        .put(&key, bytes, content_type_for(&key))
        .await?;

    let updated = match queries::set_resume_key(&state.db, candidate.id, &key).await {
        Ok(updated) => updated,
        Err(e) => {
            discard_resume(&state, &key).await;
            return Err(e);
        }
    };
    if let Some(old) = &candidate.resume_key {
        discard_resume(&state, old).await;
    }

    tracing::info!(
        "Resume uploaded for candidate {} by {} ({size} bytes)",
        candidate.id,
        auth.username
    );
    Ok(Json(updated))
}

/// GET /api/v1/candidates/:id/resume
pub async fn handle_download_resume(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let candidate = require_candidate(&state, id).await?;
    let key = candidate
        .resume_key
        .ok_or_else(|| AppError::not_found("Resume"))?;
    let bytes = state.resumes.get(&key).await?;

    let filename = key.rsplit('/').next().unwrap_or("resume");
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&key).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        Body::from(bytes),
    )
        .into_response())
}

/// GET /api/v1/candidates/:id/applications
pub async fn handle_candidate_applications(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<ApplicationDetail>>, AppError> {
    let page = page.resolve()?;
    let candidate = require_candidate(&state, id).await?;

    let filters = ApplicationFilters {
        candidate_id: Some(candidate.id),
        ..Default::default()
    };
    Ok(Json(list_scoped(&state, &auth, filters, page).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CandidateRequest {
        CandidateRequest {
            name: " Asha Rao ".to_string(),
            email: "Asha.Rao@Example.com".to_string(),
            skills: Some("rust, sql".to_string()),
            location: Some("   ".to_string()),
            experience_years: Some(4.5),
            ..Default::default()
        }
    }

    #[test]
    fn test_request_normalizes_fields() {
        let fields = request().into_fields().unwrap();
        assert_eq!(fields.name, "Asha Rao");
        assert_eq!(fields.email, "asha.rao@example.com");
        assert_eq!(fields.location, None);
        assert_eq!(fields.experience_years, Some(4.5));
    }

    #[test]
    fn test_request_rejects_bad_email() {
        let mut req = request();
        req.email = "not-an-email".to_string();
        assert!(req.into_fields().is_err());
    }

    #[test]
    fn test_request_rejects_negative_ctc() {
        let mut req = request();
        req.expected_ctc = Some(-5.0);
        let err = req.into_fields().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: expected_ctc must be a non-negative number"
        );
    }
}
