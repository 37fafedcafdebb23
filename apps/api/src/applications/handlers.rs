//! Axum route handlers for applications and their status pipeline.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::applications::queries::{self, ApplicationFilters, NewApplication};
use crate::auth::AuthUser;
use crate::candidates;
use crate::errors::AppError;
use crate::models::application::{Application, ApplicationDetail, StatusHistoryEntry};
use crate::models::user::Role;
use crate::pagination::{Page, PageParams, Paginated};
use crate::pipeline::{self, allowed_transitions, ApplicationStatus};
use crate::requirements::handlers::load_visible;
use crate::state::AppState;
use crate::users;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct ApplicationListQuery {
    pub status: Option<ApplicationStatus>,
    pub requirement_id: Option<Uuid>,
    pub candidate_id: Option<Uuid>,
    pub assigned_recruiter_id: Option<Uuid>,
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub requirement_id: Uuid,
    pub candidate_id: Uuid,
    pub assigned_recruiter_id: Option<Uuid>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

/// Omitted fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateApplicationRequest {
    pub assigned_recruiter_id: Option<Uuid>,
    pub source: Option<String>,
    pub notes: Option<String>,
    /// Present only to reject it: status moves through `PUT /:id/status`.
    pub status: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: ApplicationStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransitionsResponse {
    pub current: ApplicationStatus,
    pub allowed: Vec<ApplicationStatus>,
}

/// Lists applications, narrowing recruiters to the ones assigned to them.
pub(crate) async fn list_scoped(
    state: &AppState,
    auth: &AuthUser,
    mut filters: ApplicationFilters,
    page: Page,
) -> Result<Paginated<ApplicationDetail>, AppError> {
    if auth.role.is_scoped_to_own_work() {
        filters.assigned_recruiter_id = Some(auth.id);
    }
    let (applications, total) = queries::list(&state.db, &filters, page).await?;
    Ok(Paginated::new(applications, total, page))
}

/// Loads an application the caller may act on.
pub(crate) async fn load_accessible(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> Result<Application, AppError> {
    let application = queries::require(&state.db, id).await?;
    auth.require_assigned(application.assigned_recruiter_id, "application")?;
    Ok(application)
}

/// Checks a recruiter id named in a request body.
async fn check_recruiter(state: &AppState, auth: &AuthUser, recruiter_id: Uuid) -> Result<(), AppError> {
    auth.require_assigned(Some(recruiter_id), "recruiter assignment")?;
    users::queries::require_active_with_role(
        &state.db,
        recruiter_id,
        Some(Role::Recruiter),
        "assigned_recruiter_id",
    )
    .await?;
    Ok(())
}

/// GET /api/v1/applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(page): Query<PageParams>,
    Query(filters): Query<ApplicationListQuery>,
) -> Result<Json<Paginated<ApplicationDetail>>, AppError> {
    let page = page.resolve()?;
    let filters = ApplicationFilters {
        status: filters.status,
        requirement_id: filters.requirement_id,
        candidate_id: filters.candidate_id,
        assigned_recruiter_id: filters.assigned_recruiter_id,
        source: validation::optional_text(filters.source),
    };
    Ok(Json(list_scoped(&state, &auth, filters, page).await?))
}

/// POST /api/v1/applications
pub async fn handle_create_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    let requirement = load_visible(&state, &auth, req.requirement_id).await?;
    if !requirement.status.accepts_applications() {
        return Err(AppError::Validation(format!(
            "Requirement {} is closed and accepts no new applications",
            requirement.req_code
        )));
    }

    candidates::queries::find_by_id(&state.db, req.candidate_id)
        .await?
        .ok_or_else(|| AppError::not_found("Candidate"))?;

    let assigned_recruiter_id = match req.assigned_recruiter_id {
        Some(recruiter_id) => {
            check_recruiter(&state, &auth, recruiter_id).await?;
            Some(recruiter_id)
        }
        None => requirement.assigned_to,
    };

    let new = NewApplication {
        requirement_id: requirement.id,
        candidate_id: req.candidate_id,
        assigned_recruiter_id,
        source: validation::optional_text(req.source),
        notes: validation::optional_text(req.notes),
    };
    let application = queries::insert(&state.db, &new, auth.id).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /api/v1/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationDetail>, AppError> {
    let detail = queries::find_detail(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Application"))?;
    auth.require_assigned(detail.application.assigned_recruiter_id, "application")?;
    Ok(Json(detail))
}

/// PUT /api/v1/applications/:id
pub async fn handle_update_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateApplicationRequest>,
) -> Result<Json<Application>, AppError> {
    if req.status.is_some() {
        return Err(AppError::Validation(
            "Status cannot be changed here; use PUT /api/v1/applications/{id}/status".to_string(),
        ));
    }

    let existing = load_accessible(&state, &auth, id).await?;

    let assigned_recruiter_id = match req.assigned_recruiter_id {
        Some(recruiter_id) if Some(recruiter_id) != existing.assigned_recruiter_id => {
            check_recruiter(&state, &auth, recruiter_id).await?;
            Some(recruiter_id)
        }
        _ => existing.assigned_recruiter_id,
    };
    let source = match req.source {
        Some(source) => validation::optional_text(Some(source)),
        None => existing.source,
    };
    let notes = match req.notes {
        Some(notes) => validation::optional_text(Some(notes)),
        None => existing.notes,
    };

    let application = queries::update(
        &state.db,
        id,
        assigned_recruiter_id,
        source.as_deref(),
        notes.as_deref(),
    )
    .await?;
    Ok(Json(application))
}

/// DELETE /api/v1/applications/:id
pub async fn handle_delete_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require(
        auth.role.can_delete_applications(),
        "Admin access required to delete applications",
    )?;

    queries::delete(&state.db, id).await?;
    tracing::info!("Application {id} deleted by {}", auth.username);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/applications/:id/status
pub async fn handle_change_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<Application>, AppError> {
    let application = load_accessible(&state, &auth, id).await?;

    let reason = validation::optional_text(req.reason);
    let notes = validation::optional_text(req.notes);
    let updated = pipeline::change_status(
        &state.db,
        &application,
        req.status,
        auth.id,
        reason.as_deref(),
        notes.as_deref(),
    )
    .await?;
    Ok(Json(updated))
}

/// GET /api/v1/applications/:id/history
pub async fn handle_status_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatusHistoryEntry>>, AppError> {
    let application = load_accessible(&state, &auth, id).await?;
    Ok(Json(pipeline::history_for(&state.db, application.id).await?))
}

/// GET /api/v1/applications/:id/transitions
pub async fn handle_allowed_transitions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TransitionsResponse>, AppError> {
    let application = load_accessible(&state, &auth, id).await?;
    Ok(Json(TransitionsResponse {
        current: application.status,
        allowed: allowed_transitions(application.status).to_vec(),
    }))
}
