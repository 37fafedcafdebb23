//! Axum route handlers for requirements (open positions at a client).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::applications::handlers::list_scoped;
use crate::applications::queries::ApplicationFilters;
use crate::auth::AuthUser;
use crate::clients;
use crate::errors::AppError;
use crate::models::application::ApplicationDetail;
use crate::models::requirement::{
    EmploymentMode, Priority, Requirement, RequirementStatus, RequirementSummary,
};
use crate::models::user::Role;
use crate::pagination::{PageParams, Paginated};
use crate::requirements::queries::{self, RequirementFields, RequirementFilters};
use crate::state::AppState;
use crate::users;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct RequirementListQuery {
    pub status: Option<RequirementStatus>,
    pub client_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequirementRequest {
    pub req_code: String,
    pub client_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub skills_required: Option<String>,
    pub experience_required: Option<String>,
    pub location: Option<String>,
    pub employment_mode: EmploymentMode,
    #[serde(default)]
    pub priority: Priority,
    pub positions_count: Option<i32>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
}

/// Omitted fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequirementRequest {
    pub req_code: Option<String>,
    pub client_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub skills_required: Option<String>,
    pub experience_required: Option<String>,
    pub location: Option<String>,
    pub employment_mode: Option<EmploymentMode>,
    pub priority: Option<Priority>,
    pub status: Option<RequirementStatus>,
    pub positions_count: Option<i32>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub recruiter_id: Uuid,
}

impl UpdateRequirementRequest {
    fn apply(self, mut fields: RequirementFields) -> Result<RequirementFields, AppError> {
        if let Some(code) = self.req_code {
            fields.req_code = validation::required_text("req_code", &code, 50)?;
        }
        if let Some(client_id) = self.client_id {
            fields.client_id = client_id;
        }
        if let Some(title) = self.title {
            fields.title = validation::required_text("title", &title, 200)?;
        }
        if self.description.is_some() {
            fields.description = validation::optional_text(self.description);
        }
        if self.skills_required.is_some() {
            fields.skills_required = validation::optional_text(self.skills_required);
        }
        if self.experience_required.is_some() {
            fields.experience_required = validation::optional_text(self.experience_required);
        }
        if self.location.is_some() {
            fields.location = validation::optional_text(self.location);
        }
        if let Some(mode) = self.employment_mode {
            fields.employment_mode = mode;
        }
        if let Some(priority) = self.priority {
            fields.priority = priority;
        }
        if let Some(status) = self.status {
            fields.status = status;
        }
        if let Some(positions) = self.positions_count {
            fields.positions_count = positions;
        }
        if self.budget_min.is_some() {
            fields.budget_min = self.budget_min;
        }
        if self.budget_max.is_some() {
            fields.budget_max = self.budget_max;
        }
        if self.notes.is_some() {
            fields.notes = validation::optional_text(self.notes);
        }
        Ok(fields)
    }
}

/// Fails unless the client exists and is still active.
async fn require_active_client(state: &AppState, client_id: Uuid) -> Result<(), AppError> {
    let client = clients::queries::find_by_id(&state.db, client_id)
        .await?
        .ok_or_else(|| AppError::not_found("Client"))?;
    if !client.is_active {
        return Err(AppError::Validation(format!(
            "Client '{}' is inactive",
            client.name
        )));
    }
    Ok(())
}

/// Loads a requirement the caller may see. Recruiters only see their own.
pub(crate) async fn load_visible(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> Result<Requirement, AppError> {
    let requirement = queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Requirement"))?;
    auth.require_assigned(requirement.assigned_to, "requirement")?;
    Ok(requirement)
}

/// GET /api/v1/requirements
pub async fn handle_list_requirements(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(page): Query<PageParams>,
    Query(filters): Query<RequirementListQuery>,
) -> Result<Json<Paginated<RequirementSummary>>, AppError> {
    let page = page.resolve()?;
    let assigned_to = if auth.role.is_scoped_to_own_work() {
        Some(auth.id)
    } else {
        filters.assigned_to
    };
    let filters = RequirementFilters {
        status: filters.status,
        client_id: filters.client_id,
        assigned_to,
        priority: filters.priority,
        search: validation::optional_text(filters.search),
    };

    let (requirements, total) = queries::list(&state.db, &filters, page).await?;
    Ok(Json(Paginated::new(requirements, total, page)))
}

/// POST /api/v1/requirements
pub async fn handle_create_requirement(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateRequirementRequest>,
) -> Result<(StatusCode, Json<Requirement>), AppError> {
    auth.require(
        auth.role.can_manage_requirements(),
        "Not authorized to manage requirements",
    )?;

    let fields = RequirementFields {
        req_code: validation::required_text("req_code", &req.req_code, 50)?,
        client_id: req.client_id,
        title: validation::required_text("title", &req.title, 200)?,
        description: validation::optional_text(req.description),
        skills_required: validation::optional_text(req.skills_required),
        experience_required: validation::optional_text(req.experience_required),
        location: validation::optional_text(req.location),
        employment_mode: req.employment_mode,
        priority: req.priority,
        status: if req.assigned_to.is_some() {
            RequirementStatus::Assigned
        } else {
            RequirementStatus::Open
        },
        positions_count: req.positions_count.unwrap_or(1),
        budget_min: req.budget_min,
        budget_max: req.budget_max,
        notes: validation::optional_text(req.notes),
    };
    fields.validate()?;

    require_active_client(&state, fields.client_id).await?;
    if let Some(recruiter_id) = req.assigned_to {
        users::queries::require_active_with_role(
            &state.db,
            recruiter_id,
            Some(Role::Recruiter),
            "assigned_to",
        )
        .await?;
    }

    let requirement = queries::insert(&state.db, &fields, req.assigned_to, auth.id).await?;
    tracing::info!(
        "Requirement {} '{}' created by {}",
        requirement.req_code,
        requirement.title,
        auth.username
    );
    Ok((StatusCode::CREATED, Json(requirement)))
}

/// GET /api/v1/requirements/:id
pub async fn handle_get_requirement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RequirementSummary>, AppError> {
    let summary = queries::find_summary(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Requirement"))?;
    auth.require_assigned(summary.requirement.assigned_to, "requirement")?;
    Ok(Json(summary))
}

/// PUT /api/v1/requirements/:id
pub async fn handle_update_requirement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRequirementRequest>,
) -> Result<Json<Requirement>, AppError> {
    auth.require(
        auth.role.can_manage_requirements(),
        "Not authorized to manage requirements",
    )?;

    let existing = queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Requirement"))?;
    let fields = req.apply(RequirementFields::from_requirement(&existing))?;
    fields.validate()?;
    if fields.client_id != existing.client_id {
        require_active_client(&state, fields.client_id).await?;
    }

    let requirement = queries::update(&state.db, id, &fields).await?;
    Ok(Json(requirement))
}

/// POST /api/v1/requirements/:id/assign
pub async fn handle_assign_requirement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<Requirement>, AppError> {
    auth.require(
        auth.role.can_manage_requirements(),
        "Not authorized to assign requirements",
    )?;

    let recruiter = users::queries::require_active_with_role(
        &state.db,
        req.recruiter_id,
        Some(Role::Recruiter),
        "recruiter_id",
    )
    .await?;
    let requirement = queries::assign(&state.db, id, recruiter.id).await?;

    tracing::info!(
        "Requirement {} assigned to {} by {}",
        requirement.req_code,
        recruiter.username,
        auth.username
    );
    Ok(Json(requirement))
}

/// GET /api/v1/requirements/:id/applications
pub async fn handle_requirement_applications(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<ApplicationDetail>>, AppError> {
    let page = page.resolve()?;
    let requirement = load_visible(&state, &auth, id).await?;

    let filters = ApplicationFilters {
        requirement_id: Some(requirement.id),
        ..Default::default()
    };
    Ok(Json(list_scoped(&state, &auth, filters, page).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing() -> RequirementFields {
        RequirementFields {
            req_code: "REQ-7".to_string(),
            client_id: Uuid::new_v4(),
            title: "Data Engineer".to_string(),
            description: Some("Pipelines".to_string()),
            skills_required: None,
            experience_required: None,
            location: Some("Pune".to_string()),
            employment_mode: EmploymentMode::Contract,
            priority: Priority::High,
            status: RequirementStatus::Assigned,
            positions_count: 1,
            budget_min: None,
            budget_max: Some(50.0),
            notes: None,
        }
    }

    #[test]
    fn test_update_keeps_omitted_fields() {
        let before = existing();
        let update = UpdateRequirementRequest {
            title: Some("  Senior Data Engineer ".to_string()),
            status: Some(RequirementStatus::OnHold),
            ..Default::default()
        };
        let after = update.apply(before.clone()).unwrap();

        assert_eq!(after.title, "Senior Data Engineer");
        assert_eq!(after.status, RequirementStatus::OnHold);
        assert_eq!(after.req_code, before.req_code);
        assert_eq!(after.location, before.location);
        assert_eq!(after.budget_max, Some(50.0));
        assert_eq!(after.priority, Priority::High);
    }

    #[test]
    fn test_update_rejects_blank_title() {
        let update = UpdateRequirementRequest {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(update.apply(existing()).is_err());
    }

    #[test]
    fn test_update_can_break_budget_order() {
        let update = UpdateRequirementRequest {
            budget_min: Some(80.0),
            ..Default::default()
        };
        let merged = update.apply(existing()).unwrap();
        assert!(merged.validate().is_err());
    }

    #[test]
    fn test_create_request_defaults_priority() {
        let body = serde_json::json!({
            "req_code": "REQ-1",
            "client_id": Uuid::new_v4(),
            "title": "QA",
            "employment_mode": "permanent",
        });
        let req: CreateRequirementRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.priority, Priority::Medium);
        assert!(req.positions_count.is_none());
    }
}
