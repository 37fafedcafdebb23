//! Axum route handlers for the dashboard and analytics endpoints.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::dashboard::queries::{self, Bucket, Scope, SourceCount, TopRequirement};
use crate::dashboard::stats::{
    average_days_in_stage, day_range, funnel, month_starts, percentage, zero_filled,
    zero_fill_periods, FunnelStage, PeriodCount,
};
use crate::errors::AppError;
use crate::models::requirement::RequirementStatus;
use crate::pipeline::ApplicationStatus;
use crate::requirements::handlers::load_visible;
use crate::state::AppState;

const RECENT_DAYS: i64 = 30;
const DEFAULT_TREND_MONTHS: u32 = 12;
const MAX_TREND_MONTHS: u32 = 24;
const DEFAULT_TOP_LIMIT: i64 = 5;
const MAX_TOP_LIMIT: i64 = 50;

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_requirements: i64,
    pub active_requirements: i64,
    pub requirements_by_status: BTreeMap<String, i64>,
    pub total_candidates: i64,
    pub total_applications: i64,
    pub applications_by_status: BTreeMap<String, i64>,
    pub hired: i64,
    pub recent_applications: i64,
    pub recent_interviews: i64,
}

#[derive(Debug, Serialize)]
pub struct PipelineAnalytics {
    pub stages: Vec<FunnelStage>,
    /// Hired as a share of everything that entered the pipeline.
    pub overall_hire_rate: f64,
    pub average_days_in_stage: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub months: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TrendResponse {
    pub months: u32,
    pub trend: Vec<PeriodCount>,
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecruiterPerformance {
    pub recruiter_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub assigned_requirements: i64,
    pub applications: i64,
    pub hires: i64,
    pub hire_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct RequirementAnalytics {
    pub requirement_id: Uuid,
    pub req_code: String,
    pub title: String,
    pub total_applications: i64,
    pub applications_by_status: BTreeMap<String, i64>,
    pub sources: Vec<SourceCount>,
    pub daily_applications: Vec<PeriodCount>,
    pub stages: Vec<FunnelStage>,
    pub average_days_in_stage: BTreeMap<String, f64>,
}

fn scope_for(auth: &AuthUser) -> Scope {
    Scope {
        recruiter: auth.role.is_scoped_to_own_work().then_some(auth.id),
        requirement: None,
    }
}

fn application_counts(rows: &[(String, i64)]) -> BTreeMap<String, i64> {
    zero_filled(ApplicationStatus::ALL.iter().map(|s| s.as_str()), rows)
}

fn resolve_months(months: Option<u32>) -> Result<u32, AppError> {
    let months = months.unwrap_or(DEFAULT_TREND_MONTHS);
    if !(1..=MAX_TREND_MONTHS).contains(&months) {
        return Err(AppError::Validation(format!(
            "months must be between 1 and {MAX_TREND_MONTHS}"
        )));
    }
    Ok(months)
}

fn resolve_limit(limit: Option<i64>) -> Result<i64, AppError> {
    let limit = limit.unwrap_or(DEFAULT_TOP_LIMIT);
    if !(1..=MAX_TOP_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_TOP_LIMIT}"
        )));
    }
    Ok(limit)
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DashboardStats>, AppError> {
    let scope = scope_for(&auth);
    let since = Utc::now() - Duration::days(RECENT_DAYS);

    let requirement_rows = queries::requirements_by_status(&state.db, scope).await?;
    let application_rows = queries::applications_by_status(&state.db, scope).await?;
    let total_candidates = queries::total_candidates(&state.db, scope).await?;
    let recent_applications = queries::applications_since(&state.db, scope, since).await?;
    let recent_interviews = queries::interviews_since(&state.db, scope, since).await?;

    let requirements_by_status =
        zero_filled(RequirementStatus::ALL.iter().map(|s| s.as_str()), &requirement_rows);
    let active_requirements = RequirementStatus::ALL
        .iter()
        .filter(|s| s.is_active())
        .map(|s| requirements_by_status.get(s.as_str()).copied().unwrap_or(0))
        .sum();
    let applications_by_status = application_counts(&application_rows);
    let hired = applications_by_status
        .get(ApplicationStatus::Hired.as_str())
        .copied()
        .unwrap_or(0);

    Ok(Json(DashboardStats {
        total_requirements: requirements_by_status.values().sum(),
        active_requirements,
        requirements_by_status,
        total_candidates,
        total_applications: applications_by_status.values().sum(),
        applications_by_status,
        hired,
        recent_applications,
        recent_interviews,
    }))
}

async fn pipeline_for(state: &AppState, scope: Scope) -> Result<PipelineAnalytics, AppError> {
    let reached = queries::stage_reach(&state.db, scope).await?;
    let points = queries::history_points(&state.db, scope).await?;

    let stages = funnel(&reached);
    let entered = stages.first().map(|s| s.reached).unwrap_or(0);
    let hired = stages.last().map(|s| s.reached).unwrap_or(0);

    Ok(PipelineAnalytics {
        stages,
        overall_hire_rate: percentage(hired, entered),
        average_days_in_stage: average_days_in_stage(&points, Utc::now()),
    })
}

/// GET /api/v1/analytics/pipeline
pub async fn handle_pipeline_analytics(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PipelineAnalytics>, AppError> {
    Ok(Json(pipeline_for(&state, scope_for(&auth)).await?))
}

/// GET /api/v1/analytics/trend
pub async fn handle_application_trend(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendResponse>, AppError> {
    let months = resolve_months(query.months)?;
    let starts = month_starts(Utc::now().date_naive(), months);
    let Some(first) = starts.first().copied() else {
        return Ok(Json(TrendResponse { months, trend: Vec::new() }));
    };

    let rows =
        queries::applications_per_period(&state.db, scope_for(&auth), Bucket::Month, first).await?;
    Ok(Json(TrendResponse {
        months,
        trend: zero_fill_periods(&starts, &rows, "%Y-%m"),
    }))
}

/// GET /api/v1/analytics/top-requirements
pub async fn handle_top_requirements(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<TopRequirement>>, AppError> {
    let limit = resolve_limit(query.limit)?;
    Ok(Json(
        queries::top_requirements(&state.db, scope_for(&auth), limit).await?,
    ))
}

/// GET /api/v1/analytics/recruiters
pub async fn handle_recruiter_performance(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<RecruiterPerformance>>, AppError> {
    auth.require(
        auth.role.can_view_team_analytics(),
        "Not authorized to view recruiter performance",
    )?;

    let rows = queries::recruiter_rows(&state.db).await?;
    Ok(Json(
        rows.into_iter()
            .map(|row| RecruiterPerformance {
                hire_rate: percentage(row.hires, row.applications),
                recruiter_id: row.recruiter_id,
                username: row.username,
                full_name: row.full_name,
                assigned_requirements: row.assigned_requirements,
                applications: row.applications,
                hires: row.hires,
            })
            .collect(),
    ))
}

/// GET /api/v1/analytics/requirements/:id
pub async fn handle_requirement_analytics(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RequirementAnalytics>, AppError> {
    let requirement = load_visible(&state, &auth, id).await?;
    let scope = Scope {
        requirement: Some(requirement.id),
        ..scope_for(&auth)
    };

    let applications_by_status =
        application_counts(&queries::applications_by_status(&state.db, scope).await?);
    let sources = queries::application_sources(&state.db, scope).await?;

    let days = day_range(Utc::now().date_naive(), RECENT_DAYS as u32);
    let daily = match days.first().copied() {
        Some(first) => {
            let rows =
                queries::applications_per_period(&state.db, scope, Bucket::Day, first).await?;
            zero_fill_periods(&days, &rows, "%Y-%m-%d")
        }
        None => Vec::new(),
    };
    let pipeline = pipeline_for(&state, scope).await?;

    Ok(Json(RequirementAnalytics {
        requirement_id: requirement.id,
        req_code: requirement.req_code,
        title: requirement.title,
        total_applications: applications_by_status.values().sum(),
        applications_by_status,
        sources,
        daily_applications: daily,
        stages: pipeline.stages,
        average_days_in_stage: pipeline.average_days_in_stage,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn auth(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            username: "someone".to_string(),
            role,
            jti: Uuid::new_v4(),
            exp: Utc::now().timestamp() + 600,
        }
    }

    #[test]
    fn test_recruiters_are_scoped_to_themselves() {
        let recruiter = auth(Role::Recruiter);
        assert_eq!(scope_for(&recruiter).recruiter, Some(recruiter.id));
        assert_eq!(scope_for(&auth(Role::AccountManager)).recruiter, None);
        assert_eq!(scope_for(&auth(Role::Admin)).recruiter, None);
    }

    #[test]
    fn test_trend_months_bounds() {
        assert_eq!(resolve_months(None).unwrap(), 12);
        assert_eq!(resolve_months(Some(24)).unwrap(), 24);
        assert!(resolve_months(Some(0)).is_err());
        assert!(resolve_months(Some(25)).is_err());
    }

    #[test]
    fn test_top_limit_bounds() {
        assert_eq!(resolve_limit(None).unwrap(), 5);
        assert!(resolve_limit(Some(0)).is_err());
        assert!(resolve_limit(Some(51)).is_err());
    }

    #[test]
    fn test_application_counts_cover_all_statuses() {
        let counts = application_counts(&[("hired".to_string(), 2)]);
        assert_eq!(counts.len(), ApplicationStatus::ALL.len());
        assert_eq!(counts["hired"], 2);
        assert_eq!(counts["withdrawn"], 0);
    }
}
