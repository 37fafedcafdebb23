use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum RequirementStatus {
        Open => "open",
        Assigned => "assigned",
        InProgress => "in_progress",
        OnHold => "on_hold",
        Closed => "closed",
    }
}

impl RequirementStatus {
    /// Statuses counted as active work on dashboards.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RequirementStatus::Open | RequirementStatus::Assigned | RequirementStatus::InProgress
        )
    }

    pub fn accepts_applications(&self) -> bool {
        *self != RequirementStatus::Closed
    }
}

text_enum! {
    pub enum EmploymentMode {
        Contract => "contract",
        Permanent => "permanent",
    }
}

text_enum! {
    pub enum Priority {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Requirement {
    pub id: Uuid,
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
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Requirement joined with its client name and application count, as listed to users.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RequirementSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub requirement: Requirement,
    pub client_name: String,
    pub applications_count: i64,
}
