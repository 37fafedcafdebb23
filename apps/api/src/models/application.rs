use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::pipeline::ApplicationStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub requirement_id: Uuid,
    pub candidate_id: Uuid,
    pub status: ApplicationStatus,
    pub assigned_recruiter_id: Option<Uuid>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Application with the display names of the rows it links.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ApplicationDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: Application,
    pub requirement_title: String,
    pub req_code: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub recruiter_username: Option<String>,
}

/// One append-only audit row. `from_status` is `None` only for the creation row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub application_id: Uuid,
    pub from_status: Option<ApplicationStatus>,
    pub to_status: ApplicationStatus,
    pub changed_by: Uuid,
    pub changed_by_username: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub changed_at: DateTime<Utc>,
}
