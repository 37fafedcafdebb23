use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: Uuid,
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
    pub resume_key: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CandidateSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub candidate: Candidate,
    pub applications_count: i64,
}
