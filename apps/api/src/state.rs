use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::denylist::TokenDenylist;
use crate::auth::token::TokenService;
use crate::storage::ResumeStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub tokens: TokenService,
    /// Revoked token ids. Redis when `REDIS_URL` is set, in-memory otherwise.
    pub denylist: Arc<dyn TokenDenylist>,
    /// Resume file storage. Local directory or S3/MinIO, per `RESUME_STORE`.
    pub resumes: Arc<dyn ResumeStore>,
}
