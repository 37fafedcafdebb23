//! Resume file storage.
//!
//! `AppState` holds an `Arc<dyn ResumeStore>`, chosen at startup from `RESUME_STORE`.

pub mod local;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::errors::AppError;

pub use local::LocalResumeStore;
pub use s3::S3ResumeStore;

pub const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError>;
    async fn get(&self, key: &str) -> Result<Bytes, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Lowercased extension of an allowed resume file name.
pub fn resume_extension(filename: &str) -> Result<String, AppError> {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(AppError::Validation(
            "Invalid file type. Allowed: PDF, DOC, DOCX".to_string(),
        ))
    }
}

pub fn check_resume_size(len: usize) -> Result<(), AppError> {
    if len == 0 {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if len > MAX_RESUME_BYTES {
        return Err(AppError::PayloadTooLarge(
            "File too large. Maximum size is 10MB".to_string(),
        ));
    }
    Ok(())
}

/// Object key for a new upload. Every upload gets a fresh name.
pub fn resume_key(candidate_id: Uuid, extension: &str) -> String {
    format!("resumes/{candidate_id}/{}.{extension}", Uuid::new_v4())
}

pub fn content_type_for(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
