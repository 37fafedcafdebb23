use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;
use crate::storage::ResumeStore;

/// Stores resumes under a directory on local disk.
pub struct LocalResumeStore {
    root: PathBuf,
}

impl LocalResumeStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a key inside the root, refusing absolute paths and `..`.
    fn path_for(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::Validation(format!("Invalid storage key '{key}'")));
        }
        Ok(self.root.join(relative))
    }
}

fn storage_error(action: &str, key: &str, e: std::io::Error) -> AppError {
    AppError::Storage(format!("{action} '{key}' failed: {e}"))
}

#[async_trait]
impl ResumeStore for LocalResumeStore {
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<(), AppError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error("create dir for", key, e))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| storage_error("write", key, e))?;
        info!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, AppError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::not_found("Resume file"))
            }
            Err(e) => Err(storage_error("read", key, e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("delete", key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalResumeStore::new(dir.path());

        store
            .put("resumes/a/cv.pdf", Bytes::from_static(b"%PDF-1.4"), "application/pdf")
            .await
            .unwrap();
        assert!(dir.path().join("resumes/a/cv.pdf").exists());
        assert_eq!(
            store.get("resumes/a/cv.pdf").await.unwrap(),
            Bytes::from_static(b"%PDF-1.4")
        );

        store.delete("resumes/a/cv.pdf").await.unwrap();
        assert!(matches!(
            store.get("resumes/a/cv.pdf").await,
            Err(AppError::NotFound(_))
        ));
        // deleting twice is fine
        store.delete("resumes/a/cv.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalResumeStore::new(dir.path());
        assert!(store.get("../etc/passwd").await.is_err());
        assert!(store
            .put("/tmp/x.pdf", Bytes::from_static(b"x"), "application/pdf")
            .await
            .is_err());
    }
}
