use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::path::PathBuf;

/// Blob store for voiceover audio. Paths follow the `audio/<filename>`
/// convention; the store itself is path-agnostic.
#[async_trait]
pub trait AudioBlobRepository: Send + Sync {
    /// Read a blob. Missing blobs are `AppError::NotFound`.
    async fn get(&self, path: &str) -> AppResult<Vec<u8>>;

    /// Write a blob, creating parent directories/prefixes as needed.
    async fn commit(&self, path: &str, data: &[u8], mime_type: &str) -> AppResult<()>;
}

/// Filesystem-backed blob store under a configured root directory.
pub struct FsAudioBlobRepository {
    root: PathBuf,
}

impl FsAudioBlobRepository {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        // Blob paths are relative names like "audio/<filename>"; anything
        // traversal-shaped is rejected before touching the filesystem.
        if path.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
            return Err(AppError::BadRequest(format!("Invalid blob path: {}", path)));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl AudioBlobRepository for FsAudioBlobRepository {
    async fn get(&self, path: &str) -> AppResult<Vec<u8>> {
        let full_path = self.resolve(path)?;

        match tokio::fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("Blob not found: {}", path)))
            }
            Err(e) => Err(AppError::Storage(format!(
                "Failed to read blob {}: {}",
                path, e
            ))),
        }
    }

    async fn commit(&self, path: &str, data: &[u8], mime_type: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Storage(format!("Failed to create blob directory: {}", e))
            })?;
        }

        tokio::fs::write(&full_path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write blob {}: {}", path, e)))?;

        tracing::debug!(
            path = path,
            size_bytes = data.len(),
            mime_type = mime_type,
            "Blob committed"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_then_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsAudioBlobRepository::new(dir.path().to_path_buf());

        repo.commit("audio/sample.mp3", b"mp3 bytes", "audio/mpeg")
            .await
            .unwrap();
        let data = repo.get("audio/sample.mp3").await.unwrap();

        assert_eq!(data, b"mp3 bytes");
    }

    #[tokio::test]
    async fn test_get_missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsAudioBlobRepository::new(dir.path().to_path_buf());

        let err = repo.get("audio/absent.mp3").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_traversal_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsAudioBlobRepository::new(dir.path().to_path_buf());

        let err = repo.get("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_commit_overwrites_existing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsAudioBlobRepository::new(dir.path().to_path_buf());

        repo.commit("audio/a.mp3", b"one", "audio/mpeg").await.unwrap();
        repo.commit("audio/a.mp3", b"two", "audio/mpeg").await.unwrap();

        assert_eq!(repo.get("audio/a.mp3").await.unwrap(), b"two");
    }
}
