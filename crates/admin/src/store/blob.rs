//! Filesystem blob storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use url::Url;

use super::{BlobStore, StoreError};

/// [`BlobStore`] that writes below a root directory and returns `file://` urls.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Store blobs below `root`. The directory is created on first upload.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a blob path below the root, rejecting absolute paths and `..`.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(StoreError::Blob(format!("invalid blob path: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Blob(e.to_string()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| StoreError::Blob(e.to_string()))?;

        let absolute = tokio::fs::canonicalize(&target)
            .await
            .map_err(|e| StoreError::Blob(e.to_string()))?;
        Url::from_file_path(&absolute)
            .map(String::from)
            .map_err(|()| StoreError::Blob(format!("not a file path: {}", absolute.display())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = LocalBlobStore::new(dir.path());

        let url = blobs.upload("campuses/c1/logo.png", b"png").await.unwrap();

        assert!(url.starts_with("file://"));
        assert!(url.ends_with("campuses/c1/logo.png"));
        let written = std::fs::read(dir.path().join("campuses/c1/logo.png")).unwrap();
        assert_eq!(written, b"png");
    }

    #[tokio::test]
    async fn test_upload_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = LocalBlobStore::new(dir.path());

        assert!(blobs.upload("../outside.png", b"x").await.is_err());
        assert!(blobs.upload("/etc/passwd", b"x").await.is_err());
        assert!(blobs.upload("", b"x").await.is_err());
    }
}
