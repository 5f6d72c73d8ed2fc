//! Local filesystem storage implementation.
//!
//! Pages are written atomically: content goes to a temporary sibling file
//! which is then renamed over the destination, so an interrupted run never
//! leaves a half-written Markdown file behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::PageStorage;

/// Local filesystem storage backend confined to one output root.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Reject paths that would land outside the output root.
    fn check_contained(&self, path: &Path) -> Result<()> {
        if path.starts_with(&self.root_dir) {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Refusing to write outside {}: {}",
                self.root_dir.display(),
                path.display()
            )))
        }
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.check_contained(path)?;
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read a file, returning None if it doesn't exist.
    pub async fn read_file(&self, path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl PageStorage for LocalStorage {
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path).await?;
        Ok(())
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        self.write_bytes(path, content.as_bytes()).await
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let path = tmp.path().join("example.com/guide/intro.md");

        storage.write_file(&path, "# Intro").await.unwrap();

        assert!(storage.exists(&path).await);
        assert_eq!(
            storage.read_file(&path).await.unwrap().as_deref(),
            Some("# Intro")
        );
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let path = tmp.path().join("example.com/index.md");

        storage.write_file(&path, "first").await.unwrap();
        storage.write_file(&path, "second").await.unwrap();

        assert_eq!(
            storage.read_file(&path).await.unwrap().as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let path = tmp.path().join("nope.md");
        assert!(storage.read_file(&path).await.unwrap().is_none());
        assert!(!storage.exists(&path).await);
    }

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let dir = tmp.path().join("a/b/c");

        storage.ensure_dir(&dir).await.unwrap();
        storage.ensure_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_refuses_paths_outside_root() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("out"));

        let err = storage
            .write_file(&tmp.path().join("elsewhere.md"), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
