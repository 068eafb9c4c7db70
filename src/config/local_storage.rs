use crate::core::Storage;
use crate::utils::error::Result;
use std::path::PathBuf;

/// Writes report files under a base directory on the local disk.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self {
            base_path: PathBuf::from(base_path),
        }
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_directories() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("reports");
        let storage = LocalStorage::new(base.to_string_lossy().to_string());

        storage.write_file("2026/report.json", b"{}").await.unwrap();

        assert_eq!(std::fs::read(base.join("2026/report.json")).unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_base_path_occupied_by_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("output");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let storage = LocalStorage::new(blocker.to_string_lossy().to_string());
        let err = storage.write_file("report.json", b"{}").await.unwrap_err();
        assert!(matches!(err, crate::utils::error::BulkError::IoError(_)));
    }
}
