use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub is_dir: bool,
}

/// Read-only view of a filesystem. The engine never mutates through it.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Entries of `path`, in whatever order the filesystem yields them.
    async fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>>;

    async fn stat(&self, path: &Path) -> Result<FileStat>;
}

/// The local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl FileSystem for LocalFs {
    async fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let dir = path.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<Vec<DirEntry>> {
            let mut entries = Vec::new();
            for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).follow_links(false) {
                let entry = entry?;
                entries.push(DirEntry {
                    name: entry.file_name().to_string_lossy().to_string(),
                    is_dir: entry.file_type().is_dir(),
                });
            }
            Ok(entries)
        })
        .await
        .map_err(|e| EngineError::Io(std::io::Error::other(e)))?
    }

    async fn stat(&self, path: &Path) -> Result<FileStat> {
        let metadata = tokio::fs::metadata(path).await?;
        let modified = metadata.modified()?;
        Ok(FileStat {
            size: metadata.len(),
            modified: DateTime::<Utc>::from(modified),
            is_dir: metadata.is_dir(),
        })
    }
}
