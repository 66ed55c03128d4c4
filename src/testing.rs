//! In-memory filesystem used by unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};
use crate::fs::{DirEntry, FileStat, FileSystem};

#[derive(Debug)]
pub struct MemoryFs {
    stats: HashMap<PathBuf, FileStat>,
    children: HashMap<PathBuf, Vec<DirEntry>>,
    unreadable: HashSet<PathBuf>,
    now: DateTime<Utc>,
    calls: Mutex<Vec<(&'static str, PathBuf)>>,
}

impl MemoryFs {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            stats: HashMap::new(),
            children: HashMap::new(),
            unreadable: HashSet::new(),
            now,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), 0, self.now, true);
        self
    }

    pub fn with_file(self, path: impl AsRef<Path>, size: u64) -> Self {
        let now = self.now;
        self.with_file_at(path, size, now)
    }

    pub fn with_file_at(
        mut self,
        path: impl AsRef<Path>,
        size: u64,
        modified: DateTime<Utc>,
    ) -> Self {
        self.insert(path.as_ref(), size, modified, false);
        self
    }

    /// Listing this directory fails, as if permission were denied.
    pub fn with_unreadable(mut self, path: impl AsRef<Path>) -> Self {
        self.unreadable.insert(path.as_ref().to_path_buf());
        self
    }

    /// Drops the stat record for `path` while keeping its listing entry, as if
    /// the file vanished between the two calls.
    pub fn with_vanished(mut self, path: impl AsRef<Path>) -> Self {
        self.stats.remove(path.as_ref());
        self
    }

    pub fn listed(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .iter()
            .filter(|(kind, _)| *kind == "list")
            .map(|(_, path)| path.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn insert(&mut self, path: &Path, size: u64, modified: DateTime<Utc>, is_dir: bool) {
        if self.stats.contains_key(path) {
            return;
        }
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            self.insert(parent, 0, self.now, true);
            self.children.entry(parent.to_path_buf()).or_default().push(DirEntry {
                name: name.to_string_lossy().to_string(),
                is_dir,
            });
        }
        if is_dir {
            self.children.entry(path.to_path_buf()).or_default();
        }
        self.stats.insert(path.to_path_buf(), FileStat { size, modified, is_dir });
    }
}

#[async_trait]
impl FileSystem for MemoryFs {
    async fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>> {
        self.calls.lock().push(("list", path.to_path_buf()));
        if self.unreadable.contains(path) {
            return Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            )));
        }
        self.children.get(path).cloned().ok_or_else(|| {
            EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                path.display().to_string(),
            ))
        })
    }

    async fn stat(&self, path: &Path) -> Result<FileStat> {
        self.calls.lock().push(("stat", path.to_path_buf()));
        self.stats.get(path).copied().ok_or_else(|| {
            EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                path.display().to_string(),
            ))
        })
    }
}
