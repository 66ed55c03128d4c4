use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::duplicates::DEFAULT_THRESHOLD;
use crate::error::{EngineError, Result};
use crate::models::DEFAULT_RESULT_CAP;

const APP_DIR: &str = "file-insight";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum matches returned by one search.
    pub result_cap: usize,
    /// Depth cap while visiting the requested directory itself.
    pub root_depth: usize,
    /// Depth cap everywhere else, measured from the traversal root.
    pub nested_depth: usize,
    /// Duplicate pairs must score strictly above this.
    pub duplicate_threshold: f32,
    /// Embedding and classification requests in flight at once.
    pub embedding_concurrency: usize,
    /// Stat calls in flight at once within one directory.
    pub stat_concurrency: usize,
    /// LRU bound for the embedding cache; `None` keeps every entry.
    pub cache_capacity: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            result_cap: DEFAULT_RESULT_CAP,
            root_depth: 2,
            nested_depth: 5,
            duplicate_threshold: DEFAULT_THRESHOLD,
            embedding_concurrency: 4,
            stat_concurrency: 16,
            cache_capacity: None,
        }
    }
}

impl EngineConfig {
    /// `<config dir>/file-insight/config.json`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// An explicit path must exist. Without one, the default location is used
    /// if present, and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding_concurrency == 0 || self.stat_concurrency == 0 {
            return Err(EngineError::Config(
                "concurrency limits must be greater than 0".to_string(),
            ));
        }
        if self.cache_capacity == Some(0) {
            return Err(EngineError::Config("cache capacity must be greater than 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.duplicate_threshold) {
            return Err(EngineError::Config(format!(
                "duplicate threshold {} is outside [0, 1]",
                self.duplicate_threshold
            )));
        }
        if self.root_depth > self.nested_depth {
            return Err(EngineError::Config(format!(
                "root depth {} exceeds nested depth {}",
                self.root_depth, self.nested_depth
            )));
        }
        Ok(())
    }
}
