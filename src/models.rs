use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::filter::parse_size;
use crate::fs::FileStat;

/// One filesystem entry seen during a traversal or analysis. Built fresh per
/// request and never mutated afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
    pub is_dir: bool,
    /// Lowercase, without the dot. Empty when the name has no extension.
    pub extension: String,
}

impl FileRecord {
    pub fn new(path: PathBuf, size_bytes: u64, modified: DateTime<Utc>, is_dir: bool) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let extension = lowercase_extension(&path);

        Self {
            path,
            name,
            size_bytes,
            modified,
            is_dir,
            extension,
        }
    }

    pub fn from_stat(path: PathBuf, stat: &FileStat) -> Self {
        Self::new(path, stat.size, stat.modified, stat.is_dir)
    }
}

pub fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Relative modification window, measured in days before "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModifiedWindow {
    Today,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    #[default]
    Any,
}

impl ModifiedWindow {
    /// `days_ago` is `(now - modified) / 1 day`, fractional.
    pub fn contains(self, days_ago: f64) -> bool {
        match self {
            ModifiedWindow::Today => days_ago < 1.0,
            ModifiedWindow::ThisWeek => days_ago < 7.0,
            ModifiedWindow::LastWeek => (7.0..14.0).contains(&days_ago),
            ModifiedWindow::ThisMonth => days_ago < 30.0,
            ModifiedWindow::LastMonth => (30.0..60.0).contains(&days_ago),
            ModifiedWindow::Any => true,
        }
    }
}

impl FromStr for ModifiedWindow {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(&['_', ' '][..], "-").as_str() {
            "today" => Ok(ModifiedWindow::Today),
            "this-week" => Ok(ModifiedWindow::ThisWeek),
            "last-week" => Ok(ModifiedWindow::LastWeek),
            "this-month" => Ok(ModifiedWindow::ThisMonth),
            "last-month" => Ok(ModifiedWindow::LastMonth),
            "" | "any" | "none" => Ok(ModifiedWindow::Any),
            other => Err(EngineError::InvalidSpec(format!("unknown modified window: {other}"))),
        }
    }
}

/// Depth caps for the tree walker. `root` applies while visiting the anchor
/// directory itself, `nested` everywhere else; both count levels below the
/// traversal root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLimits {
    pub root: usize,
    pub nested: usize,
}

impl Default for DepthLimits {
    fn default() -> Self {
        Self { root: 2, nested: 5 }
    }
}

impl DepthLimits {
    pub fn cap_for(&self, at_anchor: bool) -> usize {
        if at_anchor {
            self.root
        } else {
            self.nested
        }
    }
}

pub const DEFAULT_RESULT_CAP: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpec {
    pub query: String,
    /// Lowercase extensions without dots. Empty means no type filter.
    pub extensions: BTreeSet<String>,
    /// Size bounds as typed by the user, e.g. `"1mb"`. Unparsable bounds are ignored.
    pub min_size: Option<String>,
    pub max_size: Option<String>,
    pub modified: ModifiedWindow,
    pub result_cap: usize,
    pub depth: DepthLimits,
    /// The directory the user originally asked for. Defaults to the traversal root.
    pub anchor: Option<PathBuf>,
}

impl Default for SearchSpec {
    fn default() -> Self {
        Self {
            query: String::new(),
            extensions: BTreeSet::new(),
            min_size: None,
            max_size: None,
            modified: ModifiedWindow::Any,
            result_cap: DEFAULT_RESULT_CAP,
            depth: DepthLimits::default(),
            anchor: None,
        }
    }
}

impl SearchSpec {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            result_cap: config.result_cap,
            depth: DepthLimits {
                root: config.root_depth,
                nested: config.nested_depth,
            },
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    pub fn with_min_size(mut self, size: impl Into<String>) -> Self {
        self.min_size = Some(size.into());
        self
    }

    pub fn with_max_size(mut self, size: impl Into<String>) -> Self {
        self.max_size = Some(size.into());
        self
    }

    pub fn with_modified(mut self, window: ModifiedWindow) -> Self {
        self.modified = window;
        self
    }

    pub fn with_result_cap(mut self, cap: usize) -> Self {
        self.result_cap = cap;
        self
    }

    pub fn with_depth(mut self, depth: DepthLimits) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_anchor(mut self, anchor: impl Into<PathBuf>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn min_size_bytes(&self) -> Option<u64> {
        self.min_size.as_deref().and_then(parse_size)
    }

    pub fn max_size_bytes(&self) -> Option<u64> {
        self.max_size.as_deref().and_then(parse_size)
    }

    /// Rejects a spec whose parsed minimum size exceeds its parsed maximum.
    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_size_bytes(), self.max_size_bytes()) {
            if min > max {
                return Err(EngineError::InvalidSpec(format!(
                    "minimum size {min} bytes exceeds maximum size {max} bytes"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    pub size_match: f32,
    pub name_similarity: f32,
    pub extension_match: f32,
    pub semantic_similarity: Option<f32>,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub original: PathBuf,
    pub duplicates: Vec<PathBuf>,
    pub confidence: f32,
}

impl DuplicateGroup {
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.original).chain(self.duplicates.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingEntry {
    pub vector: Vec<f32>,
    /// blake3 hex digest of the content the vector was computed from.
    pub content_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    #[serde(rename = "very high")]
    VeryHigh,
    #[serde(rename = "high")]
    High,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "low")]
    Low,
}

impl ConfidenceLabel {
    pub fn from_similarity(similarity: f32) -> Self {
        if similarity > 0.9 {
            ConfidenceLabel::VeryHigh
        } else if similarity > 0.7 {
            ConfidenceLabel::High
        } else if similarity > 0.5 {
            ConfidenceLabel::Medium
        } else {
            ConfidenceLabel::Low
        }
    }
}

impl fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfidenceLabel::VeryHigh => "very high",
            ConfidenceLabel::High => "high",
            ConfidenceLabel::Medium => "medium",
            ConfidenceLabel::Low => "low",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticMatch {
    pub path: PathBuf,
    pub similarity: f32,
    pub label: ConfidenceLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub label: String,
    pub members: Vec<PathBuf>,
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_derives_name_and_lowercase_extension() {
        let record = FileRecord::new(PathBuf::from("/docs/Report.PDF"), 10, Utc::now(), false);
        assert_eq!(record.name, "Report.PDF");
        assert_eq!(record.extension, "pdf");

        let bare = FileRecord::new(PathBuf::from("/docs/Makefile"), 10, Utc::now(), false);
        assert_eq!(bare.extension, "");
    }

    #[test]
    fn window_boundaries() {
        assert!(ModifiedWindow::Today.contains(0.99));
        assert!(!ModifiedWindow::Today.contains(1.0));
        assert!(ModifiedWindow::ThisWeek.contains(6.9));
        assert!(!ModifiedWindow::LastWeek.contains(6.9));
        assert!(ModifiedWindow::LastWeek.contains(7.0));
        assert!(!ModifiedWindow::LastWeek.contains(14.0));
        assert!(ModifiedWindow::LastMonth.contains(30.0));
        assert!(!ModifiedWindow::LastMonth.contains(60.0));
        assert!(ModifiedWindow::Any.contains(10_000.0));
    }

    #[test]
    fn window_parses_user_spellings() {
        assert_eq!("This Week".parse::<ModifiedWindow>().unwrap(), ModifiedWindow::ThisWeek);
        assert_eq!("last_month".parse::<ModifiedWindow>().unwrap(), ModifiedWindow::LastMonth);
        assert_eq!("none".parse::<ModifiedWindow>().unwrap(), ModifiedWindow::Any);
        assert!("yesterday".parse::<ModifiedWindow>().is_err());
    }

    #[test]
    fn extensions_are_normalized() {
        let spec = SearchSpec::new("").with_extensions([".PDF", "txt", " "]);
        let expected: BTreeSet<String> = ["pdf", "txt"].iter().map(|s| s.to_string()).collect();
        assert_eq!(spec.extensions, expected);
    }

    #[test]
    fn validate_rejects_inverted_size_bounds() {
        let spec = SearchSpec::new("").with_min_size("2mb").with_max_size("1mb");
        assert!(matches!(spec.validate(), Err(EngineError::InvalidSpec(_))));

        let ok = SearchSpec::new("").with_min_size("1mb").with_max_size("1mb");
        assert!(ok.validate().is_ok());

        // An unparsable bound counts as absent, so there is nothing to compare.
        let lenient = SearchSpec::new("").with_min_size("huge").with_max_size("1kb");
        assert!(lenient.validate().is_ok());
    }

    #[test]
    fn confidence_labels_follow_bands() {
        assert_eq!(ConfidenceLabel::from_similarity(0.95), ConfidenceLabel::VeryHigh);
        assert_eq!(ConfidenceLabel::from_similarity(0.9), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::from_similarity(0.71), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::from_similarity(0.7), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::from_similarity(0.5), ConfidenceLabel::Low);
        assert_eq!(ConfidenceLabel::VeryHigh.to_string(), "very high");
    }
}
