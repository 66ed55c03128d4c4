use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::{FuturesOrdered, StreamExt};
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::filter::FilterPipeline;
use crate::fs::FileSystem;
use crate::models::{FileRecord, SearchSpec};

/// Shared cancellation switch, checked before each directory visit.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Depth- and result-capped recursive traversal.
///
/// Depth counts directory levels below the traversal root. A directory equal
/// to the `SearchSpec` anchor is visited only within `depth.root` levels; every
/// other directory within `depth.nested` levels.
pub struct TreeWalker<'a> {
    fs: &'a dyn FileSystem,
    spec: &'a SearchSpec,
    filter: FilterPipeline<'a>,
    stat_concurrency: usize,
    cancel: Option<&'a CancelFlag>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(fs: &'a dyn FileSystem, spec: &'a SearchSpec, now: DateTime<Utc>) -> Self {
        Self {
            fs,
            spec,
            filter: FilterPipeline::new(spec, now),
            stat_concurrency: 16,
            cancel: None,
        }
    }

    pub fn with_stat_concurrency(mut self, limit: usize) -> Self {
        self.stat_concurrency = limit.max(1);
        self
    }

    pub fn with_cancel(mut self, cancel: &'a CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Matches in traversal order, never more than `result_cap`.
    pub async fn walk(&self, root: &Path) -> Result<Vec<FileRecord>> {
        let anchor = self.spec.anchor.as_deref().unwrap_or(root);
        let mut matches = Vec::new();
        self.visit(root.to_path_buf(), anchor, 0, &mut matches).await?;
        info!(
            "Walk of {} finished with {} matches",
            root.display(),
            matches.len()
        );
        Ok(matches)
    }

    fn visit<'s>(
        &'s self,
        dir: PathBuf,
        anchor: &'s Path,
        depth: usize,
        matches: &'s mut Vec<FileRecord>,
    ) -> BoxFuture<'s, Result<()>> {
        async move {
            let cap = self.spec.depth.cap_for(dir.as_path() == anchor);
            if depth > cap {
                debug!("Skipping {} at depth {} (cap {})", dir.display(), depth, cap);
                return Ok(());
            }
            if matches.len() >= self.spec.result_cap {
                return Ok(());
            }
            if self.cancel.is_some_and(CancelFlag::is_cancelled) {
                info!("Walk cancelled before {}", dir.display());
                return Err(EngineError::Cancelled);
            }

            let entries = match self.fs.list_directory(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Cannot list {}: {}", dir.display(), e);
                    return Ok(());
                }
            };

            // New stats are issued only while the in-flight window cannot
            // overshoot the result cap.
            let mut pending = entries.into_iter();
            let mut in_flight = FuturesOrdered::new();
            loop {
                while in_flight.len() < self.stat_concurrency
                    && matches.len() + in_flight.len() < self.spec.result_cap
                {
                    let Some(entry) = pending.next() else {
                        break;
                    };
                    let path = dir.join(&entry.name);
                    in_flight.push_back(async move {
                        let stat = self.fs.stat(&path).await;
                        (entry, path, stat)
                    });
                }

                let Some((entry, path, stat)) = in_flight.next().await else {
                    break;
                };
                let stat = match stat {
                    Ok(stat) => stat,
                    Err(e) => {
                        debug!("Skipping {}: {}", path.display(), e);
                        continue;
                    }
                };
                let record = FileRecord::from_stat(path, &stat);
                let recurse = entry.is_dir && record.is_dir;
                let child = recurse.then(|| record.path.clone());

                if self.filter.matches(&record) {
                    matches.push(record);
                    if matches.len() >= self.spec.result_cap {
                        debug!("Result cap {} reached", self.spec.result_cap);
                        return Ok(());
                    }
                }

                if let Some(child) = child {
                    self.visit(child, anchor, depth + 1, matches).await?;
                    if matches.len() >= self.spec.result_cap {
                        return Ok(());
                    }
                }
            }

            Ok(())
        }
        .boxed()
    }
}
