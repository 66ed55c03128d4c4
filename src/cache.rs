//! Path-keyed store of embedding vectors.
//!
//! The cache is an explicit object owned by whoever orchestrates a session.
//! It is bounded by an optional LRU capacity; without one, entries live until
//! removed or cleared. All writes go through one lock, so concurrent
//! `ensure` calls over overlapping paths are safe.

use futures::stream::{self, StreamExt};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::embed::{ContentSource, Embedder};
use crate::error::{EngineError, Result};
use crate::models::EmbeddingEntry;

#[derive(Debug)]
struct Slot {
    entry: EmbeddingEntry,
    /// Insertion sequence, kept across overwrites.
    seq: u64,
}

#[derive(Debug)]
struct CacheState {
    entries: LruCache<PathBuf, Slot>,
    next_seq: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsureReport {
    /// Paths that were already cached.
    pub cached: usize,
    /// Paths embedded by this call.
    pub embedded: usize,
    /// Paths whose content could not be loaded or embedded.
    pub failed: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct EmbeddingCache {
    state: Mutex<CacheState>,
    capacity: Option<NonZeroUsize>,
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl EmbeddingCache {
    pub fn unbounded() -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                next_seq: 0,
            }),
            capacity: None,
        }
    }

    /// A cache that evicts the least recently used entry beyond `capacity`.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| {
                EngineError::Config("cache capacity must be greater than 0".to_string())
            })?;
        Ok(Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                next_seq: 0,
            }),
            capacity: Some(capacity),
        })
    }

    pub fn new(capacity: Option<usize>) -> Result<Self> {
        match capacity {
            Some(capacity) => Self::with_capacity(capacity),
            None => Ok(Self::unbounded()),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity.map(NonZeroUsize::get)
    }

    /// Cached entry for `path`, marking it recently used.
    pub fn get(&self, path: &Path) -> Option<EmbeddingEntry> {
        self.state.lock().entries.get(path).map(|slot| slot.entry.clone())
    }

    /// Cached vector for `path` without touching recency.
    pub fn vector(&self, path: &Path) -> Option<Vec<f32>> {
        self.state.lock().entries.peek(path).map(|slot| slot.entry.vector.clone())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.state.lock().entries.contains(path)
    }

    /// Stores or overwrites the entry for `path`.
    pub fn put(&self, path: PathBuf, entry: EmbeddingEntry) {
        let mut state = self.state.lock();
        if let Some(slot) = state.entries.get_mut(&path) {
            slot.entry = entry;
            return;
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        if let Some((evicted, _)) = state.entries.push(path, Slot { entry, seq }) {
            debug!("Evicted embedding for {}", evicted.display());
        }
    }

    pub fn remove(&self, path: &Path) -> Option<EmbeddingEntry> {
        self.state.lock().entries.pop(path).map(|slot| slot.entry)
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every cached `(path, vector)`, in insertion order.
    pub fn snapshot(&self) -> Vec<(PathBuf, Vec<f32>)> {
        let state = self.state.lock();
        let mut slots: Vec<(u64, PathBuf, Vec<f32>)> = state
            .entries
            .iter()
            .map(|(path, slot)| (slot.seq, path.clone(), slot.entry.vector.clone()))
            .collect();
        slots.sort_by_key(|(seq, _, _)| *seq);
        slots.into_iter().map(|(_, path, vector)| (path, vector)).collect()
    }

    /// Embeds every path in `paths` that is not cached yet, with at most
    /// `concurrency` requests in flight. Failures are logged and reported,
    /// never raised.
    pub async fn ensure(
        &self,
        paths: &[PathBuf],
        source: &dyn ContentSource,
        embedder: &dyn Embedder,
        concurrency: usize,
    ) -> EnsureReport {
        let mut report = EnsureReport::default();
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for path in paths {
            if !seen.insert(path) {
                continue;
            }
            if self.contains(path) {
                report.cached += 1;
            } else {
                missing.push(path.clone());
            }
        }

        let outcomes: Vec<(PathBuf, Result<()>)> = stream::iter(missing)
            .map(|path| async move {
                let outcome = embed_one(&path, source, embedder)
                    .await
                    .map(|entry| self.put(path.clone(), entry));
                (path, outcome)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        for (path, outcome) in outcomes {
            match outcome {
                Ok(()) => report.embedded += 1,
                Err(e) => {
                    warn!("Skipping embedding for {}: {}", path.display(), e);
                    report.failed.push(path);
                }
            }
        }

        info!(
            "Embeddings: {} cached, {} embedded, {} failed",
            report.cached,
            report.embedded,
            report.failed.len()
        );
        report
    }
}

async fn embed_one(
    path: &Path,
    source: &dyn ContentSource,
    embedder: &dyn Embedder,
) -> Result<EmbeddingEntry> {
    let content = source.load(path).await?;
    let vector = embedder.embed(&content).await?;
    if vector.is_empty() {
        return Err(EngineError::Embedding("embedder returned an empty vector".to_string()));
    }
    Ok(EmbeddingEntry {
        vector,
        content_hash: content.content_hash(),
    })
}
