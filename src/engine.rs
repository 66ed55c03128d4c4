use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::cache::{EmbeddingCache, EnsureReport};
use crate::categorize::categorize;
use crate::config::EngineConfig;
use crate::duplicates::find_duplicates;
use crate::embed::{Classifier, Content, ContentSource, Embedder};
use crate::error::{EngineError, Result};
use crate::fs::FileSystem;
use crate::models::{CategoryGroup, DuplicateGroup, FileRecord, SearchSpec, SemanticMatch};
use crate::ranker::rank;
use crate::semantic::semantic_search;
use crate::walker::{CancelFlag, TreeWalker};

/// One session over a filesystem: search, duplicate grouping, semantic
/// ranking and categorization, sharing a single embedding cache.
pub struct Engine {
    fs: Arc<dyn FileSystem>,
    cache: Arc<EmbeddingCache>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(fs: Arc<dyn FileSystem>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let cache = Arc::new(EmbeddingCache::new(config.cache_capacity)?);
        Ok(Self { fs, cache, config })
    }

    pub fn with_cache(
        fs: Arc<dyn FileSystem>,
        config: EngineConfig,
        cache: Arc<EmbeddingCache>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { fs, cache, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    /// A spec seeded with this engine's cap and depth limits.
    pub fn search_spec(&self, query: impl Into<String>) -> SearchSpec {
        SearchSpec::from_config(&self.config).with_query(query)
    }

    pub async fn search(&self, root: &Path, spec: &SearchSpec) -> Result<Vec<FileRecord>> {
        self.search_with_cancel(root, spec, &CancelFlag::new()).await
    }

    /// Validates `spec`, walks `root`, and ranks the matches.
    #[instrument(skip_all, fields(root = %root.display(), query = %spec.query))]
    pub async fn search_with_cancel(
        &self,
        root: &Path,
        spec: &SearchSpec,
        cancel: &CancelFlag,
    ) -> Result<Vec<FileRecord>> {
        spec.validate()?;

        let matches = TreeWalker::new(self.fs.as_ref(), spec, Utc::now())
            .with_stat_concurrency(self.config.stat_concurrency)
            .with_cancel(cancel)
            .walk(root)
            .await?;

        let mut ranked = rank(matches, &spec.query);
        ranked.truncate(spec.result_cap);
        info!("Search for {:?} returned {} files", spec.query, ranked.len());
        Ok(ranked)
    }

    pub async fn ensure_embeddings(
        &self,
        paths: &[PathBuf],
        source: &dyn ContentSource,
        embedder: &dyn Embedder,
    ) -> EnsureReport {
        self.cache
            .ensure(paths, source, embedder, self.config.embedding_concurrency)
            .await
    }

    /// Uses whatever embeddings are cached; call `ensure_embeddings` first to
    /// include the semantic signal.
    pub fn find_duplicates(&self, files: &[FileRecord]) -> Result<Vec<DuplicateGroup>> {
        find_duplicates(files, Some(self.cache.as_ref()), self.config.duplicate_threshold)
    }

    pub fn semantic_search(&self, query: &[f32], limit: usize) -> Result<Vec<SemanticMatch>> {
        semantic_search(&self.cache, query, limit)
    }

    /// Embeds `query` with `embedder`, then ranks cached files against it.
    pub async fn semantic_search_text(
        &self,
        query: &str,
        embedder: &dyn Embedder,
        limit: usize,
    ) -> Result<Vec<SemanticMatch>> {
        let vector = embedder.embed(&Content::Text(query.to_string())).await?;
        if vector.is_empty() {
            return Err(EngineError::Embedding("query embedding is empty".to_string()));
        }
        self.semantic_search(&vector, limit)
    }

    pub async fn categorize(
        &self,
        files: &[FileRecord],
        classifier: &dyn Classifier,
    ) -> Vec<CategoryGroup> {
        categorize(files, classifier, self.config.embedding_concurrency).await
    }
}
