//! File discovery and similarity engine.
//!
//! Walks directory trees under filter constraints, ranks results
//! deterministically, and relates files through structural signals (size,
//! name, extension) blended with cached embedding vectors.

pub mod cache;
pub mod categorize;
pub mod config;
pub mod duplicates;
pub mod embed;
pub mod engine;
pub mod error;
pub mod filter;
pub mod fs;
pub mod models;
pub mod ranker;
pub mod semantic;
pub mod similarity;
pub mod walker;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{EmbeddingCache, EnsureReport};
pub use config::EngineConfig;
pub use embed::{
    Classifier, Content, ContentSource, Embedder, FastEmbedder, FileContentSource, MimeClassifier,
};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use fs::{FileSystem, LocalFs};
pub use models::{
    CategoryGroup, Classification, ConfidenceLabel, DepthLimits, DuplicateGroup, EmbeddingEntry,
    FileRecord, ModifiedWindow, SearchSpec, SemanticMatch, SimilarityScore,
};
pub use walker::CancelFlag;
