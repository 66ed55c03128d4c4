use tracing::debug;

use crate::cache::EmbeddingCache;
use crate::error::Result;
use crate::models::{ConfidenceLabel, SemanticMatch};
use crate::similarity::cosine_similarity;

/// The `limit` cached entries most similar to `query`, best first.
/// Equal similarities keep cache insertion order.
pub fn semantic_search(
    cache: &EmbeddingCache,
    query: &[f32],
    limit: usize,
) -> Result<Vec<SemanticMatch>> {
    let mut results = cache
        .snapshot()
        .into_iter()
        .map(|(path, vector)| {
            let similarity = cosine_similarity(&vector, query)?;
            Ok(SemanticMatch {
                path,
                similarity,
                label: ConfidenceLabel::from_similarity(similarity),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    results.truncate(limit);

    debug!("Semantic search returned {} results", results.len());
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::models::EmbeddingEntry;
    use std::path::PathBuf;

    fn cache_with(entries: &[(&str, Vec<f32>)]) -> EmbeddingCache {
        let cache = EmbeddingCache::unbounded();
        for (path, vector) in entries {
            cache.put(
                PathBuf::from(path),
                EmbeddingEntry {
                    vector: vector.clone(),
                    content_hash: String::new(),
                },
            );
        }
        cache
    }

    #[test]
    fn ranks_by_cosine_and_truncates() -> Result<()> {
        let cache = cache_with(&[
            ("/far", vec![0.0, 1.0]),
            ("/near", vec![1.0, 0.1]),
            ("/exact", vec![2.0, 0.0]),
            ("/middle", vec![1.0, 1.0]),
        ]);

        let results = semantic_search(&cache, &[1.0, 0.0], 3)?;
        let paths: Vec<&str> = results.iter().map(|r| r.path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["/exact", "/near", "/middle"]);
        assert_eq!(results[0].label, ConfidenceLabel::VeryHigh);
        assert_eq!(results[2].label, ConfidenceLabel::High);
        Ok(())
    }

    #[test]
    fn ties_keep_insertion_order() -> Result<()> {
        let cache = cache_with(&[
            ("/b", vec![1.0, 1.0]),
            ("/a", vec![1.0, 1.0]),
            ("/c", vec![1.0, 1.0]),
        ]);
        let results = semantic_search(&cache, &[1.0, 1.0], 10)?;
        let paths: Vec<&str> = results.iter().map(|r| r.path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["/b", "/a", "/c"]);
        Ok(())
    }

    #[test]
    fn labels_low_similarity() -> Result<()> {
        let cache = cache_with(&[("/orthogonal", vec![0.0, 1.0])]);
        let results = semantic_search(&cache, &[1.0, 0.0], 1)?;
        assert_eq!(results[0].label, ConfidenceLabel::Low);
        Ok(())
    }

    #[test]
    fn mismatched_query_dimension_fails_fast() {
        let cache = cache_with(&[("/a", vec![1.0, 0.0, 0.0])]);
        assert!(matches!(
            semantic_search(&cache, &[1.0, 0.0], 5),
            Err(EngineError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn empty_cache_yields_nothing() -> Result<()> {
        assert!(semantic_search(&EmbeddingCache::unbounded(), &[1.0], 5)?.is_empty());
        Ok(())
    }
}
