use crate::error::{EngineError, Result};
use crate::models::{FileRecord, SimilarityScore};

pub const SIZE_WEIGHT: f32 = 0.4;
pub const NAME_WEIGHT: f32 = 0.3;
pub const EXTENSION_WEIGHT: f32 = 0.2;
pub const SEMANTIC_WEIGHT: f32 = 0.1;

/// Character-level Levenshtein distance, case-sensitive.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// `1 - distance / max_len`, and 1.0 when both names are empty.
pub fn name_similarity(a: &str, b: &str) -> f32 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f32 / longest as f32
}

/// Vectors of different length are a caller bug and fail with
/// `DimensionMismatch`. A zero vector has similarity 0.0 with anything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EngineError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let dot_product: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| x * y)
        .sum();
    let magnitude_a: f32 = a
        .iter()
        .map(|x| x * x)
        .sum::<f32>()
        .sqrt();
    let magnitude_b: f32 = b
        .iter()
        .map(|x| x * x)
        .sum::<f32>()
        .sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

/// Weighted blend of size, name, extension and (when both vectors are
/// present) semantic signals. A missing vector drops the semantic weight
/// without redistributing it, so the ceiling is then 0.9.
pub fn score(
    a: &FileRecord,
    b: &FileRecord,
    vector_a: Option<&[f32]>,
    vector_b: Option<&[f32]>,
) -> Result<SimilarityScore> {
    let size_match = if a.size_bytes == b.size_bytes { 1.0 } else { 0.0 };
    let name_similarity = name_similarity(&a.name, &b.name);
    let extension_match = if a.extension == b.extension { 1.0 } else { 0.0 };

    let semantic_similarity = match (vector_a, vector_b) {
        (Some(va), Some(vb)) => Some(cosine_similarity(va, vb)?.clamp(0.0, 1.0)),
        _ => None,
    };

    let confidence = size_match * SIZE_WEIGHT
        + name_similarity * NAME_WEIGHT
        + extension_match * EXTENSION_WEIGHT
        + semantic_similarity.map_or(0.0, |s| s * SEMANTIC_WEIGHT);

    Ok(SimilarityScore {
        size_match,
        name_similarity,
        extension_match,
        semantic_similarity,
        confidence: confidence.clamp(0.0, 1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    const EPSILON: f32 = 1e-5;

    fn file(name: &str, size: u64) -> FileRecord {
        FileRecord::new(PathBuf::from("/r").join(name), size, Utc::now(), false)
    }

    #[test]
    fn levenshtein_classics() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("same", "same"), 0);
        assert_eq!(levenshtein("Report", "report"), 1);
        assert_eq!(levenshtein("report.pdf", "report (1).pdf"), 4);
        assert_eq!(levenshtein("café", "cafe"), 1);
    }

    #[test]
    fn name_similarity_is_normalized() {
        assert_eq!(name_similarity("", ""), 1.0);
        assert_eq!(name_similarity("abc", "abc"), 1.0);
        assert_eq!(name_similarity("abc", "xyz"), 0.0);
        let expected = 1.0 - 4.0 / 14.0;
        assert!((name_similarity("report.pdf", "report (1).pdf") - expected).abs() < EPSILON);
    }

    #[test]
    fn cosine_of_self_is_one_and_symmetric() -> Result<()> {
        let a = [0.3_f32, -1.2, 4.5, 0.01];
        let b = [1.0_f32, 0.5, -0.25, 2.0];

        assert!((cosine_similarity(&a, &a)? - 1.0).abs() < EPSILON);
        assert_eq!(cosine_similarity(&a, &b)?, cosine_similarity(&b, &a)?);
        Ok(())
    }

    #[test]
    fn cosine_handles_zero_and_orthogonal_vectors() -> Result<()> {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0])?, 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])?, 0.0);
        Ok(())
    }

    #[test]
    fn cosine_rejects_mismatched_lengths() {
        let result = cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(EngineError::DimensionMismatch { left: 2, right: 3 })));
    }

    #[test]
    fn identical_records_with_vectors_score_one() -> Result<()> {
        let a = file("photo.jpg", 4096);
        let vector = [0.2_f32, 0.4, 0.1];
        let s = score(&a, &a.clone(), Some(&vector[..]), Some(&vector[..]))?;
        assert!((s.confidence - 1.0).abs() < EPSILON);
        assert_eq!(s.size_match, 1.0);
        assert_eq!(s.extension_match, 1.0);
        Ok(())
    }

    #[test]
    fn missing_vector_caps_confidence_at_point_nine() -> Result<()> {
        let a = file("photo.jpg", 4096);
        let s = score(&a, &a.clone(), Some(&[1.0, 0.0][..]), None)?;
        assert_eq!(s.semantic_similarity, None);
        assert!((s.confidence - 0.9).abs() < EPSILON);
        Ok(())
    }

    #[test]
    fn unrelated_files_score_low() -> Result<()> {
        let s = score(&file("report.pdf", 2048), &file("notes.txt", 10), None, None)?;
        assert_eq!(s.size_match, 0.0);
        assert_eq!(s.extension_match, 0.0);
        assert!(s.confidence < 0.3);
        Ok(())
    }

    #[test]
    fn extensionless_files_share_an_extension() -> Result<()> {
        let s = score(&file("Makefile", 10), &file("Rakefile", 20), None, None)?;
        assert_eq!(s.extension_match, 1.0);
        Ok(())
    }

    #[test]
    fn negative_cosine_clamps_to_zero() -> Result<()> {
        let a = file("a.txt", 1);
        let s = score(&a, &a.clone(), Some(&[1.0, 0.0][..]), Some(&[-1.0, 0.0][..]))?;
        assert_eq!(s.semantic_similarity, Some(0.0));
        Ok(())
    }
}
