use tracing::debug;

use crate::cache::EmbeddingCache;
use crate::error::Result;
use crate::models::{DuplicateGroup, FileRecord};
use crate::similarity::score;

pub const DEFAULT_THRESHOLD: f32 = 0.7;

/// Groups near-duplicate files in one left-to-right pass.
///
/// Each unclaimed file is compared against every later unclaimed file; all
/// comparisons scoring above `threshold` join its group, and every member is
/// claimed so no file lands in two groups. Directories are ignored. Vectors
/// come from `cache` when one is given.
pub fn find_duplicates(
    files: &[FileRecord],
    cache: Option<&EmbeddingCache>,
    threshold: f32,
) -> Result<Vec<DuplicateGroup>> {
    let files: Vec<&FileRecord> = files.iter().filter(|f| !f.is_dir).collect();
    let vectors: Vec<Option<Vec<f32>>> = files
        .iter()
        .map(|f| cache.and_then(|c| c.vector(&f.path)))
        .collect();
    let mut claimed = vec![false; files.len()];
    let mut groups = Vec::new();

    for i in 0..files.len() {
        if claimed[i] {
            continue;
        }

        let mut members = Vec::new();
        let mut total = 0.0_f32;
        for j in (i + 1)..files.len() {
            if claimed[j] {
                continue;
            }
            let similarity =
                score(files[i], files[j], vectors[i].as_deref(), vectors[j].as_deref())?;
            if similarity.confidence > threshold {
                members.push(j);
                total += similarity.confidence;
            }
        }

        if members.is_empty() {
            continue;
        }

        claimed[i] = true;
        for &j in &members {
            claimed[j] = true;
        }
        groups.push(DuplicateGroup {
            original: files[i].path.clone(),
            duplicates: members.iter().map(|&j| files[j].path.clone()).collect(),
            confidence: total / members.len() as f32,
        });
    }

    debug!("Found {} duplicate groups among {} files", groups.len(), files.len());
    Ok(groups)
}
