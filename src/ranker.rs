use std::cmp::Ordering;

use crate::models::FileRecord;

/// Orders matches: exact (case-insensitive) name matches to `query` first,
/// then newest first. The sort is stable, so ties keep traversal order.
pub fn rank(files: Vec<FileRecord>, query: &str) -> Vec<FileRecord> {
    let query = query.to_lowercase();
    let mut keyed: Vec<(bool, FileRecord)> = files
        .into_iter()
        .map(|file| (file.name.to_lowercase() == query, file))
        .collect();

    keyed.sort_by(|(exact_a, a), (exact_b, b)| match exact_b.cmp(exact_a) {
        Ordering::Equal => b.modified.cmp(&a.modified),
        other => other,
    });

    keyed.into_iter().map(|(_, file)| file).collect()
}
