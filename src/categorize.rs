use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::embed::Classifier;
use crate::models::{CategoryGroup, FileRecord};

/// Groups `files` by the label the classifier assigns them.
///
/// Groups appear in the order their label is first seen, members in input
/// order; group confidence is the mean of member confidences. A file whose
/// classification fails is left out of every group.
pub async fn categorize(
    files: &[FileRecord],
    classifier: &dyn Classifier,
    concurrency: usize,
) -> Vec<CategoryGroup> {
    let classified: Vec<_> = stream::iter(files)
        .map(|file| async move { (file, classifier.classify(file).await) })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut groups: Vec<CategoryGroup> = Vec::new();
    let mut sums: Vec<f32> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut dropped = 0usize;

    for (file, outcome) in classified {
        let classification = match outcome {
            Ok(classification) => classification,
            Err(e) => {
                warn!("Leaving {} uncategorized: {}", file.path.display(), e);
                dropped += 1;
                continue;
            }
        };

        let slot = *index.entry(classification.label.clone()).or_insert_with(|| {
            groups.push(CategoryGroup {
                label: classification.label.clone(),
                members: Vec::new(),
                confidence: 0.0,
            });
            sums.push(0.0);
            groups.len() - 1
        });
        groups[slot].members.push(file.path.clone());
        sums[slot] += classification.confidence;
    }

    for (group, sum) in groups.iter_mut().zip(sums) {
        group.confidence = sum / group.members.len() as f32;
    }

    info!(
        "Categorized {} files into {} groups ({} dropped)",
        files.len() - dropped,
        groups.len(),
        dropped
    );
    groups
}
