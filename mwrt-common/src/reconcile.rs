//! Rule of Thumb v0: agreement between human and AI species labels
//!
//! The agreed set is the intersection of the human labels and the AI labels,
//! after the AI "unclassified" label has been replaced with "nothing". When
//! nothing is agreed the result is the single no-agreement sentinel.

use std::collections::BTreeSet;

use crate::model::{ClassificationId, SentinelIds};

/// Compute the agreed species for one sequence
///
/// Inputs are treated as sets: order and duplicates are ignored. Output is in
/// ascending order and is never empty.
pub fn reconcile(
    human_species: &[ClassificationId],
    ai_species: &[ClassificationId],
    sentinels: SentinelIds,
) -> Vec<ClassificationId> {
    let mut ai_classifications: BTreeSet<ClassificationId> = ai_species.iter().copied().collect();

    // AI "unclassified" counts as "nothing" for agreement
    if ai_classifications.remove(&sentinels.unclassified) {
        ai_classifications.insert(sentinels.nothing);
    }

    let human: BTreeSet<ClassificationId> = human_species.iter().copied().collect();
    let agreed: Vec<ClassificationId> = human.intersection(&ai_classifications).copied().collect();

    if agreed.is_empty() {
        vec![sentinels.no_agreement]
    } else {
        agreed
    }
}
