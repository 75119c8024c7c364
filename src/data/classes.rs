use std::collections::BTreeMap;

use super::model::ClassPair;

// ---------------------------------------------------------------------------
// Valid classes and the class pairs compared in every frame
// ---------------------------------------------------------------------------

/// Configured classes minus the sentinel ones (e.g. "unlabeled", "outlier").
pub fn valid_classes(
    labels: &BTreeMap<u32, String>,
    excluded_names: &[String],
) -> BTreeMap<u32, String> {
    labels
        .iter()
        .filter(|(_, name)| !excluded_names.iter().any(|ex| ex == *name))
        .map(|(id, name)| (*id, name.clone()))
        .collect()
}

/// All 2-combinations of the valid classes, in ascending id order.
pub fn class_pairs(valid: &BTreeMap<u32, String>) -> Vec<ClassPair> {
    let ids: Vec<u32> = valid.keys().copied().collect();
    let mut pairs = Vec::with_capacity(ids.len() * ids.len().saturating_sub(1) / 2);
    for (i, &a) in ids.iter().enumerate() {
        for &b in &ids[i + 1..] {
            pairs.push(ClassPair { first: a, second: b });
        }
    }
    pairs
}
