//! Confidence-based ingredient filtering.

use std::collections::HashMap;

/// Keep ingredients whose confidence score meets the threshold.
///
/// Pure and order-preserving. An ingredient with no score entry is treated as
/// 0.0 and dropped.
pub fn filter_by_confidence(
    ingredients: &[String],
    confidence_scores: &HashMap<String, f64>,
    threshold: f64,
) -> Vec<String> {
    let filtered: Vec<String> = ingredients
        .iter()
        .filter(|name| confidence_scores.get(*name).copied().unwrap_or(0.0) >= threshold)
        .cloned()
        .collect();

    if filtered.len() < ingredients.len() {
        tracing::debug!(
            before = ingredients.len(),
            after = filtered.len(),
            threshold,
            "filtered low-confidence ingredients"
        );
    }

    filtered
}
