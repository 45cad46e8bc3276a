//! Keyword extraction: which tokens pushed a text towards spam

use tracing::warn;

use super::classifier::ModelView;
use super::types::Label;

/// Default number of keywords returned with a classification
pub const DEFAULT_TOP_K: usize = 5;

/// Rank the vocabulary tokens present in `text` by
/// `tf-idf weight × log P(token | spam)`, highest first.
///
/// Ties keep vocabulary order. Degrades to an empty list instead of failing.
pub fn top_keywords<M: ModelView + ?Sized>(model: &M, text: &str, k: usize) -> Vec<String> {
    let vocabulary = model.vocabulary();
    let mut scored: Vec<(&str, f64)> = Vec::new();

    for (index, weight) in model.vectorize(text) {
        if weight == 0.0 {
            continue;
        }
        let Some(token) = vocabulary.get(index) else {
            warn!(index, "Feature index outside vocabulary, skipping keywords");
            return Vec::new();
        };
        let Some(log_prob) = model.class_log_prob(Label::Spam, token) else {
            continue;
        };
        let importance = weight * log_prob;
        if !importance.is_finite() {
            warn!(token = %token, "Non-finite keyword importance, skipping keywords");
            return Vec::new();
        }
        scored.push((token.as_str(), importance));
    }

    // sort_by is stable, so equal scores stay in vocabulary order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    scored
        .into_iter()
        .take(k)
        .map(|(token, _)| token.to_string())
        .collect()
}
