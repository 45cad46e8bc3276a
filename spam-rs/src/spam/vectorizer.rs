//! TF-IDF vectorizer
//!
//! Tokens are lowercased runs of word characters (at least two long),
//! optionally stemmed, expanded into n-grams. The vocabulary is kept in
//! lexicographic order so feature indices are stable across runs.

use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Sparse document vector: `(feature index, weight)` sorted by index
pub type FeatureVector = Vec<(usize, f64)>;

/// Tokenizer settings fixed at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    pub ngram_min: usize,
    pub ngram_max: usize,
    pub stemming: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            ngram_min: 1,
            ngram_max: 1,
            stemming: false,
        }
    }
}

/// Fitted TF-IDF vectorizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    /// Sorted; position is the feature index
    terms: Vec<String>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Build the vocabulary and smoothed IDF weights from a corpus
    pub fn fit<S: AsRef<str>>(documents: &[S], config: VectorizerConfig) -> Self {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();

        for doc in documents {
            let unique: BTreeSet<String> = tokenize(doc.as_ref(), &config).into_iter().collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let (terms, idf) = document_frequency
            .into_iter()
            .map(|(term, df)| (term, ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0))
            .unzip();

        Self { config, terms, idf }
    }

    /// TF-IDF weights of `text`, L2-normalized. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> FeatureVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in tokenize(text, &self.config) {
            if let Some(index) = self.index_of(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: FeatureVector = counts
            .into_iter()
            .map(|(index, count)| (index, count * self.idf[index]))
            .collect();

        let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, weight) in vector.iter_mut() {
                *weight /= norm;
            }
        }

        vector
    }

    /// Invariants `fit` guarantees but a deserialized blob may not
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.idf.len() != self.terms.len() {
            return Err(format!(
                "{} idf weights for {} terms",
                self.idf.len(),
                self.terms.len()
            ));
        }
        if self.terms.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err("vocabulary is not sorted".to_string());
        }
        if self.idf.iter().any(|w| !w.is_finite()) {
            return Err("non-finite idf weight".to_string());
        }
        Ok(())
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms
            .binary_search_by(|candidate| candidate.as_str().cmp(term))
            .ok()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }
}

/// Split text into lowercase word tokens and expand them into n-grams
pub fn tokenize(text: &str, config: &VectorizerConfig) -> Vec<String> {
    let lower = text.to_lowercase();
    let stemmer = config.stemming.then(|| Stemmer::create(Algorithm::English));

    let words: Vec<String> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|s| s.chars().count() >= 2)
        .map(|s| match &stemmer {
            Some(stemmer) => stemmer.stem(s).into_owned(),
            None => s.to_string(),
        })
        .collect();

    let mut tokens = Vec::new();
    for n in config.ngram_min.max(1)..=config.ngram_max {
        if n == 1 {
            tokens.extend(words.iter().cloned());
        } else {
            tokens.extend(words.windows(n).map(|window| window.join(" ")));
        }
    }
    tokens
}
